//! Organizations are the tenant boundary: every other record carries an
//! `organization_id`. Users belong to exactly one organization and join new
//! ones only through invite links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{InviteLinkId, OrganizationId, UserId};
use crate::models::string_enum;
use crate::validation::{Issues, MAX_NAME_LENGTH, Validate, ValidationIssue};

pub const DEFAULT_MAX_USERS: i64 = 25;

string_enum! {
    /// A user's standing inside their organization.
    OrganizationRole, "organization role" {
        Owner => "owner",
        Admin => "admin",
        Member => "member",
    }
}

impl OrganizationRole {
    pub fn can_manage_organization(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub email_address: Option<String>,
    pub max_users: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInput {
    pub name: String,
    pub email_address: Option<String>,
}

impl Validate for OrganizationInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("name", &self.name, MAX_NAME_LENGTH);
        issues.email("emailAddress", self.email_address.as_deref());
        issues.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub organization_id: OrganizationId,
    pub organization_role: OrganizationRole,
    pub given_name: String,
    pub family_name: String,
    pub email_address: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-up form: creates an organization and its owner in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpInput {
    pub organization_name: String,
    pub given_name: String,
    pub family_name: String,
    pub email_address: String,
}

impl Validate for SignUpInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("organizationName", &self.organization_name, MAX_NAME_LENGTH);
        issues.required("givenName", &self.given_name, MAX_NAME_LENGTH);
        issues.optional("familyName", Some(&self.family_name), MAX_NAME_LENGTH);
        if self.email_address.trim().is_empty() {
            issues.push("emailAddress", "Required");
        } else {
            issues.email("emailAddress", Some(&self.email_address));
        }
        issues.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInviteLink {
    pub id: InviteLinkId,
    pub organization_id: OrganizationId,
    /// The user who created the link.
    pub user_id: UserId,
    pub organization_role: OrganizationRole,
    pub uses: i64,
    pub max_uses: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationInviteLink {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && self.max_uses.is_none_or(|max| self.uses < max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteLinkInput {
    pub organization_role: OrganizationRole,
    pub max_uses: Option<i64>,
}

impl Validate for InviteLinkInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        if self.organization_role == OrganizationRole::Owner {
            issues.push("organizationRole", "Invite links cannot grant ownership");
        }
        if let Some(max_uses) = self.max_uses {
            issues.positive("maxUses", max_uses);
        }
        issues.finish()
    }
}

/// Joining an existing organization through an invite link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInviteInput {
    pub given_name: String,
    pub family_name: String,
    pub email_address: String,
}

impl Validate for AcceptInviteInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("givenName", &self.given_name, MAX_NAME_LENGTH);
        issues.optional("familyName", Some(&self.family_name), MAX_NAME_LENGTH);
        if self.email_address.trim().is_empty() {
            issues.push("emailAddress", "Required");
        } else {
            issues.email("emailAddress", Some(&self.email_address));
        }
        issues.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(uses: i64, max_uses: Option<i64>, expires_in: Duration) -> OrganizationInviteLink {
        let now = Utc::now();
        OrganizationInviteLink {
            id: InviteLinkId::new(),
            organization_id: OrganizationId::new(),
            user_id: UserId::new(),
            organization_role: OrganizationRole::Member,
            uses,
            max_uses,
            expires_at: now + expires_in,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn invite_link_usability() {
        let now = Utc::now();
        assert!(link(0, None, Duration::days(1)).is_usable(now));
        assert!(link(4, Some(5), Duration::days(1)).is_usable(now));
        assert!(!link(5, Some(5), Duration::days(1)).is_usable(now));
        assert!(!link(0, None, Duration::seconds(-1)).is_usable(now));
    }

    #[test]
    fn invite_links_cannot_mint_owners() {
        let input = InviteLinkInput {
            organization_role: OrganizationRole::Owner,
            max_uses: Some(0),
        };
        let issues = input.validate().unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["organizationRole", "maxUses"]);
    }
}
