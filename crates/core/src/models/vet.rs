use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrganizationId, VetId};
use crate::validation::{
    Issues, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_PHONE_LENGTH, Validate, ValidationIssue,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vet {
    pub id: VetId,
    pub organization_id: OrganizationId,
    pub given_name: String,
    pub family_name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetInput {
    pub id: VetId,
    pub given_name: String,
    pub family_name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
}

impl Validate for VetInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("givenName", &self.given_name, MAX_NAME_LENGTH);
        issues.optional("familyName", Some(&self.family_name), MAX_NAME_LENGTH);
        issues.email("emailAddress", self.email_address.as_deref());
        issues.optional("phoneNumber", self.phone_number.as_deref(), MAX_PHONE_LENGTH);
        issues.optional("notes", self.notes.as_deref(), MAX_NOTES_LENGTH);
        if self.email_address.as_deref().unwrap_or("").is_empty()
            && self.phone_number.as_deref().unwrap_or("").is_empty()
        {
            issues.push("phoneNumber", "An email address or phone number is required");
        }
        issues.finish()
    }
}

impl Vet {
    pub fn from_input(input: VetInput, organization_id: OrganizationId, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            organization_id,
            given_name: input.given_name,
            family_name: input.family_name,
            email_address: input.email_address,
            phone_number: input.phone_number,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: VetInput, now: DateTime<Utc>) {
        self.given_name = input.given_name;
        self.family_name = input.family_name;
        self.email_address = input.email_address;
        self.phone_number = input.phone_number;
        self.notes = input.notes;
        self.updated_at = now;
    }
}
