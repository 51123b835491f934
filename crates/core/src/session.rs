//! The signed-in user an action runs on behalf of.

use serde::{Deserialize, Serialize};

use crate::ids::{OrganizationId, UserId};
use crate::models::{OrganizationRole, User};

/// Resolved from a session token and passed explicitly into every action.
/// Supplies the tenant id and the role used for authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub organization_role: OrganizationRole,
    pub email_address: String,
    pub given_name: String,
    pub family_name: String,
}

impl CurrentUser {
    pub fn can_manage_organization(&self) -> bool {
        self.organization_role.can_manage_organization()
    }

    pub fn is_owner(&self) -> bool {
        self.organization_role == OrganizationRole::Owner
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            organization_id: user.organization_id.clone(),
            organization_role: user.organization_role,
            email_address: user.email_address.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
        }
    }
}
