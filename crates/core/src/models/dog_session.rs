use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action_log::LoggedRow;
use crate::ids::{DogId, DogSessionId, OrganizationId, UserId};
use crate::validation::{Issues, MAX_NOTES_LENGTH, Validate, ValidationIssue};

/// One entry in a dog's session history (a visit, a training session, a
/// stay). Edited through the dog form's action log like a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogSession {
    pub id: DogSessionId,
    pub organization_id: OrganizationId,
    pub dog_id: DogId,
    pub user_id: Option<UserId>,
    pub date: DateTime<Utc>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogSessionUpdate {
    pub id: DogSessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// `Some("")` clears the details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LoggedRow for DogSession {
    type Id = DogSessionId;
    type Update = DogSessionUpdate;

    fn row_id(&self) -> &DogSessionId {
        &self.id
    }

    fn update_id(update: &DogSessionUpdate) -> &DogSessionId {
        &update.id
    }

    fn set_organization_id(&mut self, organization_id: &OrganizationId) {
        self.organization_id = organization_id.clone();
    }

    fn apply_update(&mut self, update: &DogSessionUpdate) {
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(details) = &update.details {
            self.details = (!details.trim().is_empty()).then(|| details.clone());
        }
    }
}

impl Validate for DogSession {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.optional("details", self.details.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}

impl Validate for DogSessionUpdate {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.optional("details", self.details.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}
