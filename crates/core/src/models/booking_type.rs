use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BookingTypeId, OrganizationId};
use crate::validation::{Issues, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, Validate, ValidationIssue};

/// Longest bookable block, in minutes (one week).
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingType {
    pub id: BookingTypeId,
    pub organization_id: OrganizationId,
    pub name: String,
    /// Minutes.
    pub duration: i64,
    pub details: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingTypeInput {
    pub id: BookingTypeId,
    pub name: String,
    pub duration: i64,
    pub details: Option<String>,
    pub is_default: bool,
}

impl Validate for BookingTypeInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("name", &self.name, MAX_NAME_LENGTH);
        issues.positive("duration", self.duration);
        if self.duration > MAX_DURATION_MINUTES {
            issues.push("duration", "Must be at most one week");
        }
        issues.optional("details", self.details.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}

impl BookingType {
    pub fn from_input(
        input: BookingTypeInput,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: input.id,
            organization_id,
            name: input.name,
            duration: input.duration,
            details: input.details,
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: BookingTypeInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.duration = input.duration;
        self.details = input.details;
        self.is_default = input.is_default;
        self.updated_at = now;
    }
}
