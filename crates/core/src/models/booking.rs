use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BookingId, BookingTypeId, DogId, OrganizationId, UserId};
use crate::models::booking_type::MAX_DURATION_MINUTES;
use crate::validation::{Issues, MAX_NOTES_LENGTH, Validate, ValidationIssue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub organization_id: OrganizationId,
    pub dog_id: Option<DogId>,
    pub assigned_to_id: Option<UserId>,
    pub booking_type_id: Option<BookingTypeId>,
    pub date: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.date + Duration::minutes(self.duration)
    }

    pub fn from_input(input: BookingInput, organization_id: OrganizationId, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            organization_id,
            dog_id: input.dog_id,
            assigned_to_id: input.assigned_to_id,
            booking_type_id: input.booking_type_id,
            date: input.date,
            duration: input.duration,
            details: input.details,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: BookingInput, now: DateTime<Utc>) {
        self.dog_id = input.dog_id;
        self.assigned_to_id = input.assigned_to_id;
        self.booking_type_id = input.booking_type_id;
        self.date = input.date;
        self.duration = input.duration;
        self.details = input.details;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub id: BookingId,
    pub dog_id: Option<DogId>,
    pub assigned_to_id: Option<UserId>,
    pub booking_type_id: Option<BookingTypeId>,
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub details: Option<String>,
}

impl Validate for BookingInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.positive("duration", self.duration);
        if self.duration > MAX_DURATION_MINUTES {
            issues.push("duration", "Must be at most one week");
        }
        issues.optional("details", self.details.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}
