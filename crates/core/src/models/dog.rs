use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DogId, OrganizationId};
use crate::models::string_enum;
use crate::validation::{Issues, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, Validate, ValidationIssue};

string_enum! {
    DogSex, "dog sex" {
        Male => "male",
        Female => "female",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dog {
    pub id: DogId,
    pub organization_id: OrganizationId,
    pub given_name: String,
    pub breed: String,
    pub color: String,
    pub sex: DogSex,
    pub desexed: bool,
    pub date_of_birth: DateTime<Utc>,
    pub is_age_estimate: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The dog form. The id is generated client-side so relationship rows staged
/// before the first save can already point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogInput {
    pub id: DogId,
    pub given_name: String,
    pub breed: String,
    pub color: String,
    pub sex: DogSex,
    pub desexed: bool,
    pub date_of_birth: DateTime<Utc>,
    pub is_age_estimate: bool,
    pub notes: Option<String>,
}

impl Validate for DogInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("givenName", &self.given_name, MAX_NAME_LENGTH);
        issues.required("breed", &self.breed, MAX_NAME_LENGTH);
        issues.required("color", &self.color, MAX_NAME_LENGTH);
        issues.optional("notes", self.notes.as_deref(), MAX_NOTES_LENGTH);
        if self.date_of_birth > Utc::now() {
            issues.push("dateOfBirth", "Cannot be in the future");
        }
        issues.finish()
    }
}

impl Dog {
    pub fn from_input(input: DogInput, organization_id: OrganizationId, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            organization_id,
            given_name: input.given_name,
            breed: input.breed,
            color: input.color,
            sex: input.sex,
            desexed: input.desexed,
            date_of_birth: input.date_of_birth,
            is_age_estimate: input.is_age_estimate,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: DogInput, now: DateTime<Utc>) {
        self.given_name = input.given_name;
        self.breed = input.breed;
        self.color = input.color;
        self.sex = input.sex;
        self.desexed = input.desexed;
        self.date_of_birth = input.date_of_birth;
        self.is_age_estimate = input.is_age_estimate;
        self.notes = input.notes;
        self.updated_at = now;
    }
}
