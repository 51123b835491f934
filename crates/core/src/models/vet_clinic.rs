use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrganizationId, VetClinicId};
use crate::validation::{
    Issues, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_PHONE_LENGTH, Validate, ValidationIssue,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetClinic {
    pub id: VetClinicId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetClinicInput {
    pub id: VetClinicId,
    pub name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
}

impl Validate for VetClinicInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("name", &self.name, MAX_NAME_LENGTH);
        issues.email("emailAddress", self.email_address.as_deref());
        issues.optional("phoneNumber", self.phone_number.as_deref(), MAX_PHONE_LENGTH);
        issues.optional("notes", self.notes.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}

impl VetClinic {
    pub fn from_input(
        input: VetClinicInput,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: input.id,
            organization_id,
            name: input.name,
            email_address: input.email_address,
            phone_number: input.phone_number,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: VetClinicInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.email_address = input.email_address;
        self.phone_number = input.phone_number;
        self.notes = input.notes;
        self.updated_at = now;
    }
}
