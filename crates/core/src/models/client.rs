use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClientId, OrganizationId};
use crate::validation::{
    Issues, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_PHONE_LENGTH, Validate, ValidationIssue,
};

const MAX_ADDRESS_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub organization_id: OrganizationId,
    pub given_name: String,
    pub family_name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub id: ClientId,
    pub given_name: String,
    pub family_name: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

impl Validate for ClientInput {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Issues::new();
        issues.required("givenName", &self.given_name, MAX_NAME_LENGTH);
        issues.optional("familyName", Some(&self.family_name), MAX_NAME_LENGTH);
        issues.email("emailAddress", self.email_address.as_deref());
        issues.optional("phoneNumber", self.phone_number.as_deref(), MAX_PHONE_LENGTH);
        issues.optional("streetAddress", self.street_address.as_deref(), MAX_ADDRESS_LENGTH);
        issues.optional("city", self.city.as_deref(), MAX_NAME_LENGTH);
        issues.optional("state", self.state.as_deref(), MAX_NAME_LENGTH);
        issues.optional("postalCode", self.postal_code.as_deref(), MAX_PHONE_LENGTH);
        issues.optional("notes", self.notes.as_deref(), MAX_NOTES_LENGTH);
        issues.finish()
    }
}

impl Client {
    pub fn from_input(input: ClientInput, organization_id: OrganizationId, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id,
            organization_id,
            given_name: input.given_name,
            family_name: input.family_name,
            email_address: input.email_address,
            phone_number: input.phone_number,
            street_address: input.street_address,
            city: input.city,
            state: input.state,
            postal_code: input.postal_code,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_input(&mut self, input: ClientInput, now: DateTime<Utc>) {
        self.given_name = input.given_name;
        self.family_name = input.family_name;
        self.email_address = input.email_address;
        self.phone_number = input.phone_number;
        self.street_address = input.street_address;
        self.city = input.city;
        self.state = input.state;
        self.postal_code = input.postal_code;
        self.notes = input.notes;
        self.updated_at = now;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name).trim().to_string()
    }
}
