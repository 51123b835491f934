//! Many-to-many join rows. Each carries a `relationship` value describing
//! the nature of the link, which is the only field editable after creation.
//!
//! Rows built client-side with `new` carry an empty organization id; the
//! action log stamps the tenant when it is partitioned on submit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action_log::{LoggedRow, Relationship};
use crate::ids::{ClientId, DogId, OrganizationId, RelationshipId, VetClinicId, VetId};
use crate::models::string_enum;

string_enum! {
    DogToClientRelationshipKind, "dog to client relationship" {
        Owner => "owner",
        EmergencyContact => "emergency-contact",
        Fosterer => "fosterer",
        Groomer => "groomer",
        Walker => "walker",
        Other => "other",
    }
}

string_enum! {
    DogToVetRelationshipKind, "dog to vet relationship" {
        Primary => "primary",
        Secondary => "secondary",
    }
}

string_enum! {
    VetToVetClinicRelationshipKind, "vet to vet clinic relationship" {
        FullTime => "full-time",
        PartTime => "part-time",
    }
}

/// Partial update of a join row, addressed by its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipUpdate<K> {
    pub id: RelationshipId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<K>,
}

impl<K> RelationshipUpdate<K> {
    pub fn new(id: RelationshipId, relationship: K) -> Self {
        Self {
            id,
            relationship: Some(relationship),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogToClientRelationship {
    pub id: RelationshipId,
    pub organization_id: OrganizationId,
    pub dog_id: DogId,
    pub client_id: ClientId,
    pub relationship: DogToClientRelationshipKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DogToClientRelationship {
    pub fn new(
        dog_id: DogId,
        client_id: ClientId,
        relationship: DogToClientRelationshipKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::new(),
            organization_id: OrganizationId::from_string(""),
            dog_id,
            client_id,
            relationship,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DogToVetRelationship {
    pub id: RelationshipId,
    pub organization_id: OrganizationId,
    pub dog_id: DogId,
    pub vet_id: VetId,
    pub relationship: DogToVetRelationshipKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DogToVetRelationship {
    pub fn new(
        dog_id: DogId,
        vet_id: VetId,
        relationship: DogToVetRelationshipKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::new(),
            organization_id: OrganizationId::from_string(""),
            dog_id,
            vet_id,
            relationship,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetToVetClinicRelationship {
    pub id: RelationshipId,
    pub organization_id: OrganizationId,
    pub vet_id: VetId,
    pub vet_clinic_id: VetClinicId,
    pub relationship: VetToVetClinicRelationshipKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VetToVetClinicRelationship {
    pub fn new(
        vet_id: VetId,
        vet_clinic_id: VetClinicId,
        relationship: VetToVetClinicRelationshipKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::new(),
            organization_id: OrganizationId::from_string(""),
            vet_id,
            vet_clinic_id,
            relationship,
            created_at: now,
            updated_at: now,
        }
    }
}

macro_rules! impl_relationship {
    ($row:ty, $kind:ty) => {
        impl LoggedRow for $row {
            type Id = RelationshipId;
            type Update = RelationshipUpdate<$kind>;

            fn row_id(&self) -> &RelationshipId {
                &self.id
            }

            fn update_id(update: &Self::Update) -> &RelationshipId {
                &update.id
            }

            fn set_organization_id(&mut self, organization_id: &OrganizationId) {
                self.organization_id = organization_id.clone();
            }

            fn apply_update(&mut self, update: &Self::Update) {
                if let Some(kind) = update.relationship {
                    self.relationship = kind;
                }
            }
        }

        impl Relationship for $row {
            type Kind = $kind;

            fn relationship(&self) -> &$kind {
                &self.relationship
            }

            fn set_relationship(&mut self, kind: $kind) {
                self.relationship = kind;
            }

            fn relationship_override(update: &Self::Update) -> Option<&$kind> {
                update.relationship.as_ref()
            }

            fn kind_update(id: RelationshipId, kind: $kind) -> Self::Update {
                RelationshipUpdate::new(id, kind)
            }
        }
    };
}

impl_relationship!(DogToClientRelationship, DogToClientRelationshipKind);
impl_relationship!(DogToVetRelationship, DogToVetRelationshipKind);
impl_relationship!(VetToVetClinicRelationship, VetToVetClinicRelationshipKind);
