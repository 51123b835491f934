//! Tenant-scoped domain records and the inputs that create or change them.

pub mod auth_session;
pub mod booking;
pub mod booking_type;
pub mod client;
pub mod dog;
pub mod dog_session;
pub mod organization;
pub mod relationships;
pub mod vet;
pub mod vet_clinic;

pub use auth_session::AuthSession;
pub use booking::{Booking, BookingInput};
pub use booking_type::{BookingType, BookingTypeInput};
pub use client::{Client, ClientInput};
pub use dog::{Dog, DogInput, DogSex};
pub use dog_session::{DogSession, DogSessionUpdate};
pub use organization::{
    AcceptInviteInput, InviteLinkInput, Organization, OrganizationInput, OrganizationInviteLink,
    OrganizationRole, SignUpInput, User,
};
pub use relationships::{
    DogToClientRelationship, DogToClientRelationshipKind, DogToVetRelationship,
    DogToVetRelationshipKind, RelationshipUpdate, VetToVetClinicRelationship,
    VetToVetClinicRelationshipKind,
};
pub use vet::{Vet, VetInput};
pub use vet_clinic::{VetClinic, VetClinicInput};

use crate::error::CoreError;

/// An enum persisted and transmitted as a fixed lowercase string.
pub trait StringEnum: Sized + Copy + 'static {
    const KIND: &'static str;

    fn as_str(&self) -> &'static str;

    fn parse(s: &str) -> Result<Self, CoreError>;
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl $crate::models::StringEnum for $name {
            const KIND: &'static str = $kind;

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            fn parse(s: &str) -> Result<Self, $crate::error::CoreError> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err($crate::error::CoreError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::models::StringEnum::as_str(self))
            }
        }
    };
}

pub(crate) use string_enum;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_enums_round_trip_through_their_wire_names() {
        for kind in DogToClientRelationshipKind::ALL {
            assert_eq!(DogToClientRelationshipKind::parse(kind.as_str()).unwrap(), *kind);
        }
        assert_eq!(
            serde_json::to_string(&VetToVetClinicRelationshipKind::FullTime).unwrap(),
            "\"full-time\""
        );
        assert_eq!(OrganizationRole::parse("admin").unwrap(), OrganizationRole::Admin);
    }

    #[test]
    fn unknown_variant_names_the_enum() {
        let err = DogSex::parse("hermaphrodite").unwrap_err();
        assert_eq!(err.to_string(), "unknown dog sex: hermaphrodite");
    }
}
