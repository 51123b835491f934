use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const ID_LENGTH: usize = 24;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a collision-resistant short id: 24 lowercase base-36 characters,
/// always starting with a letter.
///
/// A time-ordered UUID and a random salt are hashed together so ids do not
/// leak creation order or a counter.
pub fn generate_id() -> String {
    let salt: [u8; 32] = rand::random();
    let mut hasher = blake3::Hasher::new();
    hasher.update(Uuid::now_v7().as_bytes());
    hasher.update(&salt);
    let digest = hasher.finalize();
    let bytes = digest.as_bytes();

    let mut id = String::with_capacity(ID_LENGTH);
    id.push((b'a' + bytes[0] % 26) as char);
    for byte in &bytes[1..ID_LENGTH] {
        id.push(ALPHABET[(*byte % 36) as usize] as char);
    }
    id
}

macro_rules! short_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(generate_id())
            }

            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let short = self.0.get(..8).unwrap_or(&self.0);
                write!(f, "{}({})", stringify!($name), short)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

short_id!(OrganizationId);
short_id!(UserId);
short_id!(InviteLinkId);
short_id!(DogId);
short_id!(DogSessionId);
short_id!(ClientId);
short_id!(VetId);
short_id!(VetClinicId);
short_id!(BookingId);
short_id!(BookingTypeId);
short_id!(RelationshipId);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_short_lowercase_and_start_with_a_letter() {
        for _ in 0..200 {
            let id = generate_id();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.chars().next().is_some_and(|c| c.is_ascii_lowercase()));
            assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<String> = (0..5_000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 5_000);
    }

    #[test]
    fn debug_truncates_and_display_does_not() {
        let id = DogId::from_string("abcdefghijklmnopqrstuvwx");
        assert_eq!(format!("{id:?}"), "DogId(abcdefgh)");
        assert_eq!(id.to_string(), "abcdefghijklmnopqrstuvwx");
        assert_eq!(format!("{:?}", DogId::from_string("ab")), "DogId(ab)");
    }
}
