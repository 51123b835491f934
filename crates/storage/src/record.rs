//! Row mapping between domain models and their SQLite tables.
//!
//! Every persisted model implements [`Record`]: a table name, the column
//! list in `SELECT`/`INSERT` order, and conversions to and from rusqlite
//! values. Timestamps are stored as epoch milliseconds and string enums by
//! their wire name.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{Type, Value};

use kennel_core::models::{
    AuthSession, Booking, BookingType, Client, Dog, DogSession, DogSessionUpdate,
    DogToClientRelationship, DogToVetRelationship, Organization, OrganizationInviteLink,
    RelationshipUpdate, StringEnum, User, Vet, VetClinic, VetToVetClinicRelationship,
};
use kennel_core::{
    BookingId, BookingTypeId, ClientId, DogId, DogSessionId, InviteLinkId, OrganizationId,
    RelationshipId, UserId, VetClinicId, VetId,
};

pub const ID_COLUMN: &str = "id";
pub const TENANT_COLUMN: &str = "organization_id";

pub trait Record: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    /// Column holding the owning organization; `None` for tables that are
    /// not tenant-scoped (organizations themselves, auth sessions).
    const TENANT_COLUMN: Option<&'static str> = Some(TENANT_COLUMN);

    fn id(&self) -> &str;

    /// Values in [`Record::COLUMNS`] order.
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Full-row update: every column except the key, the tenant and the
    /// creation time.
    fn changes(&self) -> Changeset {
        let mut changes = Changeset::new();
        for (column, value) in Self::COLUMNS.iter().copied().zip(self.to_values()) {
            if column == ID_COLUMN || Some(column) == Self::TENANT_COLUMN || column == "created_at" {
                continue;
            }
            changes = changes.set(column, value);
        }
        changes
    }
}

/// Column assignments for an `UPDATE`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    assignments: Vec<(&'static str, Value)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.assignments.iter().map(|(c, v)| (*c, v))
    }
}

/// A partial update addressed by row id.
pub trait Patch {
    fn target_id(&self) -> &str;

    fn changeset(&self, now: DateTime<Utc>) -> Changeset;
}

impl<K: StringEnum> Patch for RelationshipUpdate<K> {
    fn target_id(&self) -> &str {
        self.id.as_str()
    }

    fn changeset(&self, now: DateTime<Utc>) -> Changeset {
        let mut changes = Changeset::new();
        if let Some(kind) = self.relationship {
            changes = changes.set("relationship", string_enum(kind));
        }
        if changes.is_empty() {
            return changes;
        }
        changes.set("updated_at", timestamp(now))
    }
}

impl Patch for DogSessionUpdate {
    fn target_id(&self) -> &str {
        self.id.as_str()
    }

    fn changeset(&self, now: DateTime<Utc>) -> Changeset {
        let mut changes = Changeset::new();
        if let Some(date) = self.date {
            changes = changes.set("date", timestamp(date));
        }
        if let Some(details) = &self.details {
            let details = (!details.is_empty()).then(|| details.as_str());
            changes = changes.set("details", opt_text(details));
        }
        if changes.is_empty() {
            return changes;
        }
        changes.set("updated_at", timestamp(now))
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::Integer(at.timestamp_millis())
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text)
}

pub fn flag(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

pub fn string_enum<E: StringEnum>(e: E) -> Value {
    text(e.as_str())
}

fn get_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        conversion_error(row, column, Type::Integer, format!("timestamp out of range: {millis}"))
    })
}

fn get_enum<E: StringEnum>(row: &Row<'_>, column: &str) -> rusqlite::Result<E> {
    let raw: String = row.get(column)?;
    E::parse(&raw).map_err(|e| conversion_error(row, column, Type::Text, e))
}

fn conversion_error(
    row: &Row<'_>,
    column: &str,
    ty: Type,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, ty, err.into())
}

// ---------------------------------------------------------------------------
// Organizations and accounts
// ---------------------------------------------------------------------------

impl Record for Organization {
    const TABLE: &'static str = "organizations";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "email_address", "max_users", "created_at", "updated_at"];
    const TENANT_COLUMN: Option<&'static str> = None;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(&self.name),
            opt_text(self.email_address.as_deref()),
            Value::Integer(self.max_users),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: OrganizationId::from_string(row.get::<_, String>("id")?),
            name: row.get("name")?,
            email_address: row.get("email_address")?,
            max_users: row.get("max_users")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "organization_role",
        "given_name",
        "family_name",
        "email_address",
        "email_verified",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            string_enum(self.organization_role),
            text(&self.given_name),
            text(&self.family_name),
            text(&self.email_address),
            flag(self.email_verified),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: UserId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            organization_role: get_enum(row, "organization_role")?,
            given_name: row.get("given_name")?,
            family_name: row.get("family_name")?,
            email_address: row.get("email_address")?,
            email_verified: row.get("email_verified")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for AuthSession {
    const TABLE: &'static str = "sessions";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "expires_at"];
    const TENANT_COLUMN: Option<&'static str> = None;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.id),
            text(self.user_id.as_str()),
            timestamp(self.expires_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: UserId::from_string(row.get::<_, String>("user_id")?),
            expires_at: get_timestamp(row, "expires_at")?,
        })
    }
}

impl Record for OrganizationInviteLink {
    const TABLE: &'static str = "organization_invite_links";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "user_id",
        "organization_role",
        "uses",
        "max_uses",
        "expires_at",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(self.user_id.as_str()),
            string_enum(self.organization_role),
            Value::Integer(self.uses),
            self.max_uses.map_or(Value::Null, Value::Integer),
            timestamp(self.expires_at),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: InviteLinkId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            user_id: UserId::from_string(row.get::<_, String>("user_id")?),
            organization_role: get_enum(row, "organization_role")?,
            uses: row.get("uses")?,
            max_uses: row.get("max_uses")?,
            expires_at: get_timestamp(row, "expires_at")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Clinic records
// ---------------------------------------------------------------------------

impl Record for Dog {
    const TABLE: &'static str = "dogs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "given_name",
        "breed",
        "color",
        "sex",
        "desexed",
        "date_of_birth",
        "is_age_estimate",
        "notes",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(&self.given_name),
            text(&self.breed),
            text(&self.color),
            string_enum(self.sex),
            flag(self.desexed),
            timestamp(self.date_of_birth),
            flag(self.is_age_estimate),
            opt_text(self.notes.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: DogId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            given_name: row.get("given_name")?,
            breed: row.get("breed")?,
            color: row.get("color")?,
            sex: get_enum(row, "sex")?,
            desexed: row.get("desexed")?,
            date_of_birth: get_timestamp(row, "date_of_birth")?,
            is_age_estimate: row.get("is_age_estimate")?,
            notes: row.get("notes")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for DogSession {
    const TABLE: &'static str = "dog_sessions";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "dog_id",
        "user_id",
        "date",
        "details",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(self.dog_id.as_str()),
            opt_text(self.user_id.as_ref().map(UserId::as_str)),
            timestamp(self.date),
            opt_text(self.details.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: DogSessionId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            dog_id: DogId::from_string(row.get::<_, String>("dog_id")?),
            user_id: row.get::<_, Option<String>>("user_id")?.map(UserId::from_string),
            date: get_timestamp(row, "date")?,
            details: row.get("details")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Client {
    const TABLE: &'static str = "clients";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "given_name",
        "family_name",
        "email_address",
        "phone_number",
        "street_address",
        "city",
        "state",
        "postal_code",
        "notes",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(&self.given_name),
            text(&self.family_name),
            opt_text(self.email_address.as_deref()),
            opt_text(self.phone_number.as_deref()),
            opt_text(self.street_address.as_deref()),
            opt_text(self.city.as_deref()),
            opt_text(self.state.as_deref()),
            opt_text(self.postal_code.as_deref()),
            opt_text(self.notes.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ClientId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            given_name: row.get("given_name")?,
            family_name: row.get("family_name")?,
            email_address: row.get("email_address")?,
            phone_number: row.get("phone_number")?,
            street_address: row.get("street_address")?,
            city: row.get("city")?,
            state: row.get("state")?,
            postal_code: row.get("postal_code")?,
            notes: row.get("notes")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Vet {
    const TABLE: &'static str = "vets";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "given_name",
        "family_name",
        "email_address",
        "phone_number",
        "notes",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(&self.given_name),
            text(&self.family_name),
            opt_text(self.email_address.as_deref()),
            opt_text(self.phone_number.as_deref()),
            opt_text(self.notes.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: VetId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            given_name: row.get("given_name")?,
            family_name: row.get("family_name")?,
            email_address: row.get("email_address")?,
            phone_number: row.get("phone_number")?,
            notes: row.get("notes")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for VetClinic {
    const TABLE: &'static str = "vet_clinics";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "name",
        "email_address",
        "phone_number",
        "notes",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(&self.name),
            opt_text(self.email_address.as_deref()),
            opt_text(self.phone_number.as_deref()),
            opt_text(self.notes.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: VetClinicId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            name: row.get("name")?,
            email_address: row.get("email_address")?,
            phone_number: row.get("phone_number")?,
            notes: row.get("notes")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for BookingType {
    const TABLE: &'static str = "booking_types";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "name",
        "duration",
        "details",
        "is_default",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            text(&self.name),
            Value::Integer(self.duration),
            opt_text(self.details.as_deref()),
            flag(self.is_default),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: BookingTypeId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            name: row.get("name")?,
            duration: row.get("duration")?,
            details: row.get("details")?,
            is_default: row.get("is_default")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Booking {
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "dog_id",
        "assigned_to_id",
        "booking_type_id",
        "date",
        "duration",
        "details",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.organization_id.as_str()),
            opt_text(self.dog_id.as_ref().map(DogId::as_str)),
            opt_text(self.assigned_to_id.as_ref().map(UserId::as_str)),
            opt_text(self.booking_type_id.as_ref().map(BookingTypeId::as_str)),
            timestamp(self.date),
            Value::Integer(self.duration),
            opt_text(self.details.as_deref()),
            timestamp(self.created_at),
            timestamp(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: BookingId::from_string(row.get::<_, String>("id")?),
            organization_id: OrganizationId::from_string(row.get::<_, String>("organization_id")?),
            dog_id: row.get::<_, Option<String>>("dog_id")?.map(DogId::from_string),
            assigned_to_id: row
                .get::<_, Option<String>>("assigned_to_id")?
                .map(UserId::from_string),
            booking_type_id: row
                .get::<_, Option<String>>("booking_type_id")?
                .map(BookingTypeId::from_string),
            date: get_timestamp(row, "date")?,
            duration: row.get("duration")?,
            details: row.get("details")?,
            created_at: get_timestamp(row, "created_at")?,
            updated_at: get_timestamp(row, "updated_at")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Join tables
// ---------------------------------------------------------------------------

macro_rules! relationship_record {
    ($row:ty, $table:literal, $left:ident: $left_id:ty, $right:ident: $right_id:ty) => {
        impl Record for $row {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[
                "id",
                "organization_id",
                stringify!($left),
                stringify!($right),
                "relationship",
                "created_at",
                "updated_at",
            ];

            fn id(&self) -> &str {
                self.id.as_str()
            }

            fn to_values(&self) -> Vec<Value> {
                vec![
                    text(self.id.as_str()),
                    text(self.organization_id.as_str()),
                    text(self.$left.as_str()),
                    text(self.$right.as_str()),
                    string_enum(self.relationship),
                    timestamp(self.created_at),
                    timestamp(self.updated_at),
                ]
            }

            fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    id: RelationshipId::from_string(row.get::<_, String>("id")?),
                    organization_id: OrganizationId::from_string(
                        row.get::<_, String>("organization_id")?,
                    ),
                    $left: <$left_id>::from_string(row.get::<_, String>(stringify!($left))?),
                    $right: <$right_id>::from_string(row.get::<_, String>(stringify!($right))?),
                    relationship: get_enum(row, "relationship")?,
                    created_at: get_timestamp(row, "created_at")?,
                    updated_at: get_timestamp(row, "updated_at")?,
                })
            }
        }
    };
}

relationship_record!(
    DogToClientRelationship,
    "dog_to_client_relationships",
    dog_id: DogId,
    client_id: ClientId
);
relationship_record!(
    DogToVetRelationship,
    "dog_to_vet_relationships",
    dog_id: DogId,
    vet_id: VetId
);
relationship_record!(
    VetToVetClinicRelationship,
    "vet_to_vet_clinic_relationships",
    vet_id: VetId,
    vet_clinic_id: VetClinicId
);

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::models::{DogToClientRelationshipKind, DogToVetRelationshipKind};

    #[test]
    fn columns_and_values_line_up() {
        let now = Utc::now();
        let rel = DogToVetRelationship::new(
            DogId::new(),
            VetId::new(),
            DogToVetRelationshipKind::Primary,
            now,
        );
        assert_eq!(DogToVetRelationship::COLUMNS.len(), rel.to_values().len());
        assert_eq!(DogToVetRelationship::COLUMNS[2], "dog_id");
        assert_eq!(DogToVetRelationship::COLUMNS[3], "vet_id");
        assert_eq!(rel.to_values()[4], Value::Text("primary".into()));
    }

    #[test]
    fn full_row_changes_skip_key_tenant_and_creation_time() {
        let rel = DogToClientRelationship::new(
            DogId::new(),
            ClientId::new(),
            DogToClientRelationshipKind::Walker,
            Utc::now(),
        );
        let columns: Vec<_> = rel.changes().iter().map(|(c, _)| c).collect();
        assert_eq!(
            columns,
            vec!["dog_id", "client_id", "relationship", "updated_at"]
        );
    }

    #[test]
    fn relationship_patch_without_a_value_is_empty() {
        let update: RelationshipUpdate<DogToClientRelationshipKind> = RelationshipUpdate {
            id: RelationshipId::new(),
            relationship: None,
        };
        assert!(update.changeset(Utc::now()).is_empty());

        let update = RelationshipUpdate::new(
            RelationshipId::new(),
            DogToClientRelationshipKind::Fosterer,
        );
        let changes = update.changeset(Utc::now());
        let first = changes.iter().next();
        assert_eq!(
            first,
            Some(("relationship", &Value::Text("fosterer".into())))
        );
    }

    #[test]
    fn dog_session_patch_clears_details_on_empty_string() {
        let update = DogSessionUpdate {
            id: DogSessionId::new(),
            date: None,
            details: Some(String::new()),
        };
        let changes = update.changeset(Utc::now());
        let first = changes.iter().next();
        assert_eq!(first, Some(("details", &Value::Null)));
    }
}
