use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// SQL name of the Unicode case fold used by search. SQLite's own `lower()`
/// only folds ASCII.
pub const FOLD_FUNCTION: &str = "kennel_fold";

pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    register_functions(conn)?;
    Ok(())
}

fn register_functions(conn: &Connection) -> Result<(), StorageError> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| fold_case(&s)))
        },
    )?;
    Ok(())
}

// Timestamps are epoch milliseconds; booleans are 0/1.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email_address TEXT,
    max_users INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    organization_role TEXT NOT NULL CHECK (organization_role IN ('owner', 'admin', 'member')),
    given_name TEXT NOT NULL,
    family_name TEXT NOT NULL,
    email_address TEXT NOT NULL UNIQUE,
    email_verified INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_organization ON users (organization_id);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions (user_id);

CREATE TABLE IF NOT EXISTS organization_invite_links (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    organization_role TEXT NOT NULL CHECK (organization_role IN ('admin', 'member')),
    uses INTEGER NOT NULL DEFAULT 0,
    max_uses INTEGER,
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_invite_links_organization ON organization_invite_links (organization_id);

CREATE TABLE IF NOT EXISTS dogs (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    given_name TEXT NOT NULL,
    breed TEXT NOT NULL,
    color TEXT NOT NULL,
    sex TEXT NOT NULL,
    desexed INTEGER NOT NULL,
    date_of_birth INTEGER NOT NULL,
    is_age_estimate INTEGER NOT NULL,
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dogs_organization ON dogs (organization_id, given_name);

CREATE TABLE IF NOT EXISTS dog_sessions (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    dog_id TEXT NOT NULL REFERENCES dogs (id) ON DELETE CASCADE,
    user_id TEXT REFERENCES users (id) ON DELETE SET NULL,
    date INTEGER NOT NULL,
    details TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dog_sessions_dog ON dog_sessions (dog_id, date, id);

CREATE TABLE IF NOT EXISTS clients (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    given_name TEXT NOT NULL,
    family_name TEXT NOT NULL,
    email_address TEXT,
    phone_number TEXT,
    street_address TEXT,
    city TEXT,
    state TEXT,
    postal_code TEXT,
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_clients_organization ON clients (organization_id, given_name, family_name);

CREATE TABLE IF NOT EXISTS vets (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    given_name TEXT NOT NULL,
    family_name TEXT NOT NULL,
    email_address TEXT,
    phone_number TEXT,
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vets_organization ON vets (organization_id, given_name, family_name);

CREATE TABLE IF NOT EXISTS vet_clinics (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    email_address TEXT,
    phone_number TEXT,
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vet_clinics_organization ON vet_clinics (organization_id, name);

CREATE TABLE IF NOT EXISTS booking_types (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    duration INTEGER NOT NULL CHECK (duration > 0),
    details TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_booking_types_organization ON booking_types (organization_id, name);

CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    dog_id TEXT REFERENCES dogs (id) ON DELETE SET NULL,
    assigned_to_id TEXT REFERENCES users (id) ON DELETE SET NULL,
    booking_type_id TEXT REFERENCES booking_types (id) ON DELETE SET NULL,
    date INTEGER NOT NULL,
    duration INTEGER NOT NULL CHECK (duration > 0),
    details TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_bookings_organization ON bookings (organization_id, date, id);
CREATE INDEX IF NOT EXISTS idx_bookings_dog ON bookings (dog_id, date, id);

CREATE TABLE IF NOT EXISTS dog_to_client_relationships (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    dog_id TEXT NOT NULL REFERENCES dogs (id) ON DELETE CASCADE,
    client_id TEXT NOT NULL REFERENCES clients (id) ON DELETE CASCADE,
    relationship TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (dog_id, client_id)
);
CREATE INDEX IF NOT EXISTS idx_dog_to_client_client ON dog_to_client_relationships (client_id);

CREATE TABLE IF NOT EXISTS dog_to_vet_relationships (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    dog_id TEXT NOT NULL REFERENCES dogs (id) ON DELETE CASCADE,
    vet_id TEXT NOT NULL REFERENCES vets (id) ON DELETE CASCADE,
    relationship TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (dog_id, vet_id)
);
CREATE INDEX IF NOT EXISTS idx_dog_to_vet_vet ON dog_to_vet_relationships (vet_id);

CREATE TABLE IF NOT EXISTS vet_to_vet_clinic_relationships (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations (id) ON DELETE CASCADE,
    vet_id TEXT NOT NULL REFERENCES vets (id) ON DELETE CASCADE,
    vet_clinic_id TEXT NOT NULL REFERENCES vet_clinics (id) ON DELETE CASCADE,
    relationship TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (vet_id, vet_clinic_id)
);
CREATE INDEX IF NOT EXISTS idx_vet_to_vet_clinic_clinic ON vet_to_vet_clinic_relationships (vet_clinic_id);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_handles_non_ascii_and_null() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;

        let folded: String = conn.query_row("SELECT kennel_fold('ÉCLAIR Ñúñez')", [], |row| row.get(0))?;
        assert_eq!(folded, "éclair ñúñez");
        let null: Option<String> = conn.query_row("SELECT kennel_fold(NULL)", [], |row| row.get(0))?;
        assert_eq!(null, None);
        Ok(())
    }
}
