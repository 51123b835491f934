pub mod error;
pub mod query;
pub mod record;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use query::{Condition, Filter, FindMany};
pub use record::{Changeset, Patch, Record};
pub use rusqlite::types::Value;
pub use sqlite::{SqliteStorage, StorageTx};
pub use traits::*;
