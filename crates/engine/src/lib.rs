pub mod actions;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod response;

pub use actions::{
    ClientDetail, DogDetail, DogRelationshipLogs, Paginated, SignedIn, VetClinicDetail, VetDetail,
    VetRelationshipLogs,
};
pub use config::EngineConfig;
pub use editor::RelationshipEditor;
pub use error::EngineError;
pub use response::{ActionError, ActionResponse};

use chrono::{DateTime, SubsecRound, Utc};
use kennel_storage::SqliteStorage;
use tracing::info;

/// Server-side entry point. Owns the database connection; every public
/// action takes the signed-in [`kennel_core::CurrentUser`] explicitly and
/// returns an [`ActionResponse`].
pub struct Engine {
    storage: SqliteStorage,
    config: EngineConfig,
}

impl Engine {
    pub fn new(storage: SqliteStorage, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Open the configured database file, or an in-memory one when no path
    /// is set.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let storage = match config.database_path.as_deref() {
            Some(path) => SqliteStorage::open(path)?,
            None => SqliteStorage::open_in_memory()?,
        };
        info!(
            database = config.database_path.as_deref().unwrap_or(":memory:"),
            "engine opened"
        );
        Ok(Self::new(storage, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    /// Millisecond precision, matching what storage keeps, so returned
    /// records compare equal to their reloaded copies.
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}
