use kennel_core::{CoreError, ValidationIssue};
use kennel_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid input ({} issues)", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request is well-formed but cannot be honored in the current state
    /// (expired invite link, seat limit reached).
    #[error("{0}")]
    Rejected(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl AsRef<str>) -> Self {
        Self::NotFound {
            entity,
            id: id.as_ref().to_string(),
        }
    }

    pub fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue::new(path, message)])
    }
}

impl From<Vec<ValidationIssue>> for EngineError {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self::Validation(issues)
    }
}
