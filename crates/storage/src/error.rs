use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl StorageError {
    /// Lift constraint failures out of the generic sqlite variant.
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::ConstraintViolation(
                    message.unwrap_or_else(|| failure.to_string()),
                )
            }
            other => StorageError::Sqlite(other),
        }
    }
}
