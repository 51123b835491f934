use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
