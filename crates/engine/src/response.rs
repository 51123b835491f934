//! The envelope every action returns.
//!
//! Serializes to `{"success": true, "data": ...}` or
//! `{"success": false, "error": ...}` where `error` is either a list of
//! field issues or a single message.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::error;

use kennel_core::ValidationIssue;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionError {
    Issues(Vec<ValidationIssue>),
    Message(String),
}

impl ActionError {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Issues(issues) => issues,
            Self::Message(_) => &[],
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message(message) => Some(message),
            Self::Issues(_) => None,
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Issues(issues) => {
                let parts: Vec<String> = issues
                    .iter()
                    .map(|issue| format!("{}: {}", issue.path, issue.message))
                    .collect();
                f.write_str(&parts.join("; "))
            }
        }
    }
}

impl std::error::Error for ActionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionResponse<T> {
    Success(T),
    Failure(ActionError),
}

impl<T> ActionResponse<T> {
    /// Collapse an engine result for the action named `operation`
    /// (e.g. "update dog"). Storage and core failures are logged and
    /// reported as "Failed to <operation>".
    pub fn from_result(operation: &str, result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(EngineError::Validation(issues)) => Self::Failure(ActionError::Issues(issues)),
            Err(
                err @ (EngineError::Forbidden(_)
                | EngineError::NotFound { .. }
                | EngineError::Rejected(_)
                | EngineError::Unauthenticated),
            ) => Self::Failure(ActionError::Message(err.to_string())),
            Err(err) => {
                error!(operation, error = %err, "action failed");
                Self::Failure(ActionError::Message(format!("Failed to {operation}")))
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, ActionError> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(err) => Err(err),
        }
    }
}

impl<T: Serialize> Serialize for ActionResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ActionResponse", 2)?;
        match self {
            Self::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure(err) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", err)?;
            }
        }
        state.end()
    }
}

/// Run an action body and wrap its result.
pub(crate) fn respond<T>(
    operation: &str,
    body: impl FnOnce() -> Result<T, EngineError>,
) -> ActionResponse<T> {
    ActionResponse::from_result(operation, body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_storage::StorageError;
    use serde_json::json;

    #[test]
    fn success_envelope() {
        let response = ActionResponse::from_result("list dogs", Ok(vec![1, 2]));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "data": [1, 2]})
        );
    }

    #[test]
    fn validation_failures_keep_their_issues() {
        let response: ActionResponse<()> = ActionResponse::from_result(
            "insert dog",
            Err(EngineError::invalid("givenName", "Required")),
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": [{"path": "givenName", "message": "Required"}]
            })
        );
    }

    #[test]
    fn storage_failures_collapse_to_a_generic_message() {
        let response: ActionResponse<()> = ActionResponse::from_result(
            "update dog",
            Err(EngineError::Storage(StorageError::ConstraintViolation(
                "UNIQUE constraint failed: dogs.id".into(),
            ))),
        );
        assert_eq!(
            response.error().and_then(ActionError::message),
            Some("Failed to update dog")
        );
    }

    #[test]
    fn not_found_is_reported_verbatim() {
        let response: ActionResponse<()> = ActionResponse::from_result(
            "get dog",
            Err(EngineError::not_found("dog", "abc")),
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "dog not found: abc"})
        );
    }
}
