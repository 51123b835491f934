//! Field-level input validation.
//!
//! Every input accepted by a server action implements [`Validate`]. Issues
//! are collected rather than short-circuited so a form can highlight every
//! bad field at once.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_PHONE_LENGTH: usize = 32;
pub const MAX_NOTES_LENGTH: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationIssue>>;
}

/// Accumulates issues for one input.
#[derive(Debug, Default)]
pub struct Issues(Vec<ValidationIssue>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue::new(path, message));
    }

    pub fn required(&mut self, path: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.push(path, "Required");
        } else if value.chars().count() > max_len {
            self.push(path, format!("Must be at most {max_len} characters"));
        }
    }

    pub fn optional(&mut self, path: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value
            && value.chars().count() > max_len
        {
            self.push(path, format!("Must be at most {max_len} characters"));
        }
    }

    pub fn email(&mut self, path: &str, value: Option<&str>) {
        let Some(value) = value else { return };
        if value.is_empty() {
            return;
        }
        if value.chars().count() > MAX_EMAIL_LENGTH {
            self.push(path, format!("Must be at most {MAX_EMAIL_LENGTH} characters"));
        } else if !looks_like_email(value) {
            self.push(path, "Invalid email address");
        }
    }

    pub fn positive(&mut self, path: &str, value: i64) {
        if value <= 0 {
            self.push(path, "Must be greater than 0");
        }
    }

    /// Merge the issues of a nested input under `prefix`.
    pub fn nested(&mut self, prefix: &str, result: Result<(), Vec<ValidationIssue>>) {
        if let Err(issues) = result {
            self.0.extend(issues.into_iter().map(|issue| ValidationIssue {
                path: format!("{prefix}.{}", issue.path),
                message: issue.message,
            }));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), Vec<ValidationIssue>> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}

// One `@`, no whitespace, and a dotted domain without empty labels.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email validation pattern to compile")
});

fn looks_like_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}
