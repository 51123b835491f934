//! Seek pagination for "load more" history lists (bookings, dog sessions).
//!
//! Rows are ordered by `(date, id)` in one direction and a page starts
//! strictly after the last row of the previous one:
//! `date <op> c.date OR (date = c.date AND id <op> c.id)`. The key is an
//! [`OrderByColumn`] list like any offset-paginated list, so storage renders
//! ORDER BY and the seek predicate from the same value.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{Booking, DogSession};
use crate::pagination::{OrderByColumn, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: String,
    pub date: DateTime<Utc>,
}

impl Cursor {
    pub fn new(id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self { id: id.into(), date }
    }

    /// Opaque form handed to clients.
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.date.timestamp_millis(), self.id);
        STANDARD_NO_PAD.encode(raw.as_bytes())
    }

    /// Inverse of [`Cursor::encode`]. A blank string means "first page".
    pub fn decode(cursor: &str) -> Result<Option<Self>, CoreError> {
        let cursor = cursor.trim();
        if cursor.is_empty() {
            return Ok(None);
        }
        let bytes = STANDARD_NO_PAD
            .decode(cursor.as_bytes())
            .map_err(|e| CoreError::InvalidCursor(e.to_string()))?;
        let raw = String::from_utf8(bytes).map_err(|e| CoreError::InvalidCursor(e.to_string()))?;
        let (millis, id) = raw
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidCursor("missing separator".into()))?;
        if id.is_empty() {
            return Err(CoreError::InvalidCursor("missing id".into()));
        }
        let millis: i64 = millis
            .parse()
            .map_err(|_| CoreError::InvalidCursor(format!("invalid timestamp: {millis}")))?;
        let date = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| CoreError::InvalidCursor(format!("timestamp out of range: {millis}")))?;
        Ok(Some(Self::new(id, date)))
    }
}

/// Compound `(column, id)` ordering used by seek pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekKey {
    pub column: &'static str,
    pub id_column: &'static str,
    pub direction: SortDirection,
}

impl SeekKey {
    pub fn new(column: &'static str, id_column: &'static str, direction: SortDirection) -> Self {
        Self {
            column,
            id_column,
            direction,
        }
    }

    /// The id tie-break runs in the same direction as the date so the
    /// predicate stays a single lexicographic comparison.
    pub fn order_by(&self) -> Vec<OrderByColumn> {
        vec![
            OrderByColumn::new(self.column, self.direction),
            OrderByColumn::new(self.id_column, self.direction),
        ]
    }
}

/// Rows that can hand out a cursor pointing at themselves.
pub trait Seekable {
    fn cursor(&self) -> Cursor;
}

impl Seekable for Booking {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.id.as_str(), self.date)
    }
}

impl Seekable for DogSession {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.id.as_str(), self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T: Seekable> CursorPage<T> {
    /// Build a page from a query that fetched `limit + 1` rows: the extra
    /// row only signals that another page exists.
    pub fn from_overfetch(mut rows: Vec<T>, limit: usize) -> Self {
        let mut next_cursor = None;
        if rows.len() > limit {
            rows.truncate(limit);
            next_cursor = rows.last().map(|row| row.cursor().encode());
        }
        Self {
            items: rows,
            next_cursor,
        }
    }
}
