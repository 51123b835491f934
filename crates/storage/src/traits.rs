use crate::error::StorageError;
use crate::query::{Filter, FindMany};
use crate::record::{Changeset, Record};

/// Tenant-aware reads. Implemented by the connection handle and by an open
/// transaction so actions can read their own uncommitted writes.
pub trait ReadStorage {
    fn count<R: Record>(&self, filter: &Filter) -> Result<u64, StorageError>;

    fn find_many<R: Record>(&self, query: &FindMany) -> Result<Vec<R>, StorageError>;

    /// First row of `query` (its limit is forced to 1).
    fn find_first<R: Record>(&self, query: &FindMany) -> Result<Option<R>, StorageError>;
}

/// Writes. Only available inside a transaction.
pub trait WriteStorage: ReadStorage {
    fn insert<R: Record>(&self, rows: &[R]) -> Result<usize, StorageError>;

    fn update<R: Record>(&self, changes: &Changeset, filter: &Filter) -> Result<usize, StorageError>;

    fn delete<R: Record>(&self, filter: &Filter) -> Result<usize, StorageError>;
}
