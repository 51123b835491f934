use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params_from_iter};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::query::{Filter, FindMany, render_order_by};
use crate::record::{Changeset, Record};
use crate::traits::{ReadStorage, WriteStorage};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        debug!(path, "opened database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` in one SQLite transaction. Commits when `f` returns `Ok`;
    /// any error drops the transaction, which rolls every write back.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&StorageTx<'_>) -> Result<T, E>,
    {
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        let scope = StorageTx { tx };
        match f(&scope) {
            Ok(out) => {
                scope.tx.commit().map_err(StorageError::from)?;
                Ok(out)
            }
            Err(e) => {
                warn!("transaction rolled back");
                Err(e)
            }
        }
    }
}

impl ReadStorage for SqliteStorage {
    fn count<R: Record>(&self, filter: &Filter) -> Result<u64, StorageError> {
        count_rows::<R>(&self.conn, filter)
    }

    fn find_many<R: Record>(&self, query: &FindMany) -> Result<Vec<R>, StorageError> {
        select_rows(&self.conn, query)
    }

    fn find_first<R: Record>(&self, query: &FindMany) -> Result<Option<R>, StorageError> {
        select_first(&self.conn, query)
    }
}

/// An open write transaction. Borrowed by the closure passed to
/// [`SqliteStorage::transaction`].
pub struct StorageTx<'conn> {
    tx: Transaction<'conn>,
}

impl ReadStorage for StorageTx<'_> {
    fn count<R: Record>(&self, filter: &Filter) -> Result<u64, StorageError> {
        count_rows::<R>(&self.tx, filter)
    }

    fn find_many<R: Record>(&self, query: &FindMany) -> Result<Vec<R>, StorageError> {
        select_rows(&self.tx, query)
    }

    fn find_first<R: Record>(&self, query: &FindMany) -> Result<Option<R>, StorageError> {
        select_first(&self.tx, query)
    }
}

impl WriteStorage for StorageTx<'_> {
    fn insert<R: Record>(&self, rows: &[R]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            R::TABLE,
            R::COLUMNS.join(", ")
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row.to_values()))
                .map_err(StorageError::from_write)?;
        }
        debug!(table = R::TABLE, rows = rows.len(), "inserted");
        Ok(rows.len())
    }

    fn update<R: Record>(&self, changes: &Changeset, filter: &Filter) -> Result<usize, StorageError> {
        if changes.is_empty() {
            return Ok(0);
        }
        guard_unrestricted::<R>(filter, "update")?;

        let mut params: Vec<Value> = Vec::new();
        let assignments: Vec<String> = changes
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{column} = ?")
            })
            .collect();
        let where_clause = filter.render::<R>(&mut params);
        let sql = format!("UPDATE {} SET {}{where_clause}", R::TABLE, assignments.join(", "));

        let changed = self
            .tx
            .execute(&sql, params_from_iter(params))
            .map_err(StorageError::from_write)?;
        debug!(table = R::TABLE, rows = changed, "updated");
        Ok(changed)
    }

    fn delete<R: Record>(&self, filter: &Filter) -> Result<usize, StorageError> {
        guard_unrestricted::<R>(filter, "delete")?;

        let mut params = Vec::new();
        let where_clause = filter.render::<R>(&mut params);
        let sql = format!("DELETE FROM {}{where_clause}", R::TABLE);

        let deleted = self
            .tx
            .execute(&sql, params_from_iter(params))
            .map_err(StorageError::from_write)?;
        debug!(table = R::TABLE, rows = deleted, "deleted");
        Ok(deleted)
    }
}

fn guard_unrestricted<R: Record>(filter: &Filter, op: &str) -> Result<(), StorageError> {
    if filter.is_unrestricted() {
        return Err(StorageError::ConstraintViolation(format!(
            "refusing unfiltered {op} on {}",
            R::TABLE
        )));
    }
    Ok(())
}

fn count_rows<R: Record>(conn: &Connection, filter: &Filter) -> Result<u64, StorageError> {
    let mut params = Vec::new();
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        R::TABLE,
        filter.render::<R>(&mut params)
    );
    let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn select_rows<R: Record>(conn: &Connection, query: &FindMany) -> Result<Vec<R>, StorageError> {
    let mut params = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM {}{}{}",
        R::COLUMNS.join(", "),
        R::TABLE,
        query.filter.render::<R>(&mut params),
        render_order_by(&query.order_by),
    );
    match (query.limit, query.offset) {
        (Some(limit), offset) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::Integer(to_sql_int(limit)));
            params.push(Value::Integer(to_sql_int(offset.unwrap_or(0))));
        }
        (None, Some(offset)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::Integer(to_sql_int(offset)));
        }
        (None, None) => {}
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| R::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn select_first<R: Record>(conn: &Connection, query: &FindMany) -> Result<Option<R>, StorageError> {
    let query = FindMany {
        limit: Some(1),
        ..query.clone()
    };
    Ok(select_rows(conn, &query)?.into_iter().next())
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
