//! Server actions, one module per area. Shared plumbing lives here: list
//! paging, authorization checks and writing a submitted relationship log.

mod auth;
mod booking_types;
mod bookings;
mod clients;
mod dogs;
mod invite_links;
mod organizations;
mod vet_clinics;
mod vets;

pub use auth::SignedIn;
pub use clients::ClientDetail;
pub use dogs::{DogDetail, DogRelationshipLogs};
pub use vet_clinics::VetClinicDetail;
pub use vets::{VetDetail, VetRelationshipLogs};

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use kennel_core::{
    ActionLogPartition, CurrentUser, Cursor, CursorPage, LoggedRow, OrderByColumn,
    OrganizationId, PaginationDescriptor, PaginationParams, SeekKey, Seekable, SortDirection,
    SortableColumns, Validate, validate_pagination_search_params,
};
use kennel_storage::record::text;
use kennel_storage::{Filter, FindMany, Patch, ReadStorage, Record, StorageTx, Value, WriteStorage};

use crate::error::EngineError;

/// One page of an offset-paginated list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationDescriptor,
}

/// Count, normalize the parameters against the count, then fetch the page.
pub(crate) fn list_page<R: Record>(
    storage: &impl ReadStorage,
    filter: Filter,
    params: &PaginationParams,
    sortable: &SortableColumns,
    default_limit: u64,
) -> Result<Paginated<R>, EngineError> {
    let count = storage.count::<R>(&filter)?;
    let pagination = validate_pagination_search_params(params, count, sortable, default_limit);
    debug!(
        table = R::TABLE,
        count,
        page = pagination.page,
        limit = pagination.limit,
        sort_by = %pagination.sort_by,
        "resolved pagination"
    );
    let query = FindMany::new(filter)
        .order_by(pagination.order_by.clone())
        .limit(pagination.limit)
        .offset(pagination.offset());
    let items = storage.find_many::<R>(&query)?;
    Ok(Paginated { items, pagination })
}

/// One "load more" page in `key` order, starting after `cursor`.
pub(crate) fn cursor_page<R: Record + Seekable>(
    storage: &impl ReadStorage,
    filter: Filter,
    key: &SeekKey,
    cursor: Option<&str>,
    limit: u64,
) -> Result<CursorPage<R>, EngineError> {
    let cursor = match cursor {
        Some(raw) => Cursor::decode(raw).map_err(|e| EngineError::invalid("cursor", e.to_string()))?,
        None => None,
    };
    let query = FindMany::new(filter.after_cursor(key, cursor.as_ref()))
        .order_by(key.order_by())
        .limit(limit + 1);
    let rows = storage.find_many::<R>(&query)?;
    Ok(CursorPage::from_overfetch(rows, limit as usize))
}

pub(crate) fn find_owned<R: Record>(
    storage: &impl ReadStorage,
    organization_id: &OrganizationId,
    entity: &'static str,
    id: &str,
) -> Result<R, EngineError> {
    storage
        .find_first::<R>(&FindMany::new(Filter::tenant(organization_id).id(id)))?
        .ok_or_else(|| EngineError::not_found(entity, id))
}

pub(crate) fn rows_for<R: Record>(
    storage: &impl ReadStorage,
    organization_id: &OrganizationId,
    column: &'static str,
    id: &str,
) -> Result<Vec<R>, EngineError> {
    let query = FindMany::new(Filter::tenant(organization_id).eq(column, text(id)))
        .order_by(vec![OrderByColumn::new("id", SortDirection::Asc)]);
    Ok(storage.find_many::<R>(&query)?)
}

pub(crate) fn validate(input: &impl Validate) -> Result<(), EngineError> {
    input.validate().map_err(EngineError::Validation)
}

/// `now` plus `days`, or a configuration error when either overflows.
pub(crate) fn expires_after(
    now: DateTime<Utc>,
    days: i64,
    setting: &str,
) -> Result<DateTime<Utc>, EngineError> {
    Duration::try_days(days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| EngineError::Config(format!("{setting} out of range: {days}")))
}

pub(crate) fn require_manager(user: &CurrentUser, action: &str) -> Result<(), EngineError> {
    if user.can_manage_organization() {
        return Ok(());
    }
    warn!(user_id = %user.user_id, action, "permission denied");
    Err(EngineError::Forbidden(format!(
        "Only owners and admins can {action}"
    )))
}

pub(crate) fn require_owner(user: &CurrentUser, action: &str) -> Result<(), EngineError> {
    if user.is_owner() {
        return Ok(());
    }
    warn!(user_id = %user.user_id, action, "permission denied");
    Err(EngineError::Forbidden(format!("Only the owner can {action}")))
}

/// The entity a relationship log was submitted for: rows in the log must
/// carry `id` in `column`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogOwner<'a> {
    pub column: &'static str,
    pub id: &'a str,
}

fn column_value<R: Record>(row: &R, column: &str) -> Option<Value> {
    let idx = R::COLUMNS.iter().position(|c| *c == column)?;
    row.to_values().into_iter().nth(idx)
}

/// Every inserted row must point at a record `O` of the same organization
/// through `column`.
pub(crate) fn ensure_linked<R, O>(
    tx: &StorageTx<'_>,
    organization_id: &OrganizationId,
    partition: &ActionLogPartition<R>,
    column: &'static str,
    path: &str,
) -> Result<(), EngineError>
where
    R: LoggedRow + Record,
    O: Record,
{
    let linked: BTreeSet<String> = partition
        .inserts
        .iter()
        .filter_map(|row| match column_value(row, column) {
            Some(Value::Text(id)) => Some(id),
            _ => None,
        })
        .collect();
    if linked.is_empty() {
        return Ok(());
    }
    let found = tx.count::<O>(
        &Filter::tenant(organization_id).ids(linked.iter().map(String::as_str)),
    )?;
    if found != linked.len() as u64 {
        return Err(EngineError::invalid(path, "Linked record not found"));
    }
    Ok(())
}

/// Write one submitted log: inserts, then updates, then deletes. Every
/// statement is scoped to the tenant and to `owner`.
pub(crate) fn apply_log<R>(
    tx: &StorageTx<'_>,
    organization_id: &OrganizationId,
    partition: &ActionLogPartition<R>,
    owner: LogOwner<'_>,
    path: &str,
    now: DateTime<Utc>,
) -> Result<(), EngineError>
where
    R: LoggedRow + Record,
    R::Update: Patch,
    R::Id: AsRef<str>,
{
    let owner_value = text(owner.id);
    if partition
        .inserts
        .iter()
        .any(|row| column_value(row, owner.column).as_ref() != Some(&owner_value))
    {
        return Err(EngineError::invalid(path, "Row does not belong to this record"));
    }
    tx.insert(&partition.inserts)?;

    for update in &partition.updates {
        let changes = update.changeset(now);
        if changes.is_empty() {
            continue;
        }
        let filter = Filter::tenant(organization_id)
            .eq(owner.column, owner_value.clone())
            .id(update.target_id());
        if tx.update::<R>(&changes, &filter)? == 0 {
            return Err(EngineError::not_found(R::TABLE, update.target_id()));
        }
    }

    if !partition.deletes.is_empty() {
        let filter = Filter::tenant(organization_id)
            .eq(owner.column, owner_value)
            .ids(partition.deletes.iter().map(AsRef::<str>::as_ref));
        tx.delete::<R>(&filter)?;
    }

    debug!(
        table = R::TABLE,
        inserts = partition.inserts.len(),
        updates = partition.updates.len(),
        deletes = partition.deletes.len(),
        "applied relationship log"
    );
    Ok(())
}
