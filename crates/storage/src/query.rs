//! Typed query descriptions rendered to parameterized SQL.
//!
//! Column names only ever come from `&'static str` constants in this
//! workspace; user-supplied values always travel as bound parameters.

use rusqlite::types::Value;

use kennel_core::{Cursor, OrderByColumn, OrganizationId, SeekKey};

use crate::record::{Record, text, timestamp};
use crate::schema::FOLD_FUNCTION;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    NotEq(&'static str, Value),
    In(&'static str, Vec<Value>),
    /// Case-insensitive substring match across any of the columns.
    Search(Vec<&'static str>, String),
    /// Rows strictly after `values` in the given ordering.
    After(Vec<OrderByColumn>, Vec<Value>),
    /// `column >= from AND column < to`.
    Range(&'static str, Value, Value),
}

/// A `WHERE` clause. A tenant-scoped filter adds
/// `organization_id = ?` for every record type that has a tenant column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    tenant: Option<OrganizationId>,
    conditions: Vec<Condition>,
}

impl Filter {
    /// No tenant restriction. Only for tables without a tenant column.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tenant(organization_id: &OrganizationId) -> Self {
        Self {
            tenant: Some(organization_id.clone()),
            conditions: Vec::new(),
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.eq(crate::record::ID_COLUMN, text(id))
    }

    pub fn ids<'a>(self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        let values = ids.into_iter().map(text).collect();
        self.with(Condition::In(crate::record::ID_COLUMN, values))
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.with(Condition::Eq(column, value.into()))
    }

    pub fn not_eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.with(Condition::NotEq(column, value.into()))
    }

    pub fn is_in(self, column: &'static str, values: Vec<Value>) -> Self {
        self.with(Condition::In(column, values))
    }

    /// No-op when the term is absent or blank.
    pub fn search(self, columns: &[&'static str], term: Option<&str>) -> Self {
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => self.with(Condition::Search(columns.to_vec(), term.to_string())),
            None => self,
        }
    }

    /// Seek past `cursor` in `key` order. No-op on the first page.
    pub fn after_cursor(self, key: &SeekKey, cursor: Option<&Cursor>) -> Self {
        match cursor {
            Some(cursor) => self.with(Condition::After(
                key.order_by(),
                vec![timestamp(cursor.date), text(&cursor.id)],
            )),
            None => self,
        }
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn tenant_id(&self) -> Option<&OrganizationId> {
        self.tenant.as_ref()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.tenant.is_none() && self.conditions.is_empty()
    }

    /// Renders ` WHERE ...` (or nothing) and appends the bound values.
    pub(crate) fn render<R: Record>(&self, params: &mut Vec<Value>) -> String {
        let mut clauses = Vec::new();
        if let (Some(tenant), Some(column)) = (&self.tenant, R::TENANT_COLUMN) {
            clauses.push(format!("{column} = ?"));
            params.push(text(tenant.as_str()));
        }
        for condition in &self.conditions {
            clauses.push(render_condition(condition, params));
        }
        if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        }
    }
}

fn render_condition(condition: &Condition, params: &mut Vec<Value>) -> String {
    match condition {
        Condition::Eq(column, value) => {
            if *value == Value::Null {
                return format!("{column} IS NULL");
            }
            params.push(value.clone());
            format!("{column} = ?")
        }
        Condition::NotEq(column, value) => {
            if *value == Value::Null {
                return format!("{column} IS NOT NULL");
            }
            params.push(value.clone());
            format!("{column} != ?")
        }
        Condition::In(column, values) => {
            if values.is_empty() {
                return "0".to_string();
            }
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{column} IN ({placeholders})")
        }
        Condition::Search(columns, term) => {
            let pattern = format!("%{}%", escape_like(term));
            let parts: Vec<String> = columns
                .iter()
                .map(|column| {
                    params.push(Value::Text(pattern.clone()));
                    format!("{FOLD_FUNCTION}({column}) LIKE {FOLD_FUNCTION}(?) ESCAPE '\\'")
                })
                .collect();
            format!("({})", parts.join(" OR "))
        }
        Condition::After(order_by, values) => seek_predicate(order_by, values, params),
        Condition::Range(column, from, to) => {
            params.push(from.clone());
            params.push(to.clone());
            format!("({column} >= ? AND {column} < ?)")
        }
    }
}

/// Lexicographic "strictly after" over a compound ordering:
/// `c0 op v0 OR (c0 = v0 AND c1 op v1) OR ...`.
fn seek_predicate(order_by: &[OrderByColumn], values: &[Value], params: &mut Vec<Value>) -> String {
    let mut branches = Vec::new();
    for (i, (key, value)) in order_by.iter().zip(values).enumerate() {
        let mut terms = Vec::new();
        for (prefix, prefix_value) in order_by.iter().zip(values).take(i) {
            terms.push(format!("{} = ?", prefix.column));
            params.push(prefix_value.clone());
        }
        terms.push(format!("{} {} ?", key.column, key.direction.seek_operator()));
        params.push(value.clone());
        branches.push(format!("({})", terms.join(" AND ")));
    }
    if branches.is_empty() {
        return "1".to_string();
    }
    format!("({})", branches.join(" OR "))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn render_order_by(order_by: &[OrderByColumn]) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let terms: Vec<String> = order_by
        .iter()
        .map(|o| format!("{} {}", o.column, o.direction.as_sql()))
        .collect();
    format!(" ORDER BY {}", terms.join(", "))
}

/// Arguments to `find_many`.
#[derive(Debug, Clone, Default)]
pub struct FindMany {
    pub filter: Filter,
    pub order_by: Vec<OrderByColumn>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FindMany {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order_by: Vec<OrderByColumn>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_core::SortDirection;
    use kennel_core::models::{Dog, Organization};

    #[test]
    fn tenant_filter_is_skipped_for_untenanted_tables() {
        let org = OrganizationId::new();
        let filter = Filter::tenant(&org).id("abc");

        let mut params = Vec::new();
        let sql = filter.render::<Dog>(&mut params);
        assert_eq!(sql, " WHERE organization_id = ? AND id = ?");
        assert_eq!(params.len(), 2);

        let mut params = Vec::new();
        let sql = filter.render::<Organization>(&mut params);
        assert_eq!(sql, " WHERE id = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn blank_search_adds_nothing() {
        let filter = Filter::all().search(&["given_name"], Some("   "));
        assert!(filter.is_unrestricted());
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let filter = Filter::all().search(&["given_name", "breed"], Some("50%_Off"));
        let mut params = Vec::new();
        let sql = filter.render::<Dog>(&mut params);
        assert_eq!(
            sql,
            " WHERE (kennel_fold(given_name) LIKE kennel_fold(?) ESCAPE '\\' \
             OR kennel_fold(breed) LIKE kennel_fold(?) ESCAPE '\\')"
        );
        assert_eq!(params[0], Value::Text("%50\\%\\_Off%".into()));
    }

    #[test]
    fn seek_predicate_expands_lexicographically() {
        let key = SeekKey::new("date", "id", SortDirection::Desc);
        let cursor = Cursor::new("x", Utc::now());
        let filter = Filter::all().after_cursor(&key, Some(&cursor));
        let mut params = Vec::new();
        let sql = filter.render::<Dog>(&mut params);
        assert_eq!(sql, " WHERE ((date < ?) OR (date = ? AND id < ?))");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let filter = Filter::all().ids(std::iter::empty());
        let mut params = Vec::new();
        assert_eq!(filter.render::<Dog>(&mut params), " WHERE 0");
    }

    #[test]
    fn order_by_renders_each_column() {
        let order = vec![
            OrderByColumn::new("given_name", SortDirection::Desc),
            OrderByColumn::new("id", SortDirection::Asc),
        ];
        assert_eq!(render_order_by(&order), " ORDER BY given_name DESC, id ASC");
    }
}
