//! Offset pagination and sorting for list views.
//!
//! List actions receive raw query-string values. [`validate_pagination_search_params`]
//! turns them into a [`PaginationDescriptor`] that is always safe to query
//! with: out-of-range pages are clamped, unknown sort keys fall back to the
//! id, and the id column always ends the ORDER BY so page boundaries are
//! deterministic.

use serde::{Deserialize, Serialize};

/// Sort key every registry understands: the table's id column.
pub const DEFAULT_SORT_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive; anything other than `asc`/`desc` is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Comparison operator for "strictly after" in this direction.
    pub fn seek_operator(&self) -> &'static str {
        match self {
            Self::Asc => ">",
            Self::Desc => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderByColumn {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderByColumn {
    pub fn new(column: &'static str, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// Registry of sort keys a list accepts, each mapping to one or more
/// storage columns (e.g. `fullName` -> `given_name, family_name`).
#[derive(Debug, Clone)]
pub struct SortableColumns {
    id_column: &'static str,
    keys: Vec<(&'static str, Vec<&'static str>)>,
}

impl SortableColumns {
    pub fn new(id_column: &'static str) -> Self {
        Self {
            id_column,
            keys: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, columns: &[&'static str]) -> Self {
        self.keys.push((key, columns.to_vec()));
        self
    }

    pub fn id_column(&self) -> &'static str {
        self.id_column
    }

    pub fn contains(&self, key: &str) -> bool {
        self.columns(key).is_some()
    }

    fn columns(&self, key: &str) -> Option<Vec<&'static str>> {
        if let Some((_, columns)) = self.keys.iter().find(|(k, _)| *k == key) {
            return Some(columns.clone());
        }
        (key == DEFAULT_SORT_KEY).then(|| vec![self.id_column])
    }

    /// Concrete ORDER BY for a known key, with the id column appended
    /// ascending unless the key already sorts by it.
    pub fn order_by(&self, key: &str, direction: SortDirection) -> Option<Vec<OrderByColumn>> {
        let columns = self.columns(key)?;
        let mut order_by: Vec<OrderByColumn> = columns
            .iter()
            .map(|column| OrderByColumn::new(*column, direction))
            .collect();
        if !columns.contains(&self.id_column) {
            order_by.push(OrderByColumn::new(self.id_column, SortDirection::Asc));
        }
        Some(order_by)
    }
}

/// Raw list parameters as they arrive from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub search_term: Option<String>,
}

impl PaginationParams {
    /// Parse `page=2&limit=20&sortBy=name&sortDirection=desc&searchTerm=rex`.
    /// Keys and values are percent-decoded. Unknown keys are ignored; later
    /// duplicates win.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = Some(percent_decode(value));
            match percent_decode(key).as_str() {
                "page" => params.page = value,
                "limit" => params.limit = value,
                "sortBy" => params.sort_by = value,
                "sortDirection" => params.sort_direction = value,
                "searchTerm" => params.search_term = value,
                _ => {}
            }
        }
        params
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn sort(mut self, sort_by: &str, direction: &str) -> Self {
        self.sort_by = Some(sort_by.to_string());
        self.sort_direction = Some(direction.to_string());
        self
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search_term = Some(term.to_string());
        self
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDescriptor {
    pub count: u64,
    pub page: u64,
    pub limit: u64,
    pub max_page: u64,
    pub sort_by: String,
    pub sort_direction: SortDirection,
    pub order_by: Vec<OrderByColumn>,
}

impl PaginationDescriptor {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

fn parse_positive(value: Option<&str>) -> Option<u64> {
    let parsed: i64 = value?.trim().parse().ok()?;
    (parsed > 0).then_some(parsed as u64)
}

/// Normalize raw list parameters against a row count. Never fails: every
/// invalid value falls back to a safe default.
pub fn validate_pagination_search_params(
    params: &PaginationParams,
    count: u64,
    sortable_columns: &SortableColumns,
    default_limit: u64,
) -> PaginationDescriptor {
    let limit = parse_positive(params.limit.as_deref()).unwrap_or(default_limit.max(1));
    let max_page = count.div_ceil(limit).max(1);
    let page = parse_positive(params.page.as_deref())
        .unwrap_or(1)
        .min(max_page);

    let requested_direction = params
        .sort_direction
        .as_deref()
        .and_then(SortDirection::parse)
        .unwrap_or_default();

    let requested = params.sort_by.as_deref().map(str::trim).unwrap_or(DEFAULT_SORT_KEY);
    let (sort_by, sort_direction, order_by) =
        match sortable_columns.order_by(requested, requested_direction) {
            Some(order_by) => (requested.to_string(), requested_direction, order_by),
            None => {
                let order_by = sortable_columns
                    .order_by(DEFAULT_SORT_KEY, SortDirection::Asc)
                    .unwrap_or_default();
                (DEFAULT_SORT_KEY.to_string(), SortDirection::Asc, order_by)
            }
        };

    PaginationDescriptor {
        count,
        page,
        limit,
        max_page,
        sort_by,
        sort_direction,
        order_by,
    }
}
