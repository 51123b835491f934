pub mod action_log;
pub mod cursor;
pub mod error;
pub mod ids;
pub mod models;
pub mod pagination;
pub mod session;
pub mod validation;

pub use action_log::{
    ActionLog, ActionLogPartition, LoggedRow, Relationship, RelationshipAction,
    merge_relationships, separate_actions_log,
};
pub use cursor::{Cursor, CursorPage, SeekKey, Seekable};
pub use error::CoreError;
pub use ids::*;
pub use pagination::{
    OrderByColumn, PaginationDescriptor, PaginationParams, SortDirection, SortableColumns,
    validate_pagination_search_params,
};
pub use session::CurrentUser;
pub use validation::{Validate, ValidationIssue};
