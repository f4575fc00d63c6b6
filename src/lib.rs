//! Data access toolkit for Axum services backed by Sea-ORM.
//!
//! One [`ModelManager`] per entity provides lookups that turn into 404 responses, filtered
//! and ordered listings, pagination, counting, and writes checked against foreign keys, unique
//! columns, composite unique constraints and many-to-many links before they reach the
//! database. Errors are [`ApiError`]s, which render as JSON responses.

pub mod base;
pub mod errors;
pub mod filtering;
pub mod manager;
pub mod meta;
pub mod utils;

pub use errors::{ApiError, ErrorResponse};
pub use filtering::{
    FieldFilter, FieldFunc, FilterMode, NullableQuery, Operator, OrderBy, OrderingFields,
    OrderingQuery, Page, PageParams, QueryArgs,
};
pub use manager::{BulkTarget, ModelManager, RelatedIds, UniqueConstraint};
pub use serde_with;
pub use utils::comma_list;
