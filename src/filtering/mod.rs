//! # Filtering, Ordering & Pagination
//!
//! Building blocks the [`ModelManager`](crate::ModelManager) turns into SQL.
//!
//! ## Main Components
//!
//! - **[`QueryArgs`]**: everything a read needs (simple filters, field filters, reverse
//!   relation filters, conditions, ordering, limit/offset)
//! - **[`FieldFilter`]**: value + operator + optional SQL function on any related column
//! - **[`NullableQuery`]**: query value that can request `IS NULL`
//! - **[`OrderingFields`]** / **[`OrderBy`]**: `?order_by=-title` parsing
//! - **[`PageParams`]** / **[`Page`]**: page-number pagination
//!
//! ## Query Parameter Examples
//!
//! ```rust,ignore
//! // Case-insensitive contains on a column of the managed entity
//! GET /children?title=ali
//!
//! // Column of a related entity (joins `parent`)
//! GET /children?parent_title=bob
//!
//! // Explicit NULL
//! GET /parents?description=null
//!
//! // Ordering, descending with a leading '-'
//! GET /children?order_by=-title
//!
//! // Pagination
//! GET /children?page=2&size=20
//! ```

pub mod conditions;
pub mod joined;
pub mod pagination;
pub mod query;
pub mod sort;

pub use conditions::{FieldFilter, FieldFunc, NULL_QUERY_VALUES, NullableQuery, Operator};
pub use pagination::{Page, PageParams, calculate_content_range};
pub use query::{FilterMode, QueryArgs};
pub use sort::{OrderBy, OrderingFields, OrderingQuery};
