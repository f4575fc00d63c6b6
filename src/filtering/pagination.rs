use axum::http::header::{CONTENT_RANGE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::ApiError;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 100;

const fn default_page() -> u64 {
    1
}

const fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// `?page=2&size=20` query parameters. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    #[param(minimum = 1, default = 1)]
    pub page: u64,
    /// Items per page
    #[serde(default = "default_size")]
    #[param(minimum = 1, maximum = 100, default = 50)]
    pub size: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageParams {
    #[must_use]
    pub const fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// # Errors
    ///
    /// Returns a 422 error when `page` is 0 or `size` is outside `1..=100`.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if self.page < 1 {
            errors.push("page must be greater than or equal to 1".to_string());
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            errors.push(format!("size must be between 1 and {MAX_PAGE_SIZE}"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_failed(errors))
        }
    }

    /// Zero-based index of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of rows matching the filters, over all pages
    pub total: u64,
    pub page: u64,
    pub size: u64,
    /// Number of pages, `ceil(total / size)`
    pub pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            size: params.size,
            pages: total.div_ceil(params.size.max(1)),
        }
    }

    /// Converts every item, keeping the page counters.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }

    /// `Content-Range: <resource> <first>-<last>/<total>` for this page.
    #[must_use]
    pub fn content_range(&self, resource_name: &str) -> HeaderMap {
        let offset = self.page.saturating_sub(1).saturating_mul(self.size);
        calculate_content_range(offset, self.items.len() as u64, self.total, resource_name)
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Builds the Content-Range header for `count` items starting at `offset`.
///
/// The resource name is sanitized so it can never break the header.
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    count: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let last = offset.saturating_add(count.max(1)).saturating_sub(1).min(total_count);
    let safe_name = sanitize_resource_name(resource_name);

    let mut headers = HeaderMap::new();
    let value = HeaderValue::try_from(format!("{safe_name} {offset}-{last}/{total_count}"))
        .unwrap_or_else(|_| HeaderValue::from_static("items 0-0/0"));
    headers.insert(CONTENT_RANGE, value);
    headers
}
