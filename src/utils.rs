//! Helpers for query parameters carrying several values separated by commas.
//!
//! Parse by hand with [`comma_list`], or let serde do it through the re-exported
//! `serde_with`:
//!
//! ```rust,ignore
//! use axum_sea_toolkit::serde_with::{StringWithSeparator, formats::CommaSeparator, serde_as};
//!
//! #[serde_as]
//! #[derive(Deserialize, IntoParams)]
//! pub struct ChildFilters {
//!     #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, Uuid>>")]
//!     #[serde(default)]
//!     pub parent_id: Option<Vec<Uuid>>,
//! }
//! ```

use std::str::FromStr;

use crate::errors::ApiError;

/// Splits `"a,b,c"` into typed values. `None` and `""` both give `None`.
///
/// # Errors
///
/// Returns a 400 error naming the first value that does not parse.
pub fn comma_list<T>(query: Option<&str>) -> Result<Option<Vec<T>>, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(None);
    };
    query
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<T>()
                .map_err(|e| ApiError::bad_request(format!("Invalid value '{part}': {e}")))
        })
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_comma_list_parses_values() {
        let parsed: Option<Vec<i32>> = comma_list(Some("1, 2,3")).unwrap();
        assert_eq!(parsed, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_comma_list_empty_is_none() {
        assert_eq!(comma_list::<i32>(None).unwrap(), None);
        assert_eq!(comma_list::<i32>(Some("")).unwrap(), None);
    }

    #[test]
    fn test_comma_list_invalid_value() {
        let err = comma_list::<uuid::Uuid>(Some("not-a-uuid")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.user_message().contains("not-a-uuid"));
    }
}
