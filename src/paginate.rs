/// Pagination strategy: page-number vs. continuation-token paging.
///
/// The upstream forbids offset-based pagination once a query matches
/// `TOKEN_PAGINATION_THRESHOLD` or more rows; past that point only its
/// opaque `nextPageToken` cursor is valid. Below the threshold callers get
/// simpler, independently-addressable page numbers. The decision is made
/// per response from the upstream's reported `search.totalResults`.

use serde_json::Value;

use crate::model::{AdapterError, Pagination};

/// Result-count threshold at which the upstream stops honoring pageNo.
pub const TOKEN_PAGINATION_THRESHOLD: u64 = 10_000;

/// Page size used when a caller asks for zero rows: a count-only probe,
/// not a full page.
pub const COUNT_PROBE_PAGE_SIZE: u32 = 10;

// ---------------------------------------------------------------------------
// Response inspection
// ---------------------------------------------------------------------------

/// `search.totalResults` from a page envelope, defaulting to 0 when absent.
pub fn total_results(raw: &Value) -> u64 {
    raw.get("search")
        .and_then(|search| search.get("totalResults"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// `search.nextPageToken` from a page envelope, if the upstream sent one.
pub fn next_page_token(raw: &Value) -> Option<String> {
    raw.get("search")
        .and_then(|search| search.get("nextPageToken"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Decide how the next page is addressed.
///
/// At or above the threshold the upstream's token is the only valid cursor;
/// a missing/null token there means end-of-results (`None`), not a
/// retryable state. Below the threshold the next page is simply
/// `current_page + 1`.
pub fn next_page(current_page: u32, page_size: u32, raw: &Value) -> Option<Pagination> {
    if total_results(raw) >= TOKEN_PAGINATION_THRESHOLD {
        next_page_token(raw).map(|token| Pagination::Token { token })
    } else {
        Some(Pagination::Page {
            page: current_page + 1,
            page_size,
        })
    }
}

// ---------------------------------------------------------------------------
// Position resolution
// ---------------------------------------------------------------------------

/// The resolved paging position for one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub page: u32,
    pub page_size: u32,
    pub token: Option<String>,
}

/// Resolve the caller's pagination input and limit into a concrete position.
///
/// Defaults: page 1 at the configured maximum page size. A positive `limit`
/// caps the page size (clamped silently to the maximum); a `limit` of 0 is
/// treated as unset. Explicit page input overrides both, but a page size
/// beyond the configured maximum is rejected outright, and a page size of 0
/// normalizes to the count-probe size.
pub fn resolve_position(
    pagination: Option<&Pagination>,
    limit: Option<u32>,
    max_page_size: u32,
) -> Result<Position, AdapterError> {
    let mut page = 1;
    let mut page_size = max_page_size;
    let mut token = None;

    if let Some(limit) = limit {
        if limit > 0 {
            page_size = limit.min(max_page_size);
        }
    }

    match pagination {
        Some(Pagination::Page {
            page: requested_page,
            page_size: requested_size,
        }) => {
            if *requested_size > max_page_size {
                return Err(AdapterError::Validation(format!(
                    "requested page size {} exceeds the maximum of {}",
                    requested_size, max_page_size
                )));
            }
            page = *requested_page;
            page_size = if *requested_size == 0 {
                COUNT_PROBE_PAGE_SIZE
            } else {
                *requested_size
            };
        }
        Some(Pagination::Token { token: cursor }) => {
            token = Some(cursor.clone());
        }
        None => {}
    }

    Ok(Position {
        page,
        page_size,
        token,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
