/// Core data types for the Intara graph search adapter.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic, no I/O, and no external calls — only types and the
/// wire-format constants the encoder and decoder must agree on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Wire-format constants
// ---------------------------------------------------------------------------

/// Datetime pattern used by the upstream's `datetime` field,
/// e.g. "2024-01-01T00:00:00+00:00".
pub const FMT_DATETIME_OFFSET: &str = "%Y-%m-%dT%H:%M:%S+00:00";

/// Datetime pattern used by the upstream's `lastModifiedDate` field and by
/// the filter expressions we send, e.g. "2024-01-01T00:00:00Z".
pub const FMT_DATETIME_ZULU: &str = "%Y-%m-%dT%H:%M:%SZ";

// ---------------------------------------------------------------------------
// Query-side types
// ---------------------------------------------------------------------------

/// A closed datetime interval, both ends inclusive, always UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Input geometry for intersects-style spatial filtering.
///
/// Coordinates are `[lon, lat]` pairs in WGS84, matching GeoJSON axis order.
/// A polygon carries only its exterior ring; holes are not representable in
/// the upstream's filter syntax and are not accepted here.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    Polygon { exterior: Vec<[f64; 2]> },
}

/// Field projection: either a flat marker-prefixed list ("+name" to include,
/// "-name" to exclude) or explicit include/exclude lists.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSelection {
    List(Vec<String>),
    IncludeExclude {
        include: Vec<String>,
        exclude: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Sort directive. Direction defaults to ascending when not specified.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Pagination cursor, both as search input and as the "next page" descriptor
/// returned to the caller.
///
/// Exactly one variant is ever active. The upstream forbids offset pagination
/// past a result-count threshold; above it only `Token` continuation is
/// valid (see `paginate`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    Page { page: u32, page_size: u32 },
    Token { token: String },
}

// ---------------------------------------------------------------------------
// Result-side types
// ---------------------------------------------------------------------------

/// GeoJSON point geometry as emitted for every normalized record.
///
/// The upstream only ever yields point locations (or none at all), so the
/// geometry type is fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub geometry_type: &'static str,
    /// `[lon, lat]`, GeoJSON axis order.
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn new(lon: f64, lat: f64) -> Self {
        PointGeometry {
            geometry_type: "Point",
            coordinates: [lon, lat],
        }
    }
}

/// One normalized upstream result row.
///
/// Produced by `normalize::normalize` from the heterogeneous upstream JSON.
/// `properties` carries every upstream field that was not consumed during
/// geometry extraction or datetime promotion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: Option<String>,
    pub geometry: PointGeometry,
    pub datetime: Option<DateTime<Utc>>,
    pub properties: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when translating, executing, or decoding a search.
#[derive(Debug, PartialEq)]
pub enum AdapterError {
    /// The credential exchange failed (non-2xx or transport error).
    /// Logged and non-fatal at the call site: the fetch proceeds with a
    /// stale or empty token and the upstream's rejection surfaces as
    /// `Upstream`.
    Auth(String),
    /// Non-2xx response from the data endpoint. Fatal, never retried.
    Upstream { status: u16, body: String },
    /// Invalid input detected before any network call was made.
    Validation(String),
    /// Malformed upstream payload: unexpected datetime format, a location
    /// object missing its ordinates, or a body that is not JSON.
    Parse(String),
    /// Configuration file or environment problem.
    Config(String),
    /// Transport-level failure (connect, timeout, TLS) from the HTTP client.
    Request(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::Auth(msg) => write!(f, "Auth failure: {}", msg),
            AdapterError::Upstream { status, body } => {
                write!(f, "Upstream error {}: {}", status, body)
            }
            AdapterError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AdapterError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::Config(msg) => write!(f, "Config error: {}", msg),
            AdapterError::Request(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_geometry_serializes_as_geojson() {
        let geom = PointGeometry::new(-89.9956, 40.5614);
        let json = serde_json::to_value(&geom).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -89.9956);
        assert_eq!(json["coordinates"][1], 40.5614);
    }

    #[test]
    fn test_sort_direction_display_matches_upstream_vocabulary() {
        assert_eq!(SortDirection::Asc.to_string(), "asc");
        assert_eq!(SortDirection::Desc.to_string(), "desc");
    }

    #[test]
    fn test_upstream_error_display_carries_status_and_body() {
        let err = AdapterError::Upstream {
            status: 503,
            body: "service unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"), "display should include status, got '{}'", msg);
        assert!(msg.contains("service unavailable"));
    }
}
