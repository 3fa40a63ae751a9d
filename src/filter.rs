/// Filter-expression construction for the upstream's ad-hoc syntax.
///
/// The upstream takes a single `filters` query parameter holding a
/// comma-separated list of predicate fragments, e.g.
///
///   _within((41.0, -90.0),(40.0, -89.0)),lastModifiedDate:>=2024-01-01T00:00:00Z
///
/// `FilterBuilder` accumulates fragments in append order; the fragment
/// constructors below each render one query field into that syntax. Callers
/// are responsible for well-formed fragments — the builder does no
/// validation and no deduplication.

use crate::model::{Geometry, TimeRange, FMT_DATETIME_ZULU};

// ---------------------------------------------------------------------------
// FilterBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FilterBuilder {
    fragments: Vec<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        FilterBuilder::default()
    }

    /// Append one predicate fragment. Purely additive.
    pub fn append(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Join all fragments with "," in append order. An empty builder yields
    /// an empty string, meaning "omit the filters parameter entirely".
    pub fn build(&self) -> String {
        self.fragments.join(",")
    }
}

// ---------------------------------------------------------------------------
// Fragment constructors
// ---------------------------------------------------------------------------

/// Spatial predicate over a `[west, south, east, north]` bounding box.
///
/// The upstream's `_within` takes (lat, lon) corner pairs, upper-left then
/// lower-right: (north, west) followed by (south, east).
pub fn bbox_fragment(bbox: &[f64; 4]) -> String {
    format!(
        "_within(({}, {}),({}, {}))",
        bbox[3], bbox[0], bbox[1], bbox[2]
    )
}

/// Spatial predicate over an input geometry.
///
/// A polygon contributes its exterior ring verbatim; any other geometry is
/// first replaced by its bounding envelope and the envelope's closed ring is
/// enumerated instead. Ring coordinates render as "(lon, lat)" pairs joined
/// by ", ".
pub fn geometry_fragment(geometry: &Geometry) -> String {
    let ring: Vec<[f64; 2]> = match geometry {
        Geometry::Polygon { exterior } => exterior.clone(),
        other => envelope_ring(&envelope(other)),
    };

    let pairs: Vec<String> = ring
        .iter()
        .map(|coord| format!("({}, {})", coord[0], coord[1]))
        .collect();

    format!("_within({})", pairs.join(", "))
}

/// Two comparison predicates bracketing a datetime range, both rendered as
/// UTC "YYYY-MM-DDTHH:MM:SSZ" against the upstream's lastModifiedDate field.
pub fn time_range_fragments(range: &TimeRange) -> (String, String) {
    (
        format!(
            "lastModifiedDate:>={}",
            range.start.format(FMT_DATETIME_ZULU)
        ),
        format!("lastModifiedDate:<={}", range.end.format(FMT_DATETIME_ZULU)),
    )
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

/// Bounding envelope `[west, south, east, north]` of a geometry.
pub fn envelope(geometry: &Geometry) -> [f64; 4] {
    match geometry {
        Geometry::Point { coordinates } => {
            [coordinates[0], coordinates[1], coordinates[0], coordinates[1]]
        }
        Geometry::Polygon { exterior } => {
            let mut west = f64::INFINITY;
            let mut south = f64::INFINITY;
            let mut east = f64::NEG_INFINITY;
            let mut north = f64::NEG_INFINITY;
            for coord in exterior {
                west = west.min(coord[0]);
                east = east.max(coord[0]);
                south = south.min(coord[1]);
                north = north.max(coord[1]);
            }
            [west, south, east, north]
        }
    }
}

/// Closed 5-vertex ring of an envelope, counter-clockwise from (west, south).
pub fn envelope_ring(envelope: &[f64; 4]) -> Vec<[f64; 2]> {
    let [west, south, east, north] = *envelope;
    vec![
        [west, south],
        [east, south],
        [east, north],
        [west, north],
        [west, south],
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
