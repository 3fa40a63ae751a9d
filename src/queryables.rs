/// Queryable-parameter registry for the upstream API.
///
/// The canonical list of query parameters the upstream accepts, with their
/// JSON-Schema-like primitive types. This is the single source of truth for
/// the extra-parameter allow-list — the translator consults it before
/// passing any caller-supplied parameter through, so unknown extension
/// parameters are dropped instead of crashing the request.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Parameter names (re-used by the translator for its own keys)
// ---------------------------------------------------------------------------

pub const PARAM_IDS: &str = "ids";
pub const PARAM_FIELDS: &str = "fields";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_PAGE_NO: &str = "pageNo";
pub const PARAM_PAGE_SIZE: &str = "pageSize";
pub const PARAM_NEXT_PAGE_TOKEN: &str = "nextPageToken";

// ---------------------------------------------------------------------------
// Queryable metadata
// ---------------------------------------------------------------------------

/// Primitive type of a queryable, following JSON Schema vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

/// One upstream-supported query parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Queryable {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// All parameters the upstream advertises, ordered roughly by how often
/// callers reach for them.
pub static QUERYABLE_REGISTRY: &[Queryable] = &[
    Queryable {
        name: PARAM_SORT,
        title: "sort",
        param_type: ParamType::String,
    },
    Queryable {
        name: PARAM_IDS,
        title: "ids",
        param_type: ParamType::String,
    },
    Queryable {
        name: "filters",
        title: "filters",
        param_type: ParamType::String,
    },
    Queryable {
        name: "q",
        title: "search_query",
        param_type: ParamType::String,
    },
    Queryable {
        name: PARAM_PAGE_NO,
        title: "pageNo",
        param_type: ParamType::Integer,
    },
    Queryable {
        name: PARAM_PAGE_SIZE,
        title: "pageSize",
        param_type: ParamType::Integer,
    },
    Queryable {
        name: PARAM_NEXT_PAGE_TOKEN,
        title: "nextPageToken",
        param_type: ParamType::String,
    },
    Queryable {
        name: "previousPageToken",
        title: "previousPageToken",
        param_type: ParamType::String,
    },
    Queryable {
        name: "facets",
        title: "facets",
        param_type: ParamType::String,
    },
    Queryable {
        name: "dateFacets",
        title: "dateFacets",
        param_type: ParamType::String,
    },
    Queryable {
        name: "facetSize",
        title: "facetSize",
        param_type: ParamType::Integer,
    },
    Queryable {
        name: PARAM_FIELDS,
        title: "fields",
        param_type: ParamType::String,
    },
];

/// Checks whether a parameter name is in the upstream's allow-list.
pub fn is_queryable(name: &str) -> bool {
    QUERYABLE_REGISTRY.iter().any(|q| q.name == name)
}

/// Looks up a queryable by name. Returns `None` if not advertised.
pub fn find_queryable(name: &str) -> Option<&'static Queryable> {
    QUERYABLE_REGISTRY.iter().find(|q| q.name == name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_parameter_names() {
        let mut seen = std::collections::HashSet::new();
        for queryable in QUERYABLE_REGISTRY {
            assert!(
                seen.insert(queryable.name),
                "duplicate parameter '{}' found in QUERYABLE_REGISTRY",
                queryable.name
            );
        }
    }

    #[test]
    fn test_registry_contains_all_advertised_parameters() {
        let expected = [
            "sort",
            "ids",
            "filters",
            "q",
            "pageNo",
            "pageSize",
            "nextPageToken",
            "previousPageToken",
            "facets",
            "dateFacets",
            "facetSize",
            "fields",
        ];
        for name in &expected {
            assert!(
                is_queryable(name),
                "QUERYABLE_REGISTRY missing expected parameter '{}'",
                name
            );
        }
        assert_eq!(QUERYABLE_REGISTRY.len(), expected.len());
    }

    #[test]
    fn test_paging_parameters_are_integers() {
        // If these drift to string, the upstream silently ignores them and
        // every search returns page 1 forever.
        for name in [PARAM_PAGE_NO, PARAM_PAGE_SIZE, "facetSize"] {
            let queryable = find_queryable(name).expect("paging parameter should be advertised");
            assert_eq!(
                queryable.param_type,
                ParamType::Integer,
                "'{}' should be an integer parameter",
                name
            );
        }
    }

    #[test]
    fn test_find_queryable_returns_none_for_unknown_parameter() {
        assert!(find_queryable("nosuchparam").is_none());
        assert!(!is_queryable("nosuchparam"));
    }

    #[test]
    fn test_param_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ParamType::String).unwrap(), "string");
        assert_eq!(serde_json::to_value(ParamType::Integer).unwrap(), "integer");
    }
}
