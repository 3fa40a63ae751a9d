/// Generic-query → upstream-request translation.
///
/// The central routine of the adapter: maps a `SearchQuery` (bbox, time
/// range, geometry, ids, CQL filter, field list, sort spec, extra
/// parameters) plus a resolved pagination position into the upstream's URL
/// and parameter vocabulary. Filter-expression fragments accumulate in a
/// `FilterBuilder` in a fixed order (bbox, geometry, time range, CQL) so
/// retranslating the same query is byte-identical.
///
/// Two shortcuts return early:
///   - a single-id query rewrites to the id-addressed resource path and
///     drops every parameter and accumulated filter;
///   - a continuation token carries the whole original query inside it, so
///     only {nextPageToken, pageSize} survive.

use std::collections::BTreeMap;

use crate::config::ProviderConfig;
use crate::cql::{self, CqlFilter};
use crate::filter::{bbox_fragment, geometry_fragment, time_range_fragments, FilterBuilder};
use crate::logging::{self, Source};
use crate::model::{AdapterError, FieldSelection, Geometry, SortSpec, TimeRange};
use crate::queryables::{
    is_queryable, PARAM_FIELDS, PARAM_IDS, PARAM_NEXT_PAGE_TOKEN, PARAM_PAGE_NO, PARAM_PAGE_SIZE,
    PARAM_SORT,
};

// ---------------------------------------------------------------------------
// Query and request types
// ---------------------------------------------------------------------------

/// One generic search request. Transient — built per call, no identity
/// beyond it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// `[west, south, east, north]` in WGS84.
    pub bbox: Option<[f64; 4]>,
    pub datetime: Option<TimeRange>,
    pub intersects: Option<Geometry>,
    /// Record ids. Exactly one triggers the id-addressed shortcut.
    pub ids: Vec<String>,
    pub filter: Option<CqlFilter>,
    pub fields: Option<FieldSelection>,
    pub sortby: Option<SortSpec>,
    /// Upstream resource collection, e.g. "military-groups".
    pub component: Option<String>,
    /// Caller-supplied extension parameters, gated by the queryables
    /// allow-list.
    pub extra_params: BTreeMap<String, String>,
    /// Caller's cap on total results; 0 means unset.
    pub limit: Option<u32>,
    /// Return only the upstream's total match count.
    pub count_only: bool,
}

/// The fully translated upstream request. Immutable once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub query_params: BTreeMap<String, String>,
    /// Comma-joined predicate fragments; empty means "omit the filters
    /// parameter entirely".
    pub filter_expression: String,
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// Translate a generic query into an upstream request.
///
/// `page`/`page_size` are the already-resolved pagination position (see
/// `paginate::resolve_page_size`); `token` is the continuation token if the
/// caller is resuming token-based paging.
pub fn translate(
    config: &ProviderConfig,
    query: &SearchQuery,
    page: u32,
    page_size: u32,
    token: Option<&str>,
) -> Result<UpstreamRequest, AdapterError> {
    let mut params: BTreeMap<String, String> = config.default_params.clone();
    let mut filters = FilterBuilder::new();

    // Component selects the resource collection and must resolve before any
    // URL is formed.
    let component = query
        .component
        .as_deref()
        .or(config.default_component.as_deref());
    let url = match component {
        Some(component) => config.component_url(component),
        None if !config.component_required => config.base_url.trim_end_matches('/').to_string(),
        None => {
            return Err(AdapterError::Validation(
                "query names no component and no default is configured".to_string(),
            ))
        }
    };

    if let Some(bbox) = &query.bbox {
        filters.append(bbox_fragment(bbox));
    }

    if let Some(geometry) = &query.intersects {
        filters.append(geometry_fragment(geometry));
    }

    if let Some(range) = &query.datetime {
        let (lower, upper) = time_range_fragments(range);
        filters.append(lower);
        filters.append(upper);
    }

    // Id shortcut: a single id addresses one resource directly. Filtering,
    // projection, and paging do not apply to id-addressed lookups — the
    // request carries no parameters at all.
    if query.ids.len() == 1 {
        let id_slug = id_slug(&query.ids[0]);
        logging::debug(
            Source::Translate,
            None,
            &format!("single id received, using id endpoint for '{}'", id_slug),
        );
        return Ok(UpstreamRequest {
            url: format!("{}/{}", url, id_slug),
            query_params: BTreeMap::new(),
            filter_expression: String::new(),
        });
    } else if query.ids.len() > 1 {
        params.insert(PARAM_IDS.to_string(), query.ids.join(","));
    }

    // Token shortcut: the upstream's continuation token encodes the original
    // query, so no other filter or parameter state may ride along.
    if let Some(token) = token {
        let mut token_params = BTreeMap::new();
        token_params.insert(PARAM_NEXT_PAGE_TOKEN.to_string(), token.to_string());
        token_params.insert(PARAM_PAGE_SIZE.to_string(), page_size.to_string());
        return Ok(UpstreamRequest {
            url,
            query_params: token_params,
            filter_expression: String::new(),
        });
    }

    // Structured filter: the CQL collaborator returns a parameter mapping;
    // its `filters` key is predicate text for the builder, not a literal
    // parameter.
    if let Some(filter) = &query.filter {
        let mut cql_params = cql::to_query_params(filter)?;
        if let Some(fragment) = cql_params.remove(cql::FILTERS_KEY) {
            filters.append(fragment);
        }
        params.extend(cql_params);
    }

    // Fields: only inclusions survive — the upstream has no exclusion
    // parameter, so "-"-marked and unmarked entries drop silently.
    if let Some(fields) = &query.fields {
        let include: Vec<String> = match fields {
            FieldSelection::IncludeExclude { include, .. } => include.clone(),
            FieldSelection::List(entries) => entries
                .iter()
                .filter(|entry| entry.starts_with('+'))
                .map(|entry| entry[1..].to_string())
                .collect(),
        };
        if !include.is_empty() {
            params.insert(PARAM_FIELDS.to_string(), include.join(","));
        }
    }

    // Sort: only emitted when a field is named.
    if let Some(SortSpec { field, direction }) = &query.sortby {
        if !field.is_empty() {
            params.insert(PARAM_SORT.to_string(), format!("{}:{}", field, direction));
        }
    }

    // Extra parameters: pass through only what the upstream advertises.
    // Unknown extension parameters never crash a provider — they vanish.
    for (key, value) in &query.extra_params {
        if key == cql::FILTERS_KEY {
            filters.append(value.clone());
        } else if is_queryable(key) {
            params.insert(key.clone(), value.clone());
        } else {
            logging::debug(
                Source::Translate,
                None,
                &format!("dropping non-queryable extra parameter '{}'", key),
            );
        }
    }

    params.insert(PARAM_PAGE_NO.to_string(), page.to_string());
    params.insert(PARAM_PAGE_SIZE.to_string(), page_size.to_string());

    Ok(UpstreamRequest {
        url,
        query_params: params,
        filter_expression: filters.build(),
    })
}

/// Final "/"-delimited segment of an id. Callers sometimes hand over full
/// resource URIs; the upstream's id endpoint wants only the slug.
fn id_slug(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cql::CqlOp;
    use crate::model::{SortDirection, TimeRange};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn test_config() -> ProviderConfig {
        ProviderConfig::default()
    }

    fn translate_default(query: &SearchQuery) -> UpstreamRequest {
        translate(&test_config(), query, 1, 200, None).expect("translation should succeed")
    }

    // --- Component and URL --------------------------------------------------

    #[test]
    fn test_default_component_forms_collection_url() {
        let request = translate_default(&SearchQuery::default());
        assert_eq!(
            request.url,
            "https://intara-api.janes.com/graph/military-groups"
        );
    }

    #[test]
    fn test_query_component_overrides_default() {
        let query = SearchQuery {
            component: Some("military-installations".to_string()),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(
            request.url,
            "https://intara-api.janes.com/graph/military-installations"
        );
    }

    #[test]
    fn test_missing_component_is_a_validation_error_when_required() {
        let mut config = test_config();
        config.default_component = None;
        config.component_required = true;
        let result = translate(&config, &SearchQuery::default(), 1, 200, None);
        assert!(
            matches!(result, Err(AdapterError::Validation(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[test]
    fn test_missing_component_falls_back_to_base_url_when_optional() {
        let mut config = test_config();
        config.default_component = None;
        config.component_required = false;
        let request = translate(&config, &SearchQuery::default(), 1, 200, None).unwrap();
        assert_eq!(request.url, "https://intara-api.janes.com/graph");
    }

    // --- Pagination parameters ----------------------------------------------

    #[test]
    fn test_page_and_page_size_always_present() {
        let request = translate(&test_config(), &SearchQuery::default(), 3, 50, None).unwrap();
        assert_eq!(request.query_params.get("pageNo").map(String::as_str), Some("3"));
        assert_eq!(request.query_params.get("pageSize").map(String::as_str), Some("50"));
    }

    // --- Id shortcuts -------------------------------------------------------

    #[test]
    fn test_single_id_bypasses_all_other_state() {
        // Even with a bbox, fields, and extra params, an id-addressed lookup
        // must return the bare id URL with nothing else attached.
        let query = SearchQuery {
            bbox: Some([-90.0, 40.0, -89.0, 41.0]),
            ids: vec!["installations/abc-123".to_string()],
            fields: Some(FieldSelection::List(vec!["+name".to_string()])),
            extra_params: [("q".to_string(), "radar".to_string())].into_iter().collect(),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(
            request.url,
            "https://intara-api.janes.com/graph/military-groups/abc-123"
        );
        assert!(request.query_params.is_empty(), "id lookups carry no parameters");
        assert!(request.filter_expression.is_empty(), "id lookups discard filters");
    }

    #[test]
    fn test_single_id_without_slashes_is_used_verbatim() {
        let query = SearchQuery {
            ids: vec!["abc-123".to_string()],
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert!(request.url.ends_with("/military-groups/abc-123"));
    }

    #[test]
    fn test_multiple_ids_join_in_input_order() {
        let query = SearchQuery {
            ids: vec!["b".to_string(), "a".to_string(), "c".to_string()],
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.query_params.get("ids").map(String::as_str), Some("b,a,c"));
    }

    // --- Token shortcut -----------------------------------------------------

    #[test]
    fn test_token_shortcut_carries_only_token_and_page_size() {
        let query = SearchQuery {
            bbox: Some([-90.0, 40.0, -89.0, 41.0]),
            extra_params: [("q".to_string(), "radar".to_string())].into_iter().collect(),
            ..SearchQuery::default()
        };
        let request = translate(&test_config(), &query, 7, 100, Some("tok-xyz")).unwrap();
        assert_eq!(request.query_params.len(), 2);
        assert_eq!(
            request.query_params.get("nextPageToken").map(String::as_str),
            Some("tok-xyz")
        );
        assert_eq!(request.query_params.get("pageSize").map(String::as_str), Some("100"));
        assert!(request.filter_expression.is_empty());
    }

    // --- Filter fragments ---------------------------------------------------

    #[test]
    fn test_bbox_becomes_within_fragment() {
        let query = SearchQuery {
            bbox: Some([-90.0, 40.0, -89.0, 41.0]),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.filter_expression, "_within((41, -90),(40, -89))");
        assert!(
            !request.query_params.contains_key("filters"),
            "the expression rides on the request, not in query_params"
        );
    }

    #[test]
    fn test_fragment_order_is_bbox_geometry_time_cql() {
        let query = SearchQuery {
            bbox: Some([-90.0, 40.0, -89.0, 41.0]),
            intersects: Some(Geometry::Polygon {
                exterior: vec![[-90.0, 40.0], [-89.0, 40.0], [-89.0, 41.0], [-90.0, 40.0]],
            }),
            datetime: Some(TimeRange {
                start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            }),
            filter: Some(CqlFilter::Comparison {
                field: "status".to_string(),
                op: CqlOp::Eq,
                value: json!("active"),
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        let expression = &request.filter_expression;

        let bbox_pos = expression.find("_within((41, -90)").expect("bbox fragment");
        let ring_pos = expression.find("_within((-90, 40)").expect("ring fragment");
        let lower_pos = expression.find("lastModifiedDate:>=").expect("lower bound");
        let upper_pos = expression.find("lastModifiedDate:<=").expect("upper bound");
        let cql_pos = expression.find("status:active").expect("cql fragment");

        assert!(bbox_pos < ring_pos, "bbox before geometry");
        assert!(ring_pos < lower_pos, "geometry before time range");
        assert!(lower_pos < upper_pos, "range bounds in order");
        assert!(upper_pos < cql_pos, "time range before cql");
    }

    #[test]
    fn test_cql_eq_filter_yields_exactly_one_fragment() {
        let query = SearchQuery {
            filter: Some(CqlFilter::Comparison {
                field: "status".to_string(),
                op: CqlOp::Eq,
                value: json!("active"),
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.filter_expression, "status:active");
    }

    #[test]
    fn test_cql_raw_params_pass_through_literally() {
        let mut mapping = BTreeMap::new();
        mapping.insert("q".to_string(), "airbase".to_string());
        let query = SearchQuery {
            filter: Some(CqlFilter::Raw(mapping)),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.query_params.get("q").map(String::as_str), Some("airbase"));
    }

    // --- Fields -------------------------------------------------------------

    #[test]
    fn test_marker_list_keeps_only_inclusions() {
        let query = SearchQuery {
            fields: Some(FieldSelection::List(vec![
                "+name".to_string(),
                "-secret".to_string(),
            ])),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.query_params.get("fields").map(String::as_str), Some("name"));
    }

    #[test]
    fn test_include_exclude_mapping_uses_include_list() {
        let query = SearchQuery {
            fields: Some(FieldSelection::IncludeExclude {
                include: vec!["name".to_string(), "status".to_string()],
                exclude: vec!["secret".to_string()],
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(
            request.query_params.get("fields").map(String::as_str),
            Some("name,status")
        );
    }

    #[test]
    fn test_exclusions_only_yields_no_fields_parameter() {
        let query = SearchQuery {
            fields: Some(FieldSelection::List(vec!["-secret".to_string()])),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert!(!request.query_params.contains_key("fields"));
    }

    // --- Sort ---------------------------------------------------------------

    #[test]
    fn test_sort_formats_field_colon_direction() {
        let query = SearchQuery {
            sortby: Some(SortSpec {
                field: "lastModifiedDate".to_string(),
                direction: SortDirection::Desc,
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(
            request.query_params.get("sort").map(String::as_str),
            Some("lastModifiedDate:desc")
        );
    }

    #[test]
    fn test_sort_direction_defaults_to_asc() {
        let query = SearchQuery {
            sortby: Some(SortSpec {
                field: "name".to_string(),
                direction: SortDirection::default(),
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.query_params.get("sort").map(String::as_str), Some("name:asc"));
    }

    #[test]
    fn test_empty_sort_field_emits_nothing() {
        let query = SearchQuery {
            sortby: Some(SortSpec {
                field: String::new(),
                direction: SortDirection::Desc,
            }),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert!(!request.query_params.contains_key("sort"));
    }

    // --- Extra parameters ---------------------------------------------------

    #[test]
    fn test_queryable_extra_param_passes_through() {
        let query = SearchQuery {
            extra_params: [("q".to_string(), "radar".to_string())].into_iter().collect(),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.query_params.get("q").map(String::as_str), Some("radar"));
    }

    #[test]
    fn test_unknown_extra_param_is_silently_dropped() {
        let query = SearchQuery {
            extra_params: [("bogus".to_string(), "x".to_string())].into_iter().collect(),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert!(!request.query_params.contains_key("bogus"));
    }

    #[test]
    fn test_filters_extra_param_joins_the_expression() {
        let query = SearchQuery {
            extra_params: [("filters".to_string(), "country:USA".to_string())]
                .into_iter()
                .collect(),
            ..SearchQuery::default()
        };
        let request = translate_default(&query);
        assert_eq!(request.filter_expression, "country:USA");
        assert!(
            !request.query_params.contains_key("filters"),
            "filters is predicate text, never a literal parameter here"
        );
    }

    // --- Defaults and determinism -------------------------------------------

    #[test]
    fn test_configured_default_params_seed_the_request() {
        let mut config = test_config();
        config
            .default_params
            .insert("tenant".to_string(), "acme".to_string());
        let request = translate(&config, &SearchQuery::default(), 1, 200, None).unwrap();
        assert_eq!(request.query_params.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_translation_is_idempotent() {
        // No hidden incrementing state may leak between calls.
        let query = SearchQuery {
            bbox: Some([-90.0, 40.0, -89.0, 41.0]),
            ids: vec!["a".to_string(), "b".to_string()],
            sortby: Some(SortSpec {
                field: "name".to_string(),
                direction: SortDirection::Asc,
            }),
            ..SearchQuery::default()
        };
        let first = translate_default(&query);
        let second = translate_default(&query);
        assert_eq!(first, second);
    }
}
