/// The adapter facade: one provider struct owning the HTTP client, the
/// token cache, and the configuration, exposing the two entry points the
/// hosting framework calls — `search` and `queryables`.
///
/// One search call performs at most one credential-refresh POST followed by
/// at most one data-fetch GET, strictly sequential. Nothing is retried: a
/// non-2xx from the data endpoint is a terminal failure for that call and
/// backoff policy belongs to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::auth::TokenCache;
use crate::config::{Credentials, ProviderConfig};
use crate::logging::{self, Source};
use crate::model::{AdapterError, Pagination, Record};
use crate::normalize::normalize;
use crate::paginate::{next_page, resolve_position, total_results};
use crate::queryables::{is_queryable, Queryable, QUERYABLE_REGISTRY};
use crate::translate::{translate, SearchQuery, UpstreamRequest};

// ---------------------------------------------------------------------------
// Outcome type
// ---------------------------------------------------------------------------

/// What a search call produced: a page of records plus the cursor for the
/// next one, or — in count-only mode — just the upstream's total match
/// count.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Records {
        records: Vec<Record>,
        /// `None` means end-of-results.
        next: Option<Pagination>,
    },
    Count(u64),
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct Provider {
    config: ProviderConfig,
    api_key: String,
    token_cache: TokenCache,
    http: reqwest::blocking::Client,
}

impl Provider {
    /// Build a provider from explicit configuration and credentials.
    pub fn new(config: ProviderConfig, credentials: Credentials) -> Result<Provider, AdapterError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::Config(format!("cannot build HTTP client: {}", e)))?;

        let api_key = credentials.api_key.clone();
        let token_cache = TokenCache::new(config.oauth_url.clone(), credentials);

        Ok(Provider {
            config,
            api_key,
            token_cache,
            http,
        })
    }

    /// Build a provider from a TOML config file plus environment credentials.
    pub fn from_config_file(path: &str) -> Result<Provider, AdapterError> {
        let config = ProviderConfig::from_file(path)?;
        let credentials = Credentials::from_env()?;
        Provider::new(config, credentials)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The upstream-supported parameter names and their primitive types.
    pub fn queryables(&self) -> BTreeMap<&'static str, &'static Queryable> {
        QUERYABLE_REGISTRY.iter().map(|q| (q.name, q)).collect()
    }

    /// Execute one generic search against the upstream.
    ///
    /// `provider_properties` is host-level configuration riding along with
    /// the call; entries naming advertised queryables are folded into the
    /// query's extra parameters (explicit query parameters win).
    pub fn search(
        &mut self,
        pagination: Option<Pagination>,
        provider_properties: &BTreeMap<String, Value>,
        mut query: SearchQuery,
    ) -> Result<SearchOutcome, AdapterError> {
        fold_provider_properties(&mut query, provider_properties);

        // Counts are a configuration-gated feature: when disabled, a
        // count-only probe returns zero without touching the network, which
        // steers rendering-heavy consumers toward tile access instead of
        // offset pagination.
        if query.count_only && !self.config.counts_enabled {
            logging::debug(
                Source::System,
                None,
                "count-only request short-circuited: counts disabled by configuration",
            );
            return Ok(SearchOutcome::Count(0));
        }

        let position =
            resolve_position(pagination.as_ref(), query.limit, self.config.max_page_size)?;
        let request = translate(
            &self.config,
            &query,
            position.page,
            position.page_size,
            position.token.as_deref(),
        )?;

        let raw = self.fetch(&request)?;

        if query.count_only {
            return Ok(SearchOutcome::Count(total_results(&raw)));
        }

        let records = normalize(&raw)?;
        let next = next_page(position.page, position.page_size, &raw);

        let component = query
            .component
            .as_deref()
            .or(self.config.default_component.as_deref())
            .unwrap_or("-");
        logging::log_page_summary(component, position.page, records.len(), total_results(&raw));

        Ok(SearchOutcome::Records { records, next })
    }

    /// Execute the translated request: ensure a bearer token, GET the data
    /// endpoint, decode the body.
    fn fetch(&mut self, request: &UpstreamRequest) -> Result<Value, AdapterError> {
        let credential = self.token_cache.ensure_valid(&self.http);
        let bearer = credential.bearer_token.clone();

        let mut builder = self
            .http
            .get(&request.url)
            .header("x-api-key", &self.api_key);
        // A refused refresh leaves the bearer empty; the request then goes
        // out unauthenticated and the upstream's rejection surfaces below.
        if !bearer.is_empty() {
            builder = builder.header("Authorization", bearer);
        }

        let mut params: Vec<(&str, &str)> = request
            .query_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !request.filter_expression.is_empty() {
            params.push(("filters", request.filter_expression.as_str()));
        }

        logging::debug(
            Source::Upstream,
            None,
            &format!("GET {} with {} parameters", request.url, params.len()),
        );

        let response = builder
            .query(&params)
            .send()
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AdapterError::Request(format!("cannot read response body: {}", e)))?;

        if !status.is_success() {
            let err = AdapterError::Upstream {
                status: status.as_u16(),
                body,
            };
            logging::log_upstream_failure(&request.url, "data fetch", &err);
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("response body is not JSON: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Provider properties
// ---------------------------------------------------------------------------

/// Fold host-level properties into the query's extra parameters.
///
/// Only advertised queryables with scalar values are taken, and an explicit
/// query parameter always wins over a host property of the same name.
fn fold_provider_properties(query: &mut SearchQuery, properties: &BTreeMap<String, Value>) {
    for (key, value) in properties {
        if !is_queryable(key) || query.extra_params.contains_key(key) {
            continue;
        }
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        query.extra_params.insert(key.clone(), rendered);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_provider() -> Provider {
        Provider::new(
            ProviderConfig::default(),
            Credentials {
                api_key: "key".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        )
        .expect("provider should build")
    }

    #[test]
    fn test_queryables_map_covers_the_registry() {
        let provider = test_provider();
        let queryables = provider.queryables();
        assert_eq!(queryables.len(), QUERYABLE_REGISTRY.len());
        assert!(queryables.contains_key("pageNo"));
        assert!(queryables.contains_key("nextPageToken"));
    }

    #[test]
    fn test_count_only_short_circuits_when_counts_disabled() {
        // Must return before any network call: this test has no server.
        let mut config = ProviderConfig::default();
        config.counts_enabled = false;
        let mut provider = Provider::new(
            config,
            Credentials {
                api_key: "key".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        )
        .unwrap();

        let query = SearchQuery {
            count_only: true,
            ..SearchQuery::default()
        };
        let outcome = provider.search(None, &BTreeMap::new(), query).unwrap();
        assert_eq!(outcome, SearchOutcome::Count(0));
    }

    #[test]
    fn test_oversize_page_size_fails_before_any_network_call() {
        let mut provider = test_provider();
        let pagination = Pagination::Page {
            page: 1,
            page_size: 10_000,
        };
        let result = provider.search(Some(pagination), &BTreeMap::new(), SearchQuery::default());
        assert!(matches!(result, Err(AdapterError::Validation(_))));
    }

    #[test]
    fn test_provider_properties_fold_into_extra_params() {
        let mut query = SearchQuery::default();
        let properties: BTreeMap<String, Value> = [
            ("q".to_string(), json!("radar")),
            ("facetSize".to_string(), json!(5)),
            ("notaparam".to_string(), json!("dropped")),
        ]
        .into_iter()
        .collect();

        fold_provider_properties(&mut query, &properties);
        assert_eq!(query.extra_params.get("q").map(String::as_str), Some("radar"));
        assert_eq!(query.extra_params.get("facetSize").map(String::as_str), Some("5"));
        assert!(!query.extra_params.contains_key("notaparam"));
    }

    #[test]
    fn test_explicit_extra_param_wins_over_provider_property() {
        let mut query = SearchQuery {
            extra_params: [("q".to_string(), "explicit".to_string())].into_iter().collect(),
            ..SearchQuery::default()
        };
        let properties: BTreeMap<String, Value> =
            [("q".to_string(), json!("from-host"))].into_iter().collect();

        fold_provider_properties(&mut query, &properties);
        assert_eq!(query.extra_params.get("q").map(String::as_str), Some("explicit"));
    }

    #[test]
    fn test_non_scalar_provider_property_is_skipped() {
        let mut query = SearchQuery::default();
        let properties: BTreeMap<String, Value> =
            [("q".to_string(), json!({"nested": true}))].into_iter().collect();

        fold_provider_properties(&mut query, &properties);
        assert!(query.extra_params.is_empty());
    }
}
