/// Adapter configuration.
///
/// Endpoint settings come from a TOML file; credentials come from the
/// environment (a `.env` file is honored via dotenv) so secrets never land
/// in version-controlled config. `ProviderConfig::load` combines both.
///
/// Environment variables:
///   - INTARA_API_KEY       static API key sent as the x-api-key header
///   - INTARA_CLIENT_ID     OAuth client id for the token exchange
///   - INTARA_CLIENT_SECRET OAuth client secret for the token exchange

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::model::AdapterError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    "https://intara-api.janes.com/graph".to_string()
}

fn default_oauth_url() -> String {
    "https://intara-api.janes.com/oauth/token".to_string()
}

fn default_component() -> Option<String> {
    Some("military-groups".to_string())
}

fn default_max_page_size() -> u32 {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Static adapter settings, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Root of the graph API; component names are appended as path segments.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Token-exchange endpoint.
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
    /// Component (resource collection) used when a query names none.
    #[serde(default = "default_component")]
    pub default_component: Option<String>,
    /// When true, a query must name a component (directly or via
    /// `default_component`) or translation fails before any network call.
    #[serde(default = "default_true")]
    pub component_required: bool,
    /// Upper bound on pageSize. The upstream rejects larger pages.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// When false, count-only searches short-circuit to zero without
    /// touching the network.
    #[serde(default = "default_true")]
    pub counts_enabled: bool,
    /// Request deadline for both the token exchange and the data fetch.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Parameters included in every translated request.
    #[serde(default)]
    pub default_params: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            oauth_url: default_oauth_url(),
            default_component: default_component(),
            component_required: true,
            max_page_size: default_max_page_size(),
            counts_enabled: true,
            request_timeout_secs: default_timeout_secs(),
            default_params: BTreeMap::new(),
        }
    }
}

/// Credentials for the upstream, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ProviderConfig {
    /// Parse a TOML configuration file. Missing keys fall back to defaults,
    /// so an empty file is a valid configuration.
    pub fn from_file(path: &str) -> Result<ProviderConfig, AdapterError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::Config(format!("cannot read {}: {}", path, e)))?;
        toml::from_str(&raw)
            .map_err(|e| AdapterError::Config(format!("cannot parse {}: {}", path, e)))
    }

    /// Trailing-slash-insensitive join of base_url and a component name.
    pub fn component_url(&self, component: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), component)
    }
}

impl Credentials {
    /// Load credentials from the environment, honoring a `.env` file if one
    /// is present in the working directory.
    pub fn from_env() -> Result<Credentials, AdapterError> {
        dotenv::dotenv().ok();

        let var = |name: &str| -> Result<String, AdapterError> {
            std::env::var(name)
                .map_err(|_| AdapterError::Config(format!("{} not set in environment", name)))
        };

        Ok(Credentials {
            api_key: var("INTARA_API_KEY")?,
            client_id: var("INTARA_CLIENT_ID")?,
            client_secret: var("INTARA_CLIENT_SECRET")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
