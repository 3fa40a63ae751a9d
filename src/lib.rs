//! Query-translation adapter for the Intara graph search API.
//!
//! Lets a generic geospatial search interface — bounding boxes, time ranges,
//! CQL-style filters, field projections, sort directives, pagination
//! cursors — drive an upstream REST API that understands none of those
//! abstractions natively. The adapter translates each generic query into the
//! upstream's URL, filter-string, and parameter vocabulary, manages the
//! short-lived bearer credential transparently, normalizes the heterogeneous
//! JSON responses into uniform geometry+properties records, and decides per
//! response whether the next page is addressed by page number or must switch
//! to the upstream's opaque continuation token.
//!
//! Typical use:
//!
//! ```no_run
//! use intara_adapter::config::{Credentials, ProviderConfig};
//! use intara_adapter::provider::Provider;
//! use intara_adapter::translate::SearchQuery;
//!
//! let config = ProviderConfig::from_file("./intara.toml")?;
//! let credentials = Credentials::from_env()?;
//! let mut provider = Provider::new(config, credentials)?;
//!
//! let query = SearchQuery {
//!     bbox: Some([-90.0, 40.0, -89.0, 41.0]),
//!     ..SearchQuery::default()
//! };
//! let outcome = provider.search(None, &Default::default(), query)?;
//! # Ok::<(), intara_adapter::model::AdapterError>(())
//! ```

pub mod auth;
pub mod config;
pub mod cql;
pub mod filter;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod paginate;
pub mod provider;
pub mod queryables;
pub mod translate;
pub mod verify;

pub use model::{AdapterError, Pagination, Record};
pub use provider::{Provider, SearchOutcome};
pub use translate::{SearchQuery, UpstreamRequest};
