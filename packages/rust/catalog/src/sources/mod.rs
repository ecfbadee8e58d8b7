//! Catalog loaders.
//!
//! Every loader turns one source format into the canonical [`Dish`] list.
//! [`AnySource`] picks the loader from configuration so callers never branch
//! on the source kind themselves.

mod api;
mod snapshot;

use std::future::Future;

use campus_shared::{CatalogConfig, Dish, Result, SourceKind};
use reqwest::Client;

pub use api::ApiSource;
pub use snapshot::{CsvLocation, CsvParsed, CsvSource, RowWarning, parse_dishes_csv};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Capability to materialize the full dish catalog.
///
/// A load either returns the complete list or fails; no partial list escapes.
pub trait CatalogSource: Send + Sync {
    /// Fetch and normalize the whole catalog.
    fn load(&self) -> impl Future<Output = Result<Vec<Dish>>> + Send;

    /// Short human-readable description for tracing.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// AnySource
// ---------------------------------------------------------------------------

/// A loader chosen at construction time.
#[derive(Debug, Clone)]
pub enum AnySource {
    Api(ApiSource),
    Csv(CsvSource),
}

impl AnySource {
    /// Build the loader named by `config.source`, sharing `client`.
    pub fn from_config(client: Client, config: &CatalogConfig) -> Result<Self> {
        match config.source {
            SourceKind::Api => Ok(Self::Api(ApiSource::new(
                client,
                &config.api_base_url,
                config.fetch_page_size,
            )?)),
            SourceKind::Csv => Ok(Self::Csv(CsvSource::new(
                client,
                CsvLocation::parse(&config.csv_location),
            ))),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Api(_) => SourceKind::Api,
            Self::Csv(_) => SourceKind::Csv,
        }
    }
}

impl CatalogSource for AnySource {
    async fn load(&self) -> Result<Vec<Dish>> {
        match self {
            Self::Api(source) => source.load().await,
            Self::Csv(source) => source.load().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Api(source) => source.describe(),
            Self::Csv(source) => source.describe(),
        }
    }
}
