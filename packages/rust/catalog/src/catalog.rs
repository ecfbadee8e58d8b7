//! Cached catalog: load once, then filter and paginate from memory.

use std::sync::Arc;

use campus_shared::{Dish, DishPage, DishQuery, Facets, Result};
use tracing::{debug, info, instrument};

use crate::query;
use crate::sources::CatalogSource;

/// A dish catalog backed by one source, loaded lazily and cached.
///
/// Methods take `&mut self`, so loads on one catalog are serialized by the
/// borrow checker. A failed load never populates the cache.
pub struct DishCatalog<S> {
    source: S,
    cache: Option<Arc<[Dish]>>,
}

impl<S: CatalogSource> DishCatalog<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether a successful load is currently cached.
    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    /// The full dish list, loading it on first use.
    #[instrument(skip_all, fields(source = %self.source.describe()))]
    pub async fn dishes(&mut self) -> Result<Arc<[Dish]>> {
        if let Some(cached) = &self.cache {
            debug!(dishes = cached.len(), "serving cached catalog");
            return Ok(Arc::clone(cached));
        }

        let loaded: Arc<[Dish]> = self.source.load().await?.into();
        info!(dishes = loaded.len(), "catalog loaded");
        self.cache = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Discard the cache and load again. On failure the old list is gone too.
    pub async fn reload(&mut self) -> Result<Arc<[Dish]>> {
        self.invalidate();
        self.dishes().await
    }

    /// Drop the cached list without loading.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Load (once), filter, then paginate.
    pub async fn get_page(&mut self, query: &DishQuery) -> Result<DishPage> {
        let all = self.dishes().await?;
        let filtered = query::filter(&all, query.tag(), query.canteen(), query.search());
        Ok(query::paginate(&filtered, query.page, query.page_size))
    }

    /// Facets over the full, unfiltered catalog.
    pub async fn facets(&mut self) -> Result<Facets> {
        let all = self.dishes().await?;
        Ok(query::facets(&all))
    }
}
