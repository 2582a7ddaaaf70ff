use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::{CatalogFeature, CatalogLayer, FeatureStore};
use crate::error::Error;
use crate::util::Result;

/// Serves in-memory catalogs by path and counts how often they are opened.
#[derive(Debug, Default)]
pub struct MockFeatureStore {
    catalogs: HashMap<String, Vec<CatalogFeature>>,
    open_count: AtomicUsize,
}

impl MockFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_catalog(mut self, path: &str, features: Vec<CatalogFeature>) -> Self {
        self.catalogs.insert(path.to_owned(), features);
        self
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }
}

impl FeatureStore for MockFeatureStore {
    fn open(&self, path: &str) -> Result<CatalogLayer> {
        self.open_count.fetch_add(1, Ordering::SeqCst);

        self.catalogs
            .get(path)
            .map(|features| CatalogLayer::new(features.clone()))
            .ok_or_else(|| Error::CatalogOpen {
                path: path.to_owned(),
                reason: "no such mock catalog".to_owned(),
            })
    }
}
