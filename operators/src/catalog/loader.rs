use geosampler_datatypes::primitives::{BoundingBox2D, GmtDate};
use tracing::{debug, error, info};

use super::{CatalogFeature, FeatureStore};
use crate::index::SpatialIndex;
use crate::util::Result;

/// Keeps catalog features acquired within `[start, stop]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFilter {
    pub start: GmtDate,
    pub stop: GmtDate,
}

impl TemporalFilter {
    pub fn new(start: GmtDate, stop: GmtDate) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, date: &GmtDate) -> bool {
        let gps = date.gps_seconds();
        gps >= self.start.gps_seconds() && gps <= self.stop.gps_seconds()
    }
}

/// Loads a catalog into a [`SpatialIndex`] and remembers which catalog is loaded.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    index: SpatialIndex,
    path: Option<String>,
    extent: Option<BoundingBox2D>,
    dimensions: (usize, usize),
    filtered: bool,
}

impl CatalogLoader {
    pub fn new(sort_by_index: bool) -> Self {
        Self {
            index: SpatialIndex::new(sort_by_index),
            ..Default::default()
        }
    }

    /// Loads the catalog at `path`.
    ///
    /// Nothing happens if this catalog is already loaded and indexed. Otherwise the index is rebuilt
    /// from all features that pass `spatial_filter` and, if they have a date, `temporal_filter`.
    /// On failure the index is left empty.
    pub fn open<S, D>(
        &mut self,
        store: &S,
        path: &str,
        spatial_filter: Option<geo::Polygon<f64>>,
        temporal_filter: Option<&TemporalFilter>,
        feature_date: D,
    ) -> Result<()>
    where
        S: FeatureStore + ?Sized,
        D: Fn(&CatalogFeature) -> Option<GmtDate>,
    {
        if self.is_loaded(path) {
            debug!("Catalog {path} is already loaded");
            return Ok(());
        }

        self.clear();

        let mut layer = match store.open(path) {
            Ok(layer) => layer,
            Err(e) => {
                error!("Failed to load catalog {path}: {e}");
                return Err(e);
            }
        };

        let has_spatial_filter = spatial_filter.is_some();
        layer.set_spatial_filter(spatial_filter);

        let mut dropped_by_time = 0;
        let features = layer.features().filter(|feature| {
            let Some(filter) = temporal_filter else {
                return true;
            };
            match feature_date(*feature) {
                Some(date) if !filter.contains(&date) => {
                    dropped_by_time += 1;
                    false
                }
                _ => true,
            }
        });

        let indexed = self.index.bulk_load(features);

        if has_spatial_filter {
            info!(
                "Catalog {path}: {} features, {indexed} after spatial filter",
                layer.len()
            );
        }
        if dropped_by_time > 0 {
            info!("Catalog {path}: {dropped_by_time} features outside of the time range");
        }

        self.path = Some(path.to_owned());
        self.filtered = has_spatial_filter;
        self.extent = layer.extent();
        self.dimensions = layer.dimensions();

        if let Some(extent) = &self.extent {
            debug!(
                "Catalog extent: {}, {}",
                extent.lower_left(),
                extent.upper_right()
            );
        }
        info!("Loaded catalog {path} with {indexed} features");

        Ok(())
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.path.as_deref() == Some(path) && !self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.path = None;
        self.extent = None;
        self.dimensions = (0, 0);
        self.filtered = false;
    }

    /// Whether the loaded index only holds the features of a spatial filter.
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn extent(&self) -> Option<BoundingBox2D> {
        self.extent
    }

    /// Raster grid size of the catalog as `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }
}
