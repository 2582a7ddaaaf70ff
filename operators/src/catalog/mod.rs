//! Raster catalogs: vector files with one footprint feature per group of raster files.

mod geojson_store;
mod hull;
mod loader;

pub use geojson_store::GeoJsonFeatureStore;
pub use hull::buffered_convex_hull;
pub use loader::{CatalogLoader, TemporalFilter};

use geo::{BoundingRect, Intersects};
use geosampler_datatypes::primitives::BoundingBox2D;
use serde_json::{Map, Value};

use crate::util::Result;

/// One catalog entry: a footprint with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFeature {
    pub id: u64,
    pub geometry: geo::Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl CatalogFeature {
    pub fn new(id: u64, geometry: geo::Geometry<f64>) -> Self {
        Self {
            id,
            geometry,
            properties: Map::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_owned(), value.into());
        self
    }

    pub fn bbox(&self) -> Option<BoundingBox2D> {
        self.geometry.bounding_rect().map(BoundingBox2D::from)
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/// The features of an opened catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogLayer {
    features: Vec<CatalogFeature>,
    extent: Option<BoundingBox2D>,
    rows: usize,
    cols: usize,
    spatial_filter: Option<(geo::Polygon<f64>, BoundingBox2D)>,
}

impl CatalogLayer {
    pub fn new(features: Vec<CatalogFeature>) -> Self {
        let mut extent: Option<BoundingBox2D> = None;
        for bbox in features.iter().filter_map(CatalogFeature::bbox) {
            match extent.as_mut() {
                Some(extent) => extent.extend(&bbox),
                None => extent = Some(bbox),
            }
        }

        Self {
            features,
            extent,
            rows: 0,
            cols: 0,
            spatial_filter: None,
        }
    }

    /// Raster grid size of the catalog file, 0x0 for plain vector catalogs.
    #[must_use]
    pub fn with_dimensions(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Restricts [`CatalogLayer::features`] to features intersecting `filter`.
    pub fn set_spatial_filter(&mut self, filter: Option<geo::Polygon<f64>>) {
        self.spatial_filter = filter.and_then(|polygon| {
            polygon
                .bounding_rect()
                .map(|rect| (polygon, BoundingBox2D::from(rect)))
        });
    }

    pub fn features(&self) -> impl Iterator<Item = &CatalogFeature> {
        self.features
            .iter()
            .filter(move |feature| self.passes_spatial_filter(feature))
    }

    /// Number of features without spatial filter.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Extent of all features, ignoring the spatial filter.
    pub fn extent(&self) -> Option<BoundingBox2D> {
        self.extent
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn passes_spatial_filter(&self, feature: &CatalogFeature) -> bool {
        let Some((polygon, filter_bbox)) = &self.spatial_filter else {
            return true;
        };

        feature
            .bbox()
            .is_some_and(|bbox| bbox.intersects_bbox(filter_bbox))
            && feature.geometry.intersects(polygon)
    }
}

/// Opens catalog files.
pub trait FeatureStore: Send + Sync {
    fn open(&self, path: &str) -> Result<CatalogLayer>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon};

    fn square(id: u64, x: f64, y: f64, size: f64) -> CatalogFeature {
        CatalogFeature::new(
            id,
            polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]
            .into(),
        )
    }

    #[test]
    fn layer_extent_covers_all_features() {
        let layer = CatalogLayer::new(vec![square(0, 0., 0., 1.), square(1, 5., -2., 1.)]);

        assert_eq!(
            layer.extent(),
            Some(BoundingBox2D::new_unchecked((0., -2.).into(), (6., 1.).into()))
        );
        assert_eq!(layer.dimensions(), (0, 0));
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn spatial_filter_restricts_features() {
        let mut layer = CatalogLayer::new(vec![
            square(0, 0., 0., 1.),
            square(1, 5., 5., 1.),
            square(2, 0.5, 0.5, 1.),
        ]);

        layer.set_spatial_filter(Some(polygon![
            (x: 0.2, y: 0.2),
            (x: 0.8, y: 0.2),
            (x: 0.8, y: 0.8),
            (x: 0.2, y: 0.8),
            (x: 0.2, y: 0.2),
        ]));

        let ids: Vec<u64> = layer.features().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 2]);

        layer.set_spatial_filter(None);
        assert_eq!(layer.features().count(), 3);
    }

    #[test]
    fn feature_properties() {
        let feature = CatalogFeature::new(7, point!(x: 1.0, y: 2.0).into())
            .with_property("datetime", "2021-01-01T00:00:00Z")
            .with_property("cloud", 12);

        assert_eq!(feature.property_str("datetime"), Some("2021-01-01T00:00:00Z"));
        assert_eq!(feature.property_str("cloud"), None);
        assert_eq!(
            feature.bbox(),
            Some(BoundingBox2D::from_point((1.0, 2.0).into()))
        );
    }
}
