use std::fs;

use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use snafu::OptionExt;
use tracing::{debug, error};

use super::{CatalogFeature, CatalogLayer, FeatureStore};
use crate::error::{self, Error};
use crate::util::Result;

/// Reads catalogs stored as GeoJSON feature collections.
///
/// Feature ids come from the feature's `id` member or its `id` property if they are numeric,
/// otherwise the feature's position in the collection is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonFeatureStore;

impl GeoJsonFeatureStore {
    pub fn parse(&self, content: &str) -> Result<CatalogLayer> {
        let geojson: GeoJson = content.parse()?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(Error::CatalogOpen {
                    path: String::new(),
                    reason: "expected a feature collection".to_owned(),
                })
            }
        };

        let features = features
            .into_iter()
            .enumerate()
            .map(|(ordinal, feature)| to_catalog_feature(ordinal, feature))
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogLayer::new(features))
    }
}

impl FeatureStore for GeoJsonFeatureStore {
    fn open(&self, path: &str) -> Result<CatalogLayer> {
        let content = fs::read_to_string(path).map_err(|source| {
            error!("Failed to open catalog {path}: {source}");
            Error::CatalogOpen {
                path: path.to_owned(),
                reason: source.to_string(),
            }
        })?;

        let layer = self.parse(&content).map_err(|source| {
            error!("Failed to parse catalog {path}: {source}");
            Error::CatalogOpen {
                path: path.to_owned(),
                reason: source.to_string(),
            }
        })?;

        debug!("Read {} features from {path}", layer.len());

        Ok(layer)
    }
}

fn to_catalog_feature(ordinal: usize, feature: Feature) -> Result<CatalogFeature> {
    let id = feature_id(&feature).unwrap_or(ordinal as u64);

    let Feature {
        geometry,
        properties,
        ..
    } = feature;

    let geometry = geometry.context(error::CatalogFeatureWithoutGeometry { ordinal })?;
    let geometry = geo::Geometry::<f64>::try_from(geometry)?;
    let properties = properties.unwrap_or_default();

    Ok(CatalogFeature {
        id,
        geometry,
        properties,
    })
}

fn feature_id(feature: &Feature) -> Option<u64> {
    match &feature.id {
        Some(Id::Number(number)) => number.as_u64(),
        Some(Id::String(string)) => string.parse().ok(),
        None => feature.property("id").and_then(|id| {
            id.as_u64()
                .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
        }),
    }
}
