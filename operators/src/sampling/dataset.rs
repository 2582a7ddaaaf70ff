use geo::Intersects;
use geosampler_datatypes::primitives::{GmtDate, PointInfo};
use geosampler_datatypes::util::FileDictionary;
use serde::Deserialize;

use super::{RasterGroup, RasterInfo, RasterTag};
use crate::catalog::CatalogFeature;
use crate::util::config::ConfigElement;

/// Knows the catalog of a dataset and how its features reference raster files.
pub trait IndexedDataset: Send + Sync {
    /// Path of the catalog covering `points`.
    fn index_file(&self, points: &[PointInfo]) -> String;

    /// Acquisition date of a feature, `None` if it has no usable date.
    fn feature_date(&self, feature: &CatalogFeature) -> Option<GmtDate>;

    /// The raster files of `feature`, registered in `dictionary`.
    fn find_rasters(
        &self,
        feature: &CatalogFeature,
        dictionary: &mut FileDictionary,
    ) -> Option<RasterGroup>;

    /// Whether the footprint of `feature` covers `point`.
    fn intersects(&self, feature: &CatalogFeature, point: &PointInfo) -> bool {
        feature
            .geometry
            .intersects(&geo::Point::new(point.x, point.y))
    }
}

/// Maps a feature property holding a raster url to a tagged raster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetBinding {
    pub property: String,
    pub tag: RasterTag,
    #[serde(default = "default_band")]
    pub value_band: usize,
    #[serde(default = "default_band")]
    pub flags_band: usize,
}

impl AssetBinding {
    pub fn new(property: &str, tag: RasterTag) -> Self {
        Self {
            property: property.to_owned(),
            tag,
            value_band: default_band(),
            flags_band: default_band(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetDatasetConfig {
    pub catalog: String,
    pub assets: Vec<AssetBinding>,
    #[serde(default = "default_date_field")]
    pub date_field: String,
    /// Urls containing this token are rewritten to `path_prefix` followed by the url from the token on.
    #[serde(default)]
    pub url_token: Option<String>,
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl ConfigElement for AssetDatasetConfig {
    const KEY: &'static str = "dataset";
}

/// A dataset with a single catalog whose features list their rasters as properties.
#[derive(Debug, Clone)]
pub struct AssetDataset {
    config: AssetDatasetConfig,
}

impl AssetDataset {
    pub fn new(config: AssetDatasetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssetDatasetConfig {
        &self.config
    }

    fn raster_path(&self, url: &str) -> String {
        let (Some(token), Some(prefix)) = (&self.config.url_token, &self.config.path_prefix) else {
            return url.to_owned();
        };

        match url.find(token.as_str()) {
            Some(position) => format!("{prefix}{}", &url[position..]),
            None => url.to_owned(),
        }
    }
}

impl IndexedDataset for AssetDataset {
    fn index_file(&self, _points: &[PointInfo]) -> String {
        self.config.catalog.clone()
    }

    fn feature_date(&self, feature: &CatalogFeature) -> Option<GmtDate> {
        feature
            .property_str(&self.config.date_field)
            .and_then(|date| GmtDate::parse(date).ok())
    }

    fn find_rasters(
        &self,
        feature: &CatalogFeature,
        dictionary: &mut FileDictionary,
    ) -> Option<RasterGroup> {
        let infos: Vec<RasterInfo> = self
            .config
            .assets
            .iter()
            .filter_map(|binding| {
                let url = feature.property_str(&binding.property)?;
                let file_id = dictionary.add(&self.raster_path(url));
                Some(
                    RasterInfo::new(file_id, binding.tag)
                        .with_bands(binding.value_band, binding.flags_band),
                )
            })
            .collect();

        if infos.is_empty() {
            return None;
        }

        Some(RasterGroup::new(
            feature.id,
            self.feature_date(feature),
            infos,
        ))
    }
}

fn default_band() -> usize {
    1
}

fn default_date_field() -> String {
    "datetime".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    fn dataset() -> AssetDataset {
        AssetDataset::new(AssetDatasetConfig {
            catalog: "catalog.geojson".to_owned(),
            assets: vec![
                AssetBinding::new("value_url", RasterTag::Value),
                AssetBinding {
                    flags_band: 2,
                    ..AssetBinding::new("flags_url", RasterTag::Flags)
                },
            ],
            date_field: "datetime".to_owned(),
            url_token: Some("/tiles/".to_owned()),
            path_prefix: Some("/mnt/data".to_owned()),
        })
    }

    fn feature() -> CatalogFeature {
        CatalogFeature::new(
            7,
            Geometry::Polygon(polygon![
                (x: 0., y: 0.),
                (x: 1., y: 0.),
                (x: 1., y: 1.),
                (x: 0., y: 1.),
            ]),
        )
        .with_property("value_url", "s3://bucket/tiles/a/value.tif")
        .with_property("flags_url", "local/flags.tif")
        .with_property("datetime", "2021-06-01T00:00:00Z")
    }

    #[test]
    fn finds_tagged_rasters() {
        let dataset = dataset();
        let mut dictionary = FileDictionary::new();

        let group = dataset.find_rasters(&feature(), &mut dictionary).unwrap();

        assert_eq!(group.feature_id, 7);
        assert!(group.has_flags());
        assert_eq!(group.infos.len(), 2);
        assert_eq!(
            dictionary.get(group.infos[0].file_id),
            Some("/mnt/data/tiles/a/value.tif")
        );
        assert_eq!(dictionary.get(group.infos[1].file_id), Some("local/flags.tif"));
        assert_eq!(group.infos[1].flags_band, 2);
        assert_eq!(
            group.date,
            Some(GmtDate::parse("2021-06-01T00:00:00Z").unwrap())
        );
    }

    #[test]
    fn features_without_assets_have_no_group() {
        let dataset = dataset();
        let mut dictionary = FileDictionary::new();
        let feature = CatalogFeature::new(1, Geometry::Point(geo::Point::new(0., 0.)));

        assert!(dataset.find_rasters(&feature, &mut dictionary).is_none());
        assert!(dictionary.is_empty());
    }

    #[test]
    fn unparseable_dates_are_ignored() {
        let dataset = dataset();
        let feature = feature().with_property("datetime", "yesterday");

        assert_eq!(dataset.feature_date(&feature), None);
    }

    #[test]
    fn footprint_intersection() {
        let dataset = dataset();

        assert!(dataset.intersects(&feature(), &PointInfo::new(0.5, 0.5)));
        assert!(dataset.intersects(&feature(), &PointInfo::new(1.0, 0.5)));
        assert!(!dataset.intersects(&feature(), &PointInfo::new(1.5, 0.5)));
    }
}
