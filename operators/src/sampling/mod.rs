//! Batch sampling of indexed raster catalogs.
//!
//! A call runs four stages: [`finder`] looks up the raster groups of every point, [`unique`]
//! deduplicates the referenced raster files, [`reader_pool`] reads every file once and
//! [`collector`] assembles the samples of every point. Single point calls read through the
//! [`cache`] of open rasters instead of the reader pool.

pub mod cache;
pub mod collector;
pub mod dataset;
pub mod filter;
pub mod finder;
mod ordering;
pub mod reader_pool;
mod sampler;
mod token;
pub mod unique;

pub use dataset::{AssetBinding, AssetDataset, AssetDatasetConfig, IndexedDataset};
pub use filter::GroupFilter;
pub use ordering::GroupOrdering;
pub use sampler::{IndexedRasterSampler, PerfStats, SampleBatch};
pub use token::SamplingToken;

use geosampler_datatypes::primitives::{GmtDate, PointInfo};
use serde::{Deserialize, Serialize};

/// Role of a raster file within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterTag {
    Value,
    Flags,
    Other,
}

/// One raster file of a [`RasterGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterInfo {
    /// Id in the file dictionary the group was created with.
    pub file_id: u64,
    pub tag: RasterTag,
    pub value_band: usize,
    pub flags_band: usize,
    /// Position of the file in the call's unique rasters, set during resolution.
    pub(crate) unique: Option<usize>,
}

impl RasterInfo {
    pub fn new(file_id: u64, tag: RasterTag) -> Self {
        Self {
            file_id,
            tag,
            value_band: 1,
            flags_band: 1,
            unique: None,
        }
    }

    #[must_use]
    pub fn with_bands(mut self, value_band: usize, flags_band: usize) -> Self {
        self.value_band = value_band;
        self.flags_band = flags_band;
        self
    }

    pub fn unique(&self) -> Option<usize> {
        self.unique
    }
}

/// The raster files of one catalog feature.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGroup {
    pub feature_id: u64,
    pub date: Option<GmtDate>,
    /// Acquisition time in GPS seconds, 0 if unknown.
    pub gps_time: i64,
    pub infos: Vec<RasterInfo>,
    has_flags: bool,
}

impl RasterGroup {
    pub fn new(feature_id: u64, date: Option<GmtDate>, infos: Vec<RasterInfo>) -> Self {
        let has_flags = infos.iter().any(|info| info.tag == RasterTag::Flags);
        Self {
            feature_id,
            date,
            gps_time: date.map_or(0, |date| date.gps_seconds()),
            infos,
            has_flags,
        }
    }

    pub fn has_flags(&self) -> bool {
        self.has_flags
    }

    pub fn first_with_tag(&self, tag: RasterTag) -> Option<&RasterInfo> {
        self.infos.iter().find(|info| info.tag == tag)
    }
}

/// A point and the groups that cover it, referenced by their position in the call's group arena.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroups {
    pub point: PointInfo,
    pub index: usize,
    pub groups: GroupOrdering<usize>,
}

impl PointGroups {
    pub fn new(point: PointInfo, index: usize) -> Self {
        Self {
            point,
            index,
            groups: GroupOrdering::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_precomputes_flags_and_time() {
        let date = GmtDate::parse("2020-01-01T00:00:00Z").unwrap();
        let group = RasterGroup::new(
            3,
            Some(date),
            vec![
                RasterInfo::new(0, RasterTag::Value),
                RasterInfo::new(1, RasterTag::Flags).with_bands(1, 2),
            ],
        );

        assert!(group.has_flags());
        assert_eq!(group.gps_time, 1_261_872_018);
        assert_eq!(group.first_with_tag(RasterTag::Flags).map(|i| i.flags_band), Some(2));

        let undated = RasterGroup::new(4, None, vec![RasterInfo::new(0, RasterTag::Value)]);
        assert!(!undated.has_flags());
        assert_eq!(undated.gps_time, 0);
    }
}
