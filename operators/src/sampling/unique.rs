use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use geosampler_datatypes::primitives::{PointInfo, RasterSample, SampleErrors};
use geosampler_datatypes::util::FileDictionary;
use snafu::ensure;
use tracing::{debug, error};

use super::finder::FinderOutput;
use super::{PointGroups, RasterGroup, RasterInfo};
use crate::error;
use crate::util::Result;

/// The samples of one point in one raster file.
#[derive(Debug)]
pub struct PointSample {
    pub point: PointInfo,
    pub index: usize,
    /// One entry per sampled band, `None` if the band could not be read.
    pub bands: Vec<Option<RasterSample>>,
    returned: Vec<AtomicBool>,
    pub errors: SampleErrors,
}

impl PointSample {
    pub fn new(point: PointInfo, index: usize) -> Self {
        Self {
            point,
            index,
            bands: Vec::new(),
            returned: Vec::new(),
            errors: SampleErrors::NO_ERRORS,
        }
    }

    pub fn set_bands(&mut self, bands: Vec<Option<RasterSample>>) {
        self.returned = bands.iter().map(|_| AtomicBool::new(false)).collect();
        self.bands = bands;
    }

    /// Hands out the sample of `band`.
    ///
    /// The flag is `true` for the first consumer, which owns the sample. Every later consumer gets
    /// a copy and `false`. The returned sample is a clone either way, so the flag only tells
    /// callers whether the raster was shared.
    pub fn take(&self, band: usize) -> Option<(RasterSample, bool)> {
        let sample = self.bands.get(band)?.as_ref()?;
        let first = self
            .returned
            .get(band)
            .is_some_and(|returned| !returned.swap(true, Ordering::AcqRel));
        Some((sample.clone(), first))
    }

    pub fn was_returned(&self, band: usize) -> bool {
        self.returned
            .get(band)
            .is_some_and(|returned| returned.load(Ordering::Acquire))
    }
}

/// Maps point indices to positions in a [`UniqueRaster`]'s samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleLookup {
    Dense(Vec<Option<usize>>),
    Sparse(HashMap<usize, usize>),
}

impl SampleLookup {
    /// Dense if `max_index + 1 <= factor * indices.len()`. `indices` must be sorted.
    pub fn build(indices: &[usize], factor: usize) -> Self {
        match indices.last() {
            Some(&max_index) if max_index + 1 <= factor.saturating_mul(indices.len()) => {
                Self::dense(indices)
            }
            Some(_) => Self::sparse(indices),
            None => Self::Dense(Vec::new()),
        }
    }

    pub fn dense(indices: &[usize]) -> Self {
        let size = indices.iter().max().map_or(0, |max| max + 1);
        let mut lookup = vec![None; size];
        for (position, &index) in indices.iter().enumerate() {
            lookup[index] = Some(position);
        }
        Self::Dense(lookup)
    }

    pub fn sparse(indices: &[usize]) -> Self {
        Self::Sparse(
            indices
                .iter()
                .enumerate()
                .map(|(position, &index)| (index, position))
                .collect(),
        )
    }

    pub fn get(&self, point_index: usize) -> Option<usize> {
        match self {
            Self::Dense(lookup) => lookup.get(point_index).copied().flatten(),
            Self::Sparse(lookup) => lookup.get(&point_index).copied(),
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }
}

/// One raster file read by the batch, with the samples of all points reading it.
#[derive(Debug)]
pub struct UniqueRaster {
    pub file_id: u64,
    pub path: String,
    /// The first reference to the file. Decides which bands are read.
    pub info: RasterInfo,
    /// Acquisition time of the first group referencing the file.
    pub gps_time: i64,
    pub samples: Vec<PointSample>,
    lookup: SampleLookup,
}

impl UniqueRaster {
    pub fn sample_for(&self, point_index: usize) -> Option<&PointSample> {
        self.lookup
            .get(point_index)
            .and_then(|position| self.samples.get(position))
    }

    pub fn lookup(&self) -> &SampleLookup {
        &self.lookup
    }
}

/// The groups of a batch after merging all finder outputs.
///
/// File ids are global and every raster info points to its unique raster.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub groups: Vec<RasterGroup>,
    pub points: Vec<PointGroups>,
    pub uniques: Vec<UniqueRaster>,
}

/// Merges the finder outputs into `dictionary` and deduplicates the raster files.
///
/// Fails if the merged points do not match the `point_count` input points one to one.
pub fn resolve(
    outputs: Vec<FinderOutput>,
    dictionary: &mut FileDictionary,
    point_count: usize,
    dense_lookup_factor: usize,
) -> Result<ResolvedBatch> {
    let (mut groups, points, mut raster_points) = merge(outputs, dictionary)?;

    let aligned = points.len() == point_count
        && points.iter().enumerate().all(|(i, point)| point.index == i);
    if !aligned {
        error!(
            "Merged {} point groups for {point_count} points",
            points.len()
        );
    }
    ensure!(
        aligned,
        error::PointGroupCountMismatch {
            groups: points.len(),
            points: point_count,
        }
    );

    let mut unique_of_file: HashMap<u64, usize> = HashMap::new();
    let mut uniques: Vec<UniqueRaster> = Vec::new();

    for point in &points {
        for &group in point.groups.values() {
            let group = &mut groups[group];
            let gps_time = group.gps_time;

            for info in &mut group.infos {
                let unique = if let Some(&unique) = unique_of_file.get(&info.file_id) {
                    unique
                } else {
                    uniques.push(UniqueRaster {
                        file_id: info.file_id,
                        path: dictionary.path(info.file_id)?.to_owned(),
                        info: info.clone(),
                        gps_time,
                        samples: Vec::new(),
                        lookup: SampleLookup::Dense(Vec::new()),
                    });
                    unique_of_file.insert(info.file_id, uniques.len() - 1);
                    uniques.len() - 1
                };
                info.unique = Some(unique);
            }
        }
    }

    let mut dense = 0;
    for unique in &mut uniques {
        let mut indices = raster_points.remove(&unique.file_id).unwrap_or_default();
        indices.sort_unstable();
        indices.dedup();

        unique.samples = indices
            .iter()
            .map(|&index| PointSample::new(points[index].point, index))
            .collect();
        unique.lookup = SampleLookup::build(&indices, dense_lookup_factor);
        if unique.lookup.is_dense() {
            dense += 1;
        }
    }

    debug!(
        "Resolved {} unique rasters ({dense} with dense lookup) from {} groups",
        uniques.len(),
        groups.len()
    );

    Ok(ResolvedBatch {
        groups,
        points,
        uniques,
    })
}

type Merged = (Vec<RasterGroup>, Vec<PointGroups>, HashMap<u64, Vec<usize>>);

/// Concatenates the finder outputs, moving their file ids into `dictionary`.
pub fn merge(outputs: Vec<FinderOutput>, dictionary: &mut FileDictionary) -> Result<Merged> {
    let mut groups = Vec::new();
    let mut points = Vec::new();
    let mut raster_points: HashMap<u64, Vec<usize>> = HashMap::new();

    for output in outputs {
        let offset = groups.len();
        let mut remap = IdRemap::new(&output.dictionary);

        for mut group in output.groups {
            for info in &mut group.infos {
                info.file_id = remap.global_id(info.file_id, dictionary)?;
            }
            groups.push(group);
        }

        for mut point in output.points {
            for group in point.groups.values_mut() {
                *group += offset;
            }
            points.push(point);
        }

        for (file_id, indices) in output.raster_points {
            raster_points
                .entry(remap.global_id(file_id, dictionary)?)
                .or_default()
                .extend(indices);
        }
    }

    Ok((groups, points, raster_points))
}

/// Translates the file ids of one worker dictionary, each id once.
struct IdRemap<'d> {
    local: &'d FileDictionary,
    ids: HashMap<u64, u64>,
}

impl<'d> IdRemap<'d> {
    fn new(local: &'d FileDictionary) -> Self {
        Self {
            local,
            ids: HashMap::new(),
        }
    }

    fn global_id(&mut self, local_id: u64, global: &mut FileDictionary) -> Result<u64> {
        if let Some(&id) = self.ids.get(&local_id) {
            return Ok(id);
        }
        let id = global.add(self.local.path(local_id)?);
        self.ids.insert(local_id, id);
        Ok(id)
    }
}
