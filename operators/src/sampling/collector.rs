use std::ops::Range;

use geosampler_datatypes::primitives::{RasterSample, SampleErrors};
use geosampler_datatypes::util::ranges::thread_ranges;
use tracing::{debug, trace, warn};

use super::unique::{PointSample, ResolvedBatch};
use super::{PointGroups, RasterGroup, RasterTag, SamplingToken};
use crate::util::run_in_ranges;

/// Assembles the samples of every point from the sampled unique rasters.
pub struct SampleCollector<'a> {
    batch: &'a ResolvedBatch,
    token: &'a SamplingToken,
    flags_file: bool,
}

impl<'a> SampleCollector<'a> {
    pub fn new(batch: &'a ResolvedBatch, token: &'a SamplingToken, flags_file: bool) -> Self {
        Self {
            batch,
            token,
            flags_file,
        }
    }

    /// One sample list per point, in point order.
    pub fn collect(
        &self,
        min_points_per_thread: usize,
        max_threads: usize,
    ) -> (Vec<Vec<RasterSample>>, SampleErrors) {
        let ranges = thread_ranges(
            self.batch.points.len(),
            min_points_per_thread,
            max_threads,
        );

        let (parts, spawn_failed) =
            run_in_ranges("sample-collector", ranges, |range| self.collect_range(range));

        let mut errors = if spawn_failed {
            SampleErrors::THREADS_LIMIT_ERROR
        } else {
            SampleErrors::NO_ERRORS
        };

        let mut samples = Vec::with_capacity(self.batch.points.len());
        for (part, part_errors) in parts {
            samples.extend(part);
            errors |= part_errors;
        }

        (samples, errors)
    }

    /// Collects the points in `range`.
    ///
    /// Once sampling is stopped, the remaining points get no samples and `SAMPLING_STOPPED_ERROR`
    /// is set.
    pub fn collect_range(&self, range: Range<usize>) -> (Vec<Vec<RasterSample>>, SampleErrors) {
        let mut samples = Vec::with_capacity(range.len());
        let mut errors = SampleErrors::NO_ERRORS;
        let mut stopped = false;

        for point in &self.batch.points[range.clone()] {
            if !stopped && !self.token.is_sampling() {
                warn!("Sample collection stopped at point {}", point.index);
                stopped = true;
                errors |= SampleErrors::SAMPLING_STOPPED_ERROR;
            }
            if stopped {
                samples.push(Vec::new());
                continue;
            }

            let (point_samples, point_errors) = self.point_samples(point);
            samples.push(point_samples);
            errors |= point_errors;
        }

        debug!("Collected samples for points {range:?}");
        (samples, errors)
    }

    /// The samples of all groups of `point`, in group order.
    pub fn point_samples(&self, point: &PointGroups) -> (Vec<RasterSample>, SampleErrors) {
        let mut samples = Vec::new();
        let mut errors = SampleErrors::NO_ERRORS;

        for &group in point.groups.values() {
            let Some(group) = self.batch.groups.get(group) else {
                continue;
            };

            let flags = if self.flags_file && group.has_flags() {
                self.group_flags(group, point.index)
            } else {
                0
            };

            errors |= self.group_samples(group, point.index, flags, &mut samples);
        }

        (samples, errors)
    }

    /// Value of the group's flags raster at the point, 0 if there is none.
    fn group_flags(&self, group: &RasterGroup, point_index: usize) -> u32 {
        self.sample_of(group, RasterTag::Flags, point_index)
            .and_then(|sample| sample.bands.first())
            .and_then(Option::as_ref)
            .map_or(0, |flags| flags.value as u32)
    }

    /// Appends the samples of the group's value raster.
    ///
    /// Only the first value raster of a group is sampled.
    fn group_samples(
        &self,
        group: &RasterGroup,
        point_index: usize,
        flags: u32,
        samples: &mut Vec<RasterSample>,
    ) -> SampleErrors {
        let Some(point_sample) = self.sample_of(group, RasterTag::Value, point_index) else {
            return SampleErrors::NO_ERRORS;
        };

        for band in 0..point_sample.bands.len() {
            let Some((mut sample, owned)) = point_sample.take(band) else {
                continue;
            };
            if !owned {
                trace!(
                    "Copying sample of file {} band {band} for point {point_index}",
                    sample.file_id
                );
            }
            sample.time = group.gps_time;
            sample.flags = flags;
            sample.errors = point_sample.errors;
            samples.push(sample);
        }

        point_sample.errors
    }

    fn sample_of(
        &self,
        group: &RasterGroup,
        tag: RasterTag,
        point_index: usize,
    ) -> Option<&'a PointSample> {
        let unique = group.first_with_tag(tag)?.unique()?;
        self.batch.uniques.get(unique)?.sample_for(point_index)
    }
}
