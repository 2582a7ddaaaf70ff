use std::collections::HashMap;
use std::ops::Range;

use geosampler_datatypes::primitives::{BoundingBox2D, PointInfo, SampleErrors};
use geosampler_datatypes::util::ranges::thread_ranges;
use geosampler_datatypes::util::FileDictionary;
use tracing::{debug, warn};

use super::{GroupFilter, IndexedDataset, PointGroups, RasterGroup, SamplingToken};
use crate::index::{IndexContext, SpatialIndex};
use crate::util::run_in_ranges;

/// Groups found by one worker. File ids refer to the worker's own dictionary.
#[derive(Debug, Default)]
pub struct FinderOutput {
    /// Groups referenced by `points`, each created once per worker.
    pub groups: Vec<RasterGroup>,
    pub points: Vec<PointGroups>,
    pub dictionary: FileDictionary,
    /// Points reading each file.
    pub raster_points: HashMap<u64, Vec<usize>>,
    pub errors: SampleErrors,
}

/// Finds the raster groups of every point in parallel.
pub struct GroupFinder<'a, D: ?Sized> {
    index: &'a SpatialIndex,
    dataset: &'a D,
    filter: &'a GroupFilter,
    token: &'a SamplingToken,
}

impl<'a, D> GroupFinder<'a, D>
where
    D: IndexedDataset + ?Sized,
{
    pub fn new(
        index: &'a SpatialIndex,
        dataset: &'a D,
        filter: &'a GroupFilter,
        token: &'a SamplingToken,
    ) -> Self {
        Self {
            index,
            dataset,
            filter,
            token,
        }
    }

    /// Returns one output per point range, in point order.
    ///
    /// Sets `THREADS_LIMIT_ERROR` if a worker thread could not be started; its range is then
    /// processed on the calling thread.
    pub fn find(
        &self,
        points: &[PointInfo],
        min_points_per_thread: usize,
        max_threads: usize,
    ) -> (Vec<FinderOutput>, SampleErrors) {
        let ranges = thread_ranges(points.len(), min_points_per_thread, max_threads);
        debug!(
            "Finding groups for {} points with {} threads",
            points.len(),
            ranges.len()
        );

        let (outputs, spawn_failed) =
            run_in_ranges("group-finder", ranges, |range| self.find_range(points, range));

        let mut errors = if spawn_failed {
            SampleErrors::THREADS_LIMIT_ERROR
        } else {
            SampleErrors::NO_ERRORS
        };
        for output in &outputs {
            errors |= output.errors;
        }

        (outputs, errors)
    }

    /// Finds the groups of the points in `range`.
    ///
    /// Once sampling is stopped the remaining points are recorded without groups and
    /// `SAMPLING_STOPPED_ERROR` is set.
    pub fn find_range(&self, points: &[PointInfo], range: Range<usize>) -> FinderOutput {
        let mut context = IndexContext::new();
        // keyed by index position, feature ids may repeat
        let mut feature_groups: HashMap<usize, Option<usize>> = HashMap::new();
        let mut output = FinderOutput::default();
        let mut stopped = false;

        for (index, point) in range.clone().zip(&points[range.clone()]) {
            let mut point_groups = PointGroups::new(*point, index);

            if !stopped && !self.token.is_sampling() {
                warn!("Group finder stopped at point {index}");
                stopped = true;
                output.errors |= SampleErrors::SAMPLING_STOPPED_ERROR;
            }
            if stopped {
                output.points.push(point_groups);
                continue;
            }

            let envelope = BoundingBox2D::from_point(point.coordinate());
            for (position, feature) in self.index.query_positions_with(&mut context, &envelope) {
                if !self.dataset.intersects(feature, point) {
                    continue;
                }

                let group = *feature_groups.entry(position).or_insert_with(|| {
                    self.dataset
                        .find_rasters(feature, &mut output.dictionary)
                        .map(|group| {
                            output.groups.push(group);
                            output.groups.len() - 1
                        })
                });

                if let Some(group) = group {
                    point_groups.groups.insert(group);
                }
            }

            self.filter.apply(
                &mut point_groups.groups,
                &output.groups,
                &output.dictionary,
                self.filter.target_time(point),
            );

            for &group in point_groups.groups.values() {
                for info in &output.groups[group].infos {
                    output
                        .raster_points
                        .entry(info.file_id)
                        .or_default()
                        .push(index);
                }
            }

            output.points.push(point_groups);
        }

        debug!(
            "Range {range:?}: {} groups, {} index hits",
            output.groups.len(),
            context.total_hits()
        );

        output
    }
}
