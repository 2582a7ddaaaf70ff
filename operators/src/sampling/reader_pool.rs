use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use geosampler_datatypes::primitives::{RasterSample, SampleErrors};
use tracing::{debug, warn};

use super::unique::UniqueRaster;
use super::SamplingToken;
use crate::raster::{bands_to_sample, BandSelection, OpenRaster, RasterReader};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reads every unique raster of a batch once, on a pool of worker threads.
pub struct BatchReaderPool<'a, R: ?Sized> {
    reader: &'a R,
    selection: &'a BandSelection,
    token: &'a SamplingToken,
    max_threads: usize,
}

impl<'a, R> BatchReaderPool<'a, R>
where
    R: RasterReader + ?Sized,
{
    pub fn new(
        reader: &'a R,
        selection: &'a BandSelection,
        token: &'a SamplingToken,
        max_threads: usize,
    ) -> Self {
        Self {
            reader,
            selection,
            token,
            max_threads,
        }
    }

    /// Samples all points of all `uniques`.
    ///
    /// Rasters are handed out in order until sampling is stopped. Rasters that were handed out are
    /// always finished, the points of the others get `SAMPLING_STOPPED_ERROR`. Sets
    /// `RESOURCE_LIMIT_ERROR` if not all workers could be started.
    pub fn sample_all(&self, uniques: &mut [UniqueRaster]) -> SampleErrors {
        let num_workers = self.max_threads.min(uniques.len());
        if num_workers == 0 {
            return SampleErrors::NO_ERRORS;
        }

        let mut errors = SampleErrors::NO_ERRORS;
        let total = uniques.len();

        let dispatched = thread::scope(|scope| {
            let (job_tx, job_rx) = channel::bounded::<(usize, &mut UniqueRaster)>(num_workers);
            let (done_tx, done_rx) = channel::unbounded::<usize>();

            let mut workers = 0;
            for id in 0..num_workers {
                let jobs = job_rx.clone();
                let done = done_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("raster-reader-{id}"))
                    .spawn_scoped(scope, move || self.work(&jobs, &done));
                match spawned {
                    Ok(_) => workers += 1,
                    Err(e) => {
                        warn!("Failed to spawn raster reader {id}: {e}");
                        errors |= SampleErrors::RESOURCE_LIMIT_ERROR;
                        break;
                    }
                }
            }
            drop(job_rx);
            drop(done_tx);

            debug!("Sampling {total} rasters with {workers} readers");

            let mut dispatched = 0;
            let mut in_flight = 0;
            for (index, unique) in uniques.iter_mut().enumerate() {
                if !self.token.is_sampling() {
                    warn!("Raster sampling stopped after {dispatched} of {total} rasters");
                    break;
                }

                if workers == 0 {
                    self.sample_unique(unique);
                    dispatched += 1;
                    continue;
                }

                while in_flight >= workers && self.token.is_sampling() {
                    match done_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(_) => in_flight -= 1,
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                if !self.token.is_sampling() {
                    warn!("Raster sampling stopped after {dispatched} of {total} rasters");
                    break;
                }

                if job_tx.send((index, unique)).is_err() {
                    warn!("Raster readers are gone, {} rasters left", total - dispatched);
                    break;
                }
                in_flight += 1;
                dispatched += 1;
            }

            // workers drain the queue and exit once the sender is gone
            drop(job_tx);
            dispatched
        });

        debug!("Sampled {dispatched} of {total} rasters");

        if dispatched < total {
            let unread = if self.token.is_sampling() {
                SampleErrors::RESOURCE_LIMIT_ERROR
            } else {
                SampleErrors::SAMPLING_STOPPED_ERROR
            };
            mark_unread(&mut uniques[dispatched..], unread);
            errors |= unread;
        }

        errors
    }

    fn work(
        &self,
        jobs: &channel::Receiver<(usize, &mut UniqueRaster)>,
        done: &channel::Sender<usize>,
    ) {
        loop {
            match jobs.recv_timeout(POLL_INTERVAL) {
                Ok((index, unique)) => {
                    self.sample_unique(unique);
                    if done.send(index).is_err() {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Opens the raster and reads the selected bands at every point.
    pub fn sample_unique(&self, unique: &mut UniqueRaster) {
        match self.reader.open(&unique.path, &unique.info) {
            Ok(mut raster) => read_points(raster.as_mut(), unique, self.selection),
            Err(e) => {
                warn!("Failed to open raster {}: {e}", unique.path);
                mark_unread(std::slice::from_mut(unique), SampleErrors::READ_ERROR);
            }
        }
    }
}

/// Reads the selected bands of an opened raster at every point of `unique`.
pub fn read_points(raster: &mut dyn OpenRaster, unique: &mut UniqueRaster, selection: &BandSelection) {
    let bands = bands_to_sample(&*raster, &unique.info, selection);
    let names: Vec<String> = bands.iter().map(|&band| raster.band_name(band)).collect();

    for sample in &mut unique.samples {
        let mut values = Vec::with_capacity(bands.len());
        for (&band, name) in bands.iter().zip(&names) {
            let outcome = raster.sample(&sample.point, band);
            sample.errors |= outcome.errors();
            values.push(outcome.value().map(|value| RasterSample {
                time: unique.gps_time,
                ..RasterSample::new(unique.file_id, value, name.clone())
            }));
        }
        sample.set_bands(values);
    }
}

/// Sets `errors` on every point of rasters that were not read.
pub fn mark_unread(uniques: &mut [UniqueRaster], errors: SampleErrors) {
    for sample in uniques.iter_mut().flat_map(|unique| unique.samples.iter_mut()) {
        sample.errors |= errors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRaster, MockRasterReader};
    use crate::sampling::unique::resolve;
    use crate::sampling::finder::FinderOutput;
    use crate::sampling::{PointGroups, RasterGroup, RasterInfo, RasterTag};
    use geosampler_datatypes::primitives::PointInfo;
    use geosampler_datatypes::util::FileDictionary;

    fn uniques(paths: &[&str], point_count: usize) -> Vec<UniqueRaster> {
        let mut output = FinderOutput::default();
        for (i, path) in paths.iter().enumerate() {
            let id = output.dictionary.add(path);
            output.groups.push(RasterGroup::new(
                i as u64,
                None,
                vec![RasterInfo::new(id, RasterTag::Value)],
            ));
        }
        for index in 0..point_count {
            let mut point = PointGroups::new(PointInfo::new(index as f64, 0.), index);
            for group in 0..paths.len() {
                point.groups.insert(group);
                output
                    .raster_points
                    .entry(group as u64)
                    .or_default()
                    .push(index);
            }
            output.points.push(point);
        }

        resolve(vec![output], &mut FileDictionary::new(), point_count, 8)
            .unwrap()
            .uniques
    }

    fn reader(paths: &[&str]) -> MockRasterReader {
        let mut reader = MockRasterReader::new();
        for path in paths {
            reader.add(path, MockRaster::new(10., 10.).with_value(|p| p.x * 2.));
        }
        reader
    }

    #[test]
    fn reads_every_raster_once() {
        let paths = ["a.tif", "b.tif", "c.tif", "d.tif", "e.tif"];
        let reader = reader(&paths);
        let mut uniques = uniques(&paths, 4);
        let selection = BandSelection::default();
        let token = SamplingToken::new();

        let errors = BatchReaderPool::new(&reader, &selection, &token, 2).sample_all(&mut uniques);

        assert!(errors.is_empty());
        assert_eq!(reader.open_count(), 5);
        for path in paths {
            assert_eq!(reader.opens_of(path), 1);
        }
        for unique in &uniques {
            for sample in &unique.samples {
                let value = sample.bands[0].as_ref().unwrap();
                assert_eq!(value.value, sample.point.x * 2.);
                assert_eq!(value.band, "band1");
            }
        }
    }

    #[test]
    fn open_failures_flag_points() {
        let reader = reader(&["a.tif"]);
        let mut uniques = uniques(&["a.tif", "missing.tif"], 2);
        let selection = BandSelection::default();
        let token = SamplingToken::new();

        let errors = BatchReaderPool::new(&reader, &selection, &token, 4).sample_all(&mut uniques);

        assert!(errors.is_empty());
        assert!(uniques[0].samples.iter().all(|s| s.errors.is_empty()));
        assert!(uniques[1]
            .samples
            .iter()
            .all(|s| s.errors.contains(SampleErrors::READ_ERROR) && s.bands.is_empty()));
    }

    #[test]
    fn out_of_bounds_points_have_no_sample() {
        let reader = reader(&["a.tif"]);
        let mut uniques = uniques(&["a.tif"], 12);
        let selection = BandSelection::default();
        let token = SamplingToken::new();

        BatchReaderPool::new(&reader, &selection, &token, 1).sample_all(&mut uniques);

        let outside = uniques[0].sample_for(11).unwrap();
        assert!(outside.bands[0].is_none());
        assert!(outside.errors.contains(SampleErrors::OUT_OF_BOUNDS_ERROR));
        assert!(uniques[0].sample_for(3).unwrap().bands[0].is_some());
    }

    #[test]
    fn stopped_pool_reads_nothing() {
        let paths = ["a.tif", "b.tif"];
        let reader = reader(&paths);
        let mut uniques = uniques(&paths, 1);
        let selection = BandSelection::default();
        let token = SamplingToken::new();
        token.stop();

        let errors = BatchReaderPool::new(&reader, &selection, &token, 2).sample_all(&mut uniques);

        assert_eq!(reader.open_count(), 0);
        assert!(errors.contains(SampleErrors::SAMPLING_STOPPED_ERROR));
        assert!(uniques.iter().all(|u| u.samples[0].bands.is_empty()));
        assert!(uniques.iter().all(|u| {
            u.samples[0]
                .errors
                .contains(SampleErrors::SAMPLING_STOPPED_ERROR)
        }));
    }
}
