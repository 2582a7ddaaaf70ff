use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use geosampler_datatypes::primitives::{BoundingBox2D, PointInfo, RasterSample, SampleErrors};
use geosampler_datatypes::util::FileDictionary;
use serde::Serialize;
use tracing::{error, info, warn};

use super::cache::RasterCache;
use super::collector::SampleCollector;
use super::finder::GroupFinder;
use super::reader_pool::BatchReaderPool;
use super::unique::resolve;
use super::{GroupFilter, IndexedDataset, SamplingToken};
use crate::catalog::{buffered_convex_hull, CatalogLoader, FeatureStore, TemporalFilter};
use crate::error::Error;
use crate::raster::{BandSelection, RasterReader};
use crate::util::config::SamplerParameters;
use crate::util::{safe_lock_mutex, Result};

/// Durations of the stages of the last call, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerfStats {
    pub spatial_filter: f64,
    pub find_groups: f64,
    pub find_unique: f64,
    pub sampling: f64,
    pub collect_samples: f64,
}

impl PerfStats {
    fn log(&self) {
        info!(
            "spatial filter: {:.3}s, find groups: {:.3}s, find unique: {:.3}s, sampling: {:.3}s, collect samples: {:.3}s",
            self.spatial_filter,
            self.find_groups,
            self.find_unique,
            self.sampling,
            self.collect_samples
        );
    }
}

/// Samples of a call, one list per input point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    pub samples: Vec<Vec<RasterSample>>,
    pub errors: SampleErrors,
}

impl SampleBatch {
    fn unsampled(point_count: usize, errors: SampleErrors) -> Self {
        Self {
            samples: vec![Vec::new(); point_count],
            errors,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug)]
struct SamplerState {
    loader: CatalogLoader,
    dictionary: FileDictionary,
    cache: RasterCache,
    perf: PerfStats,
    errors: SampleErrors,
}

/// How a call reads its rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RasterReads {
    /// Every raster is opened once on the reader pool.
    Pooled,
    /// Rasters stay open in the cache between calls.
    Cached,
}

/// Samples the rasters of an indexed dataset at batches of points.
///
/// Calls are serialized. The loaded catalog and the file dictionary are kept between calls, and
/// single point calls keep their rasters open until the next batch call.
pub struct IndexedRasterSampler<D, F, R> {
    dataset: D,
    store: F,
    reader: R,
    parameters: SamplerParameters,
    filter: GroupFilter,
    temporal_filter: Option<TemporalFilter>,
    selection: BandSelection,
    state: Mutex<SamplerState>,
    token: SamplingToken,
}

impl<D, F, R> IndexedRasterSampler<D, F, R>
where
    D: IndexedDataset,
    F: FeatureStore,
    R: RasterReader,
{
    pub fn new(dataset: D, store: F, reader: R, parameters: SamplerParameters) -> Result<Self> {
        parameters.validate()?;

        let filter = GroupFilter::from_parameters(&parameters)?;
        let temporal_filter = parameters
            .time_range()?
            .map(|(start, stop)| TemporalFilter::new(start, stop));
        let selection = BandSelection::new(parameters.bands.clone());

        Ok(Self {
            dataset,
            store,
            reader,
            filter,
            temporal_filter,
            selection,
            state: Mutex::new(SamplerState {
                loader: CatalogLoader::new(parameters.sort_by_index),
                dictionary: FileDictionary::new(),
                cache: RasterCache::new(parameters.max_cache_size),
                perf: PerfStats::default(),
                errors: SampleErrors::NO_ERRORS,
            }),
            token: SamplingToken::new(),
            parameters,
        })
    }

    /// Samples all rasters covering `points`.
    ///
    /// The result has one sample list per point, in input order. Failing to load the catalog is
    /// reported as `INDEX_FILE_ERROR` with no samples. Only inconsistent intermediate results are
    /// returned as errors.
    pub fn get_samples(&self, points: &[PointInfo]) -> Result<SampleBatch> {
        let mut state = self.lock_state()?;
        state.errors = SampleErrors::NO_ERRORS;
        state.perf = PerfStats::default();
        state.dictionary.clear();
        state.cache.clear();
        // an index built for the hull of other points may miss features
        state.loader.clear();

        let hull = buffered_convex_hull(points, self.parameters.hull_buffer);
        let batch = self.sample(&mut state, points, hull, RasterReads::Pooled);

        state.perf.log();
        batch
    }

    /// Samples all rasters covering a single point.
    ///
    /// Unlike [`get_samples`](Self::get_samples) this keeps the file dictionary, the loaded
    /// catalog and the opened rasters of earlier calls, and loads catalogs without a spatial filter.
    pub fn get_samples_at(&self, point: &PointInfo) -> Result<SampleBatch> {
        let mut state = self.lock_state()?;
        state.errors = SampleErrors::NO_ERRORS;
        state.perf = PerfStats::default();
        if state.loader.is_filtered() {
            state.loader.clear();
        }

        self.sample(
            &mut state,
            std::slice::from_ref(point),
            None,
            RasterReads::Cached,
        )
    }

    fn sample(
        &self,
        state: &mut SamplerState,
        points: &[PointInfo],
        hull: Option<geo::Polygon<f64>>,
        reads: RasterReads,
    ) -> Result<SampleBatch> {
        let SamplerState {
            loader,
            dictionary,
            cache,
            perf,
            errors,
        } = state;

        let start = Instant::now();
        let index_file = self.dataset.index_file(points);
        let opened = loader.open(
            &self.store,
            &index_file,
            hull,
            self.temporal_filter.as_ref(),
            |feature| self.dataset.feature_date(feature),
        );
        perf.spatial_filter = start.elapsed().as_secs_f64();

        if let Err(e) = opened {
            error!("Failed to open index file {index_file}: {e}");
            *errors |= SampleErrors::INDEX_FILE_ERROR;
            return Ok(SampleBatch::unsampled(points.len(), *errors));
        }

        let start = Instant::now();
        let finder = GroupFinder::new(loader.index(), &self.dataset, &self.filter, &self.token);
        let (outputs, finder_errors) = finder.find(
            points,
            self.parameters.min_points_per_thread,
            self.parameters.finder_threads(),
        );
        *errors |= finder_errors;
        perf.find_groups = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let mut batch = resolve(
            outputs,
            dictionary,
            points.len(),
            self.parameters.dense_lookup_factor,
        )
        .inspect_err(|e| error!("Failed to find unique rasters: {e}"))?;
        perf.find_unique = start.elapsed().as_secs_f64();

        let start = Instant::now();
        *errors |= match reads {
            RasterReads::Pooled => BatchReaderPool::new(
                &self.reader,
                &self.selection,
                &self.token,
                self.parameters.max_reader_threads,
            )
            .sample_all(&mut batch.uniques),
            RasterReads::Cached => cache.sample_all(
                &self.reader,
                &self.selection,
                &self.token,
                &mut batch.uniques,
            ),
        };
        perf.sampling = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let collector = SampleCollector::new(&batch, &self.token, self.parameters.flags_file);
        let (samples, collect_errors) = collector.collect(
            self.parameters.min_points_per_thread,
            self.parameters.finder_threads(),
        );
        *errors |= collect_errors;
        perf.collect_samples = start.elapsed().as_secs_f64();

        if errors.contains(SampleErrors::SAMPLING_STOPPED_ERROR) {
            warn!("Sampling was stopped, results are incomplete");
        }

        Ok(SampleBatch {
            samples,
            errors: *errors,
        })
    }

    /// Loads the catalog of the dataset without a spatial filter.
    pub fn open_catalog(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if state.loader.is_filtered() {
            state.loader.clear();
        }

        let index_file = self.dataset.index_file(&[]);
        let opened = state.loader.open(
            &self.store,
            &index_file,
            None,
            self.temporal_filter.as_ref(),
            |feature| self.dataset.feature_date(feature),
        );
        if opened.is_err() {
            state.errors |= SampleErrors::INDEX_FILE_ERROR;
        }
        opened
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SamplerState>> {
        self.state.lock().map_err(|_| Error::SamplerLockPoisoned)
    }

    pub fn perf_stats(&self) -> PerfStats {
        safe_lock_mutex(&&self.state).perf
    }

    /// Error bits of the last call.
    pub fn errors(&self) -> SampleErrors {
        safe_lock_mutex(&&self.state).errors
    }

    /// Raster grid size of the loaded catalog as `(rows, cols)`.
    pub fn dimensions(&self) -> (usize, usize) {
        safe_lock_mutex(&&self.state).loader.dimensions()
    }

    /// Extent of the loaded catalog.
    pub fn bbox(&self) -> Option<BoundingBox2D> {
        safe_lock_mutex(&&self.state).loader.extent()
    }

    /// Catalogs have no cell size.
    pub fn cell_size(&self) -> f64 {
        0.0
    }

    /// Path of the raster file with id `file_id`, as referenced by returned samples.
    pub fn file_path(&self, file_id: u64) -> Option<String> {
        safe_lock_mutex(&&self.state)
            .dictionary
            .get(file_id)
            .map(ToOwned::to_owned)
    }

    /// Path of the loaded catalog.
    pub fn index_file(&self) -> Option<String> {
        safe_lock_mutex(&&self.state)
            .loader
            .path()
            .map(ToOwned::to_owned)
    }

    /// Number of rasters kept open for single point calls.
    pub fn cached_rasters(&self) -> usize {
        safe_lock_mutex(&&self.state).cache.len()
    }

    /// Number of features in the spatial index.
    pub fn indexed_features(&self) -> usize {
        safe_lock_mutex(&&self.state).loader.index().len()
    }

    pub fn parameters(&self) -> &SamplerParameters {
        &self.parameters
    }

    pub fn stop_sampling(&self) {
        self.token.stop();
    }

    pub fn resume_sampling(&self) {
        self.token.resume();
    }

    pub fn is_sampling(&self) -> bool {
        self.token.is_sampling()
    }

    /// A handle to stop calls of this sampler from another thread.
    pub fn token(&self) -> SamplingToken {
        self.token.clone()
    }
}
