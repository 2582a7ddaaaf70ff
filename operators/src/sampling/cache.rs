use std::collections::HashMap;
use std::collections::hash_map::Entry;

use geosampler_datatypes::primitives::SampleErrors;
use tracing::{debug, warn};

use super::SamplingToken;
use super::reader_pool::{mark_unread, read_points};
use super::unique::UniqueRaster;
use crate::raster::{BandSelection, OpenRaster, RasterReader};

struct CachedRaster {
    raster: Box<dyn OpenRaster>,
    used: bool,
}

/// Rasters kept open between single point calls, keyed by path.
///
/// Once the cache holds more than `max_size` rasters, every raster the last call did not read is
/// closed.
pub struct RasterCache {
    rasters: HashMap<String, CachedRaster>,
    max_size: usize,
}

impl RasterCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            rasters: HashMap::new(),
            max_size,
        }
    }

    /// Samples all points of all `uniques` on the calling thread, opening only rasters that are
    /// not cached yet.
    ///
    /// Stops before the next raster once sampling is stopped. The points of the rasters left get
    /// `SAMPLING_STOPPED_ERROR`.
    pub fn sample_all<R>(
        &mut self,
        reader: &R,
        selection: &BandSelection,
        token: &SamplingToken,
        uniques: &mut [UniqueRaster],
    ) -> SampleErrors
    where
        R: RasterReader + ?Sized,
    {
        for cached in self.rasters.values_mut() {
            cached.used = false;
        }

        let mut errors = SampleErrors::NO_ERRORS;
        let mut opened = 0;

        for index in 0..uniques.len() {
            if !token.is_sampling() {
                warn!(
                    "Raster sampling stopped after {index} of {} rasters",
                    uniques.len()
                );
                mark_unread(&mut uniques[index..], SampleErrors::SAMPLING_STOPPED_ERROR);
                errors |= SampleErrors::SAMPLING_STOPPED_ERROR;
                break;
            }

            let unique = &mut uniques[index];
            let cached = match self.rasters.entry(unique.path.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match reader.open(&unique.path, &unique.info) {
                    Ok(raster) => {
                        opened += 1;
                        entry.insert(CachedRaster {
                            raster,
                            used: false,
                        })
                    }
                    Err(e) => {
                        warn!("Failed to open raster {}: {e}", unique.path);
                        mark_unread(std::slice::from_mut(unique), SampleErrors::READ_ERROR);
                        continue;
                    }
                },
            };

            cached.used = true;
            read_points(cached.raster.as_mut(), unique, selection);
        }

        debug!(
            "Sampled {} rasters, {opened} newly opened, {} cached",
            uniques.len(),
            self.rasters.len()
        );

        self.evict();
        errors
    }

    fn evict(&mut self) {
        if self.rasters.len() <= self.max_size {
            return;
        }

        let before = self.rasters.len();
        self.rasters.retain(|_, cached| cached.used);
        debug!("Closed {} cached rasters", before - self.rasters.len());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.rasters.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }

    pub fn clear(&mut self) {
        self.rasters.clear();
    }
}

impl std::fmt::Debug for RasterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCache")
            .field("rasters", &self.rasters.keys().collect::<Vec<_>>())
            .field("max_size", &self.max_size)
            .finish()
    }
}
