use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geosampler_datatypes::primitives::PointInfo;

use crate::error::Error;
use crate::raster::{BandSelection, OpenRaster, RasterReader, SampleOutcome};
use crate::sampling::RasterInfo;
use crate::util::{safe_lock_mutex, Result};

type BandValue = Arc<dyn Fn(&PointInfo) -> f64 + Send + Sync>;
type OpenHook = Arc<dyn Fn(&str) + Send + Sync>;

/// An in-memory raster covering `[0, width) x [0, height)`.
#[derive(Clone)]
pub struct MockRaster {
    pub width: f64,
    pub height: f64,
    bands: Vec<(String, BandValue)>,
}

impl MockRaster {
    /// A raster with a single band `band1` of zeros.
    pub fn new(width: f64, height: f64) -> Self {
        let zeros: BandValue = Arc::new(|_: &PointInfo| 0.);
        Self {
            width,
            height,
            bands: vec![("band1".to_owned(), zeros)],
        }
    }

    /// Sets the values of the first band.
    #[must_use]
    pub fn with_value<F>(mut self, value: F) -> Self
    where
        F: Fn(&PointInfo) -> f64 + Send + Sync + 'static,
    {
        if let Some(band) = self.bands.first_mut() {
            band.1 = Arc::new(value);
        }
        self
    }

    #[must_use]
    pub fn with_constant(self, value: f64) -> Self {
        self.with_value(move |_| value)
    }

    #[must_use]
    pub fn with_band<F>(mut self, name: &str, value: F) -> Self
    where
        F: Fn(&PointInfo) -> f64 + Send + Sync + 'static,
    {
        let value: BandValue = Arc::new(value);
        self.bands.push((name.to_owned(), value));
        self
    }

    fn contains(&self, point: &PointInfo) -> bool {
        point.x >= 0. && point.y >= 0. && point.x < self.width && point.y < self.height
    }
}

impl fmt::Debug for MockRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field(
                "bands",
                &self.bands.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Serves [`MockRaster`]s by path and counts how often they are opened and read.
#[derive(Default)]
pub struct MockRasterReader {
    rasters: HashMap<String, MockRaster>,
    opens: Mutex<HashMap<String, usize>>,
    open_count: AtomicUsize,
    read_count: Arc<AtomicUsize>,
    open_delay: Option<Duration>,
    on_open: Option<OpenHook>,
}

impl MockRasterReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, raster: MockRaster) {
        self.rasters.insert(path.to_owned(), raster);
    }

    #[must_use]
    pub fn with_raster(mut self, path: &str, raster: MockRaster) -> Self {
        self.add(path, raster);
        self
    }

    /// Sleeps for `delay` on every open.
    #[must_use]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Calls `hook` with the path on every open.
    #[must_use]
    pub fn with_open_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_open = Some(Arc::new(hook));
        self
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn opens_of(&self, path: &str) -> usize {
        safe_lock_mutex(&&self.opens)
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    /// Number of band reads over all rasters.
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockRasterReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRasterReader")
            .field("rasters", &self.rasters)
            .field("open_count", &self.open_count)
            .field("read_count", &self.read_count)
            .finish_non_exhaustive()
    }
}

impl RasterReader for MockRasterReader {
    fn open(&self, path: &str, _info: &RasterInfo) -> Result<Box<dyn OpenRaster>> {
        if let Some(hook) = &self.on_open {
            hook(path);
        }
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }

        self.open_count.fetch_add(1, Ordering::SeqCst);
        *safe_lock_mutex(&&self.opens)
            .entry(path.to_owned())
            .or_default() += 1;

        let raster = self.rasters.get(path).ok_or_else(|| Error::RasterOpen {
            path: path.to_owned(),
            reason: "no such mock raster".to_owned(),
        })?;

        Ok(Box::new(MockOpenRaster {
            raster: raster.clone(),
            reads: self.read_count.clone(),
        }))
    }
}

struct MockOpenRaster {
    raster: MockRaster,
    reads: Arc<AtomicUsize>,
}

impl OpenRaster for MockOpenRaster {
    fn band_numbers(&self, selection: &BandSelection) -> Vec<usize> {
        selection
            .names()
            .iter()
            .filter_map(|name| {
                self.raster
                    .bands
                    .iter()
                    .position(|(band, _)| band == name)
                    .map(|index| index + 1)
            })
            .collect()
    }

    fn band_name(&self, band: usize) -> String {
        band.checked_sub(1)
            .and_then(|index| self.raster.bands.get(index))
            .map_or_else(|| format!("band{band}"), |(name, _)| name.clone())
    }

    fn sample(&mut self, point: &PointInfo, band: usize) -> SampleOutcome {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if !self.raster.contains(point) {
            return SampleOutcome::OutOfBounds;
        }

        match band
            .checked_sub(1)
            .and_then(|index| self.raster.bands.get(index))
        {
            Some((_, value)) => SampleOutcome::Value(value(point)),
            None => SampleOutcome::ReadFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::RasterTag;

    #[test]
    fn counts_opens_and_reads() {
        let reader = MockRasterReader::new().with_raster(
            "a.tif",
            MockRaster::new(4., 4.)
                .with_constant(3.)
                .with_band("quality", |p| p.y),
        );
        let info = RasterInfo::new(0, RasterTag::Value);

        let mut raster = reader.open("a.tif", &info).unwrap();
        assert!(reader.open("b.tif", &info).is_err());

        assert_eq!(
            raster.band_numbers(&BandSelection::new(vec![
                "quality".to_owned(),
                "unknown".to_owned()
            ])),
            vec![2]
        );
        assert_eq!(raster.band_name(2), "quality");
        assert_eq!(raster.band_name(5), "band5");

        let point = PointInfo::new(1., 2.);
        assert_eq!(raster.sample(&point, 1), SampleOutcome::Value(3.));
        assert_eq!(raster.sample(&point, 2), SampleOutcome::Value(2.));
        assert_eq!(raster.sample(&point, 3), SampleOutcome::ReadFailed);
        assert_eq!(
            raster.sample(&PointInfo::new(4., 0.), 1),
            SampleOutcome::OutOfBounds
        );

        assert_eq!(reader.open_count(), 2);
        assert_eq!(reader.opens_of("a.tif"), 1);
        assert_eq!(reader.read_count(), 4);
    }
}
