//! Access to the pixel values of raster files.

#[cfg(feature = "gdal")]
mod gdal_reader;

#[cfg(feature = "gdal")]
pub use gdal_reader::GdalRasterReader;

use geosampler_datatypes::primitives::{PointInfo, SampleErrors};
use serde::{Deserialize, Serialize};

use crate::sampling::{RasterInfo, RasterTag};
use crate::util::Result;

/// Names of the bands to sample. An empty selection samples the raster's default band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSelection {
    names: Vec<String>,
}

impl BandSelection {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of reading one band at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    Value(f64),
    OutOfBounds,
    ReadFailed,
}

impl SampleOutcome {
    pub fn value(self) -> Option<f64> {
        match self {
            SampleOutcome::Value(value) => Some(value),
            SampleOutcome::OutOfBounds | SampleOutcome::ReadFailed => None,
        }
    }

    pub fn errors(self) -> SampleErrors {
        match self {
            SampleOutcome::Value(_) => SampleErrors::NO_ERRORS,
            SampleOutcome::OutOfBounds => SampleErrors::OUT_OF_BOUNDS_ERROR,
            SampleOutcome::ReadFailed => SampleErrors::READ_ERROR,
        }
    }
}

/// Opens raster files. Shared by all reader threads.
pub trait RasterReader: Send + Sync {
    fn open(&self, path: &str, info: &RasterInfo) -> Result<Box<dyn OpenRaster>>;
}

/// An opened raster file, used by one thread at a time.
pub trait OpenRaster: Send {
    /// Band numbers (starting at 1) for the named bands. Unknown names are skipped.
    fn band_numbers(&self, selection: &BandSelection) -> Vec<usize>;

    fn band_name(&self, band: usize) -> String;

    fn sample(&mut self, point: &PointInfo, band: usize) -> SampleOutcome;
}

/// The bands to read from a raster referenced by `info`.
///
/// Flags rasters are always read at their flags band. Other rasters use the selection, falling back
/// to their value band if nothing is selected.
pub fn bands_to_sample(
    raster: &dyn OpenRaster,
    info: &RasterInfo,
    selection: &BandSelection,
) -> Vec<usize> {
    if info.tag == RasterTag::Flags {
        return vec![info.flags_band];
    }

    if selection.is_empty() {
        vec![info.value_band]
    } else {
        raster.band_numbers(selection)
    }
}
