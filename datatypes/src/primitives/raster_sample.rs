use super::SampleErrors;
use serde::{Deserialize, Serialize};

/// One value read from one band of one raster file at one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSample {
    /// Id of the raster file in the sampler's file dictionary.
    pub file_id: u64,
    pub value: f64,
    /// Acquisition time of the raster group in GPS seconds.
    pub time: i64,
    pub band: String,
    pub flags: u32,
    pub errors: SampleErrors,
}

impl RasterSample {
    pub fn new(file_id: u64, value: f64, band: impl Into<String>) -> Self {
        Self {
            file_id,
            value,
            time: 0,
            band: band.into(),
            flags: 0,
            errors: SampleErrors::NO_ERRORS,
        }
    }
}
