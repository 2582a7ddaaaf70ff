use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use snafu::ResultExt;
use std::path::Path;

use crate::error;
use crate::util::Result;

/// Opens a raster dataset read-only with verbose errors.
pub fn gdal_open_raster(path: &Path) -> Result<Dataset> {
    let dataset_options = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_RASTER
            | GdalOpenFlags::GDAL_OF_READONLY
            | GdalOpenFlags::GDAL_OF_VERBOSE_ERROR,
        ..DatasetOptions::default()
    };

    Dataset::open_ex(path, dataset_options).context(error::Gdal)
}
