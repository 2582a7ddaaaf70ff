use std::path::Path;

use gdal::Dataset;
use geosampler_datatypes::primitives::PointInfo;
use tracing::debug;

use super::{BandSelection, OpenRaster, RasterReader, SampleOutcome};
use crate::error::Error;
use crate::sampling::RasterInfo;
use crate::util::gdal::gdal_open_raster;
use crate::util::Result;

/// Reads rasters with GDAL, returning the pixel containing the point.
///
/// Points are expected in the raster's coordinate system.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalRasterReader;

impl RasterReader for GdalRasterReader {
    fn open(&self, path: &str, _info: &RasterInfo) -> Result<Box<dyn OpenRaster>> {
        let dataset = gdal_open_raster(Path::new(path)).map_err(|e| Error::RasterOpen {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let geo_transform = dataset.geo_transform()?;

        let band_count = usize::try_from(dataset.raster_count()).unwrap_or(0);
        let mut band_names = Vec::with_capacity(band_count);
        for band in 1..=band_count {
            let name = band
                .try_into()
                .ok()
                .and_then(|index| dataset.rasterband(index).ok())
                .and_then(|band| band.description().ok())
                .filter(|description| !description.is_empty())
                .unwrap_or_else(|| format!("band{band}"));
            band_names.push(name);
        }

        debug!("Opened {path} with {band_count} bands");

        Ok(Box::new(GdalRaster {
            dataset,
            geo_transform,
            band_names,
        }))
    }
}

struct GdalRaster {
    dataset: Dataset,
    geo_transform: [f64; 6],
    band_names: Vec<String>,
}

impl GdalRaster {
    /// Pixel containing the point, if the geo transform is north up.
    fn pixel_of(&self, point: &PointInfo) -> Option<(i64, i64)> {
        let [origin_x, pixel_width, _, origin_y, _, pixel_height] = self.geo_transform;
        if pixel_width == 0.0 || pixel_height == 0.0 {
            return None;
        }

        let col = ((point.x - origin_x) / pixel_width).floor();
        let row = ((point.y - origin_y) / pixel_height).floor();
        Some((col as i64, row as i64))
    }
}

impl OpenRaster for GdalRaster {
    fn band_numbers(&self, selection: &BandSelection) -> Vec<usize> {
        selection
            .names()
            .iter()
            .filter_map(|name| {
                self.band_names
                    .iter()
                    .position(|band_name| band_name == name)
                    .map(|index| index + 1)
            })
            .collect()
    }

    fn band_name(&self, band: usize) -> String {
        band.checked_sub(1)
            .and_then(|index| self.band_names.get(index))
            .cloned()
            .unwrap_or_else(|| format!("band{band}"))
    }

    fn sample(&mut self, point: &PointInfo, band: usize) -> SampleOutcome {
        let (width, height) = self.dataset.raster_size();

        let Some((col, row)) = self.pixel_of(point) else {
            return SampleOutcome::ReadFailed;
        };
        if col < 0 || row < 0 || col >= width as i64 || row >= height as i64 {
            return SampleOutcome::OutOfBounds;
        }

        let (Ok(band_index), Ok(x), Ok(y)) = (band.try_into(), col.try_into(), row.try_into())
        else {
            return SampleOutcome::ReadFailed;
        };

        let Ok(raster_band) = self.dataset.rasterband(band_index) else {
            return SampleOutcome::ReadFailed;
        };

        match raster_band.read_as::<f64>((x, y), (1, 1), (1, 1), None) {
            Ok(buffer) => buffer
                .data()
                .first()
                .copied()
                .map_or(SampleOutcome::ReadFailed, SampleOutcome::Value),
            Err(_) => SampleOutcome::ReadFailed,
        }
    }
}
