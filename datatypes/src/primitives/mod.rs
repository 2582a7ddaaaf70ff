mod bounding_box;
mod coordinate;
pub mod gps;
mod point;
mod raster_sample;
mod sample_errors;

pub use bounding_box::BoundingBox2D;
pub use coordinate::Coordinate2D;
pub use gps::GmtDate;
pub use point::PointInfo;
pub use raster_sample::RasterSample;
pub use sample_errors::SampleErrors;
