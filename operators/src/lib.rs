pub mod catalog;
pub mod error;
pub mod index;
pub mod mock;
pub mod raster;
pub mod sampling;
pub mod util;
