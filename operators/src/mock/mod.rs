mod mock_feature_store;
mod mock_raster_reader;

pub use mock_feature_store::*;
pub use mock_raster_reader::*;
