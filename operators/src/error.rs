use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: geosampler_datatypes::error::Error,
    },

    #[snafu(display("Io Error: {}", source))]
    Io {
        source: std::io::Error,
    },

    #[snafu(display("GeoJson Error: {}", source))]
    GeoJson {
        source: Box<geojson::Error>,
    },

    #[snafu(display("Config Error: {}", source))]
    Config {
        source: config::ConfigError,
    },

    #[snafu(display("Invalid parameter `{}`: {}", parameter, reason))]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[cfg(feature = "gdal")]
    #[snafu(display("Gdal Error: {}", source))]
    Gdal {
        source: gdal::errors::GdalError,
    },

    #[snafu(display("Unable to open catalog `{}`: {}", path, reason))]
    CatalogOpen {
        path: String,
        reason: String,
    },

    #[snafu(display("Catalog feature #{} has no geometry", ordinal))]
    CatalogFeatureWithoutGeometry {
        ordinal: usize,
    },

    #[snafu(display(
        "Number of point groups ({}) does not match number of points ({})",
        groups,
        points
    ))]
    PointGroupCountMismatch {
        groups: usize,
        points: usize,
    },

    #[snafu(display("Unable to open raster `{}`: {}", path, reason))]
    RasterOpen {
        path: String,
        reason: String,
    },

    #[snafu(display("The sampler lock was poisoned by a panicking thread"))]
    SamplerLockPoisoned,
}

impl From<geosampler_datatypes::error::Error> for Error {
    fn from(datatype_error: geosampler_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io { source: io_error }
    }
}

impl From<geojson::Error> for Error {
    fn from(geojson_error: geojson::Error) -> Self {
        Self::GeoJson {
            source: Box::new(geojson_error),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(config_error: config::ConfigError) -> Self {
        Self::Config {
            source: config_error,
        }
    }
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}
