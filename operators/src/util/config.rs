use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use geosampler_datatypes::primitives::GmtDate;
use serde::Deserialize;
use snafu::{ensure, ResultExt};

use crate::error::{self, Error};
use crate::util::{hardware_concurrency, Result};

pub const SETTINGS_DEFAULT_FILE: &str = "Settings-default.toml";
pub const SETTINGS_FILE: &str = "Settings.toml";
pub const ENVIRONMENT_PREFIX: &str = "GEOSAMPLER";

/// Layered settings: `Settings-default.toml`, then `Settings.toml`, then `GEOSAMPLER__*` variables.
#[derive(Debug, Clone)]
pub struct Settings {
    config: Config,
}

impl Settings {
    /// Loads the settings files found in `dir`. Missing files are skipped.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let files: Vec<PathBuf> = [SETTINGS_DEFAULT_FILE, SETTINGS_FILE]
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.exists())
            .collect();

        let mut builder = Config::builder();
        for file in files {
            builder = builder.add_source(File::from(file));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context(error::Config)?;

        Ok(Self { config })
    }

    /// Loads the settings relative to the current working directory.
    pub fn from_working_dir() -> Result<Self> {
        let dir = std::env::current_dir().context(error::Io)?;
        Self::from_dir(&dir)
    }

    pub fn get<'de, T>(&self, key: &str) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        self.config.get::<T>(key).context(error::Config)
    }

    pub fn get_config_element<'de, T>(&self) -> Result<T>
    where
        T: ConfigElement + Deserialize<'de>,
    {
        self.get(T::KEY)
    }
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub stop: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DoyRange {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_true")]
    pub keep_in_range: bool,
}

/// Parameters of an [`IndexedRasterSampler`](crate::sampling::IndexedRasterSampler).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerParameters {
    /// Temporal pre-filter applied while loading the catalog.
    pub filter_time: Option<TimeRange>,
    pub filter_doy_range: Option<DoyRange>,
    /// Keep only groups with a raster path containing this substring.
    pub url_substring: Option<String>,
    /// Keep only the groups closest to this time.
    pub filter_closest_time: Option<String>,
    /// Use the time of each point as closest-time target.
    pub use_poi_time: bool,
    /// Order spatial index results by catalog order.
    pub sort_by_index: bool,
    /// Stamp samples with the value of the group's flags raster.
    pub flags_file: bool,
    /// Band names to sample; empty samples the raster's value band.
    pub bands: Vec<String>,
    pub max_reader_threads: usize,
    pub min_points_per_thread: usize,
    /// Defaults to the number of cpus.
    pub max_finder_threads: Option<usize>,
    /// A unique raster uses a dense point lookup if its highest point index is below
    /// `dense_lookup_factor` times its point count.
    pub dense_lookup_factor: usize,
    /// Buffer around the points' convex hull used as catalog spatial filter.
    pub hull_buffer: f64,
    /// Rasters kept open between single point calls.
    pub max_cache_size: usize,
}

impl Default for SamplerParameters {
    fn default() -> Self {
        Self {
            filter_time: None,
            filter_doy_range: None,
            url_substring: None,
            filter_closest_time: None,
            use_poi_time: false,
            sort_by_index: false,
            flags_file: false,
            bands: Vec::new(),
            max_reader_threads: 20,
            min_points_per_thread: 100,
            max_finder_threads: None,
            dense_lookup_factor: 8,
            hull_buffer: 0.01,
            max_cache_size: 20,
        }
    }
}

impl ConfigElement for SamplerParameters {
    const KEY: &'static str = "sampler";
}

impl SamplerParameters {
    pub fn validate(&self) -> Result<()> {
        if let Some((start, stop)) = self.time_range()? {
            ensure!(
                start <= stop,
                error::InvalidParameter {
                    parameter: "filter_time",
                    reason: format!("start {start} is after stop {stop}"),
                }
            );
        }

        if let Some(doy) = &self.filter_doy_range {
            for day in [doy.start, doy.end] {
                ensure!(
                    (1..=366).contains(&day),
                    error::InvalidParameter {
                        parameter: "filter_doy_range",
                        reason: format!("day {day} is not in 1..=366"),
                    }
                );
            }
            ensure!(
                doy.start <= doy.end,
                error::InvalidParameter {
                    parameter: "filter_doy_range",
                    reason: format!("start {} is after end {}", doy.start, doy.end),
                }
            );
        }

        self.closest_time()?;

        ensure!(
            self.max_reader_threads > 0,
            error::InvalidParameter {
                parameter: "max_reader_threads",
                reason: "must be positive".to_owned(),
            }
        );
        ensure!(
            self.min_points_per_thread > 0,
            error::InvalidParameter {
                parameter: "min_points_per_thread",
                reason: "must be positive".to_owned(),
            }
        );
        ensure!(
            self.max_finder_threads != Some(0),
            error::InvalidParameter {
                parameter: "max_finder_threads",
                reason: "must be positive".to_owned(),
            }
        );
        ensure!(
            self.dense_lookup_factor > 0,
            error::InvalidParameter {
                parameter: "dense_lookup_factor",
                reason: "must be positive".to_owned(),
            }
        );
        ensure!(
            self.max_cache_size > 0,
            error::InvalidParameter {
                parameter: "max_cache_size",
                reason: "must be positive".to_owned(),
            }
        );
        ensure!(
            self.hull_buffer.is_finite() && self.hull_buffer >= 0.0,
            error::InvalidParameter {
                parameter: "hull_buffer",
                reason: format!("{} is not a non-negative number", self.hull_buffer),
            }
        );

        Ok(())
    }

    pub fn time_range(&self) -> Result<Option<(GmtDate, GmtDate)>> {
        self.filter_time
            .as_ref()
            .map(|range| -> Result<(GmtDate, GmtDate)> {
                Ok((GmtDate::parse(&range.start)?, GmtDate::parse(&range.stop)?))
            })
            .transpose()
    }

    /// Target of the closest-time filter in GPS seconds.
    pub fn closest_time(&self) -> Result<Option<i64>> {
        self.filter_closest_time
            .as_deref()
            .map(|time| {
                GmtDate::parse(time)
                    .map(|date| date.gps_seconds())
                    .map_err(Error::from)
            })
            .transpose()
    }

    pub fn finder_threads(&self) -> usize {
        self.max_finder_threads.unwrap_or_else(hardware_concurrency)
    }
}

fn default_true() -> bool {
    true
}
