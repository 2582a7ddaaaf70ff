//! GMT dates and GPS time.
//!
//! GPS seconds count from 1980-01-06T00:00:00Z and, unlike unix time, include leap seconds.

use crate::error;
use crate::util::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::fmt;

/// Unix timestamp of the GPS epoch (1980-01-06T00:00:00Z).
pub const GPS_EPOCH_UNIX_SECONDS: i64 = 315_964_800;

/// Unix timestamps at which a leap second took effect since the GPS epoch.
const LEAP_SECONDS: [i64; 18] = [
    362_793_600,   // 1981-07-01
    394_329_600,   // 1982-07-01
    425_865_600,   // 1983-07-01
    489_024_000,   // 1985-07-01
    567_993_600,   // 1988-01-01
    631_152_000,   // 1990-01-01
    662_688_000,   // 1991-01-01
    709_948_800,   // 1992-07-01
    741_484_800,   // 1993-07-01
    773_020_800,   // 1994-07-01
    820_454_400,   // 1996-01-01
    867_715_200,   // 1997-07-01
    915_148_800,   // 1999-01-01
    1_136_073_600, // 2006-01-01
    1_230_768_000, // 2009-01-01
    1_341_100_800, // 2012-07-01
    1_435_708_800, // 2015-07-01
    1_483_228_800, // 2017-01-01
];

/// Number of leap seconds inserted between the GPS epoch and `unix_seconds`.
pub fn leap_seconds_at(unix_seconds: i64) -> i64 {
    LEAP_SECONDS.iter().filter(|&&leap| leap <= unix_seconds).count() as i64
}

pub fn unix_to_gps_seconds(unix_seconds: i64) -> i64 {
    unix_seconds - GPS_EPOCH_UNIX_SECONDS + leap_seconds_at(unix_seconds)
}

/// A point in time in UTC, as found in catalog date attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GmtDate(DateTime<Utc>);

impl GmtDate {
    /// Parses `YYYY-MM-DDTHH:MM:SS[.fff]Z`, any RFC 3339 date, `YYYY-MM-DD HH:MM:SS` or a plain
    /// `YYYY-MM-DD`. Dates without offset are taken as UTC.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(date.with_timezone(&Utc)));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(date) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self(Utc.from_utc_datetime(&date)));
            }
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date| Self(Utc.from_utc_datetime(&date)))
            .context(error::DateParse { input })
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn gps_seconds(&self) -> i64 {
        unix_to_gps_seconds(self.unix_seconds())
    }

    /// Day of year, starting with 1 on January 1st.
    pub fn day_of_year(&self) -> u32 {
        self.0.ordinal()
    }
}

impl fmt::Display for GmtDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

/// Inclusive day-of-year check.
pub fn doy_in_range(date: &GmtDate, doy_start: u32, doy_end: u32) -> bool {
    let doy = date.day_of_year();
    doy >= doy_start && doy <= doy_end
}
