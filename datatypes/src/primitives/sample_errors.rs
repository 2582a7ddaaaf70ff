use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Error bits reported per call and per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleErrors(u32);

impl SampleErrors {
    pub const NO_ERRORS: Self = Self(0);
    pub const THREADS_LIMIT_ERROR: Self = Self(0x01);
    /// The call was stopped before all points were sampled.
    pub const SAMPLING_STOPPED_ERROR: Self = Self(0x02);
    pub const INDEX_FILE_ERROR: Self = Self(0x04);
    pub const RESOURCE_LIMIT_ERROR: Self = Self(0x08);
    pub const OUT_OF_BOUNDS_ERROR: Self = Self(0x10);
    pub const READ_ERROR: Self = Self(0x20);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for SampleErrors {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SampleErrors {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SampleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
