use super::Coordinate2D;
use serde::{Deserialize, Serialize};

/// A point of interest to sample.
///
/// `gps` is an optional target time in GPS seconds used by the closest-time filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PointInfo {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub gps: Option<i64>,
}

impl PointInfo {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            gps: None,
        }
    }

    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    #[must_use]
    pub fn with_gps(mut self, gps: i64) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn coordinate(&self) -> Coordinate2D {
        Coordinate2D::new(self.x, self.y)
    }
}

impl From<Coordinate2D> for PointInfo {
    fn from(coordinate: Coordinate2D) -> Self {
        Self::new(coordinate.x, coordinate.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_without_optional_fields() {
        let point: PointInfo = serde_json::from_str(r#"{"x": 1.5, "y": -2.0}"#).unwrap();
        assert_eq!(point, PointInfo::new(1.5, -2.0));

        let point: PointInfo =
            serde_json::from_str(r#"{"x": 1.5, "y": -2.0, "z": 3.0, "gps": 42}"#).unwrap();
        assert_eq!(point, PointInfo::new(1.5, -2.0).with_z(3.0).with_gps(42));
    }
}
