use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize, Default)]
#[repr(C)]
pub struct Coordinate2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinate2D {
    /// Creates a new coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use geosampler_datatypes::primitives::Coordinate2D;
    ///
    /// let c = Coordinate2D::new(1.0, 0.0);
    ///
    /// assert_eq!(c.x, 1.0);
    /// assert_eq!(c.y, 0.0);
    /// ```
    ///
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn min_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    #[must_use]
    pub fn max_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }
}

impl fmt::Display for Coordinate2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Coordinate2D {
    /// # Examples
    ///
    /// ```
    /// use geosampler_datatypes::primitives::Coordinate2D;
    ///
    /// let c: Coordinate2D = (5.1, -3.0).into();
    ///
    /// assert_eq!(c.x, 5.1);
    /// assert_eq!(c.y, -3.0);
    /// ```
    ///
    fn from(tuple: (f64, f64)) -> Self {
        let (x, y) = tuple;
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coordinate2D {
    fn from(array: [f64; 2]) -> Self {
        let [x, y] = array;
        Self { x, y }
    }
}

impl From<Coordinate2D> for [f64; 2] {
    fn from(coordinate: Coordinate2D) -> [f64; 2] {
        [coordinate.x, coordinate.y]
    }
}

impl From<Coordinate2D> for geo::Coord<f64> {
    fn from(coordinate: Coordinate2D) -> geo::Coord<f64> {
        geo::Coord {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl From<geo::Coord<f64>> for Coordinate2D {
    fn from(coordinate: geo::Coord<f64>) -> Coordinate2D {
        Coordinate2D {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl From<Coordinate2D> for geo::Point<f64> {
    fn from(coordinate: Coordinate2D) -> geo::Point<f64> {
        geo::Point::new(coordinate.x, coordinate.y)
    }
}

impl From<geo::Point<f64>> for Coordinate2D {
    fn from(point: geo::Point<f64>) -> Coordinate2D {
        Coordinate2D {
            x: point.x(),
            y: point.y(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_elements() {
        let a = Coordinate2D::new(1.0, 5.0);
        let b = Coordinate2D::new(3.0, -2.0);

        assert_eq!(a.min_elements(b), Coordinate2D::new(1.0, -2.0));
        assert_eq!(a.max_elements(b), Coordinate2D::new(3.0, 5.0));
    }

    #[test]
    fn geo_round_trip() {
        let c = Coordinate2D::new(-105.2, 40.1);
        let point: geo::Point<f64> = c.into();
        assert_eq!(Coordinate2D::from(point), c);
    }

    #[test]
    fn display() {
        assert_eq!(Coordinate2D::new(1.5, -2.0).to_string(), "(1.5, -2)");
    }
}
