use super::Coordinate2D;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
#[repr(C)]
/// The bounding box of a geometry.
/// Note: may degenerate to a point!
pub struct BoundingBox2D {
    lower_left_coordinate: Coordinate2D,
    upper_right_coordinate: Coordinate2D,
}

impl BoundingBox2D {
    /// Creates a new bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use geosampler_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let ll = Coordinate2D::new(1.0, 1.0);
    /// let ur = Coordinate2D::new(2.0, 2.0);
    /// let bbox = BoundingBox2D::new(ll, ur).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the coordinate's values are not in order
    ///
    pub fn new(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Result<Self> {
        ensure!(
            lower_left_coordinate.x <= upper_right_coordinate.x
                && lower_left_coordinate.y <= upper_right_coordinate.y,
            error::InvalidBoundingBox {
                lower_left_coordinate,
                upper_right_coordinate
            }
        );
        Ok(Self {
            lower_left_coordinate,
            upper_right_coordinate,
        })
    }

    pub fn new_unchecked(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Self {
        Self {
            lower_left_coordinate,
            upper_right_coordinate,
        }
    }

    /// A degenerated bounding box that only covers `coordinate`.
    pub fn from_point(coordinate: Coordinate2D) -> Self {
        Self::new_unchecked(coordinate, coordinate)
    }

    pub fn lower_left(&self) -> Coordinate2D {
        self.lower_left_coordinate
    }

    pub fn upper_right(&self) -> Coordinate2D {
        self.upper_right_coordinate
    }

    /// Checks if two bounding boxes share at least one point, touching borders included
    pub fn intersects_bbox(&self, other_bbox: &Self) -> bool {
        self.lower_left_coordinate.x <= other_bbox.upper_right_coordinate.x
            && other_bbox.lower_left_coordinate.x <= self.upper_right_coordinate.x
            && self.lower_left_coordinate.y <= other_bbox.upper_right_coordinate.y
            && other_bbox.lower_left_coordinate.y <= self.upper_right_coordinate.y
    }

    pub fn extend_with_coord(&mut self, coord: Coordinate2D) {
        self.lower_left_coordinate = self.lower_left_coordinate.min_elements(coord);
        self.upper_right_coordinate = self.upper_right_coordinate.max_elements(coord);
    }

    /// Grows the bounding box so it also covers `other`.
    pub fn extend(&mut self, other: &Self) {
        self.extend_with_coord(other.lower_left_coordinate);
        self.extend_with_coord(other.upper_right_coordinate);
    }
}

impl From<BoundingBox2D> for geo::Rect<f64> {
    fn from(bbox: BoundingBox2D) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord::from(bbox.lower_left_coordinate),
            geo::Coord::from(bbox.upper_right_coordinate),
        )
    }
}

impl From<geo::Rect<f64>> for BoundingBox2D {
    fn from(rect: geo::Rect<f64>) -> BoundingBox2D {
        // `geo::Rect` normalizes its corners on construction
        BoundingBox2D::new_unchecked(rect.min().into(), rect.max().into())
    }
}
