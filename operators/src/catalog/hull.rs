use geo::{ConvexHull, MultiPoint, Point, Polygon};
use geosampler_datatypes::primitives::PointInfo;
use std::f64::consts::FRAC_1_SQRT_2;

/// Directions used to approximate a circular buffer around every point.
const BUFFER_DIRECTIONS: [(f64, f64); 8] = [
    (1.0, 0.0),
    (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (0.0, 1.0),
    (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (-1.0, 0.0),
    (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    (0.0, -1.0),
    (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// Convex hull around all `points`, grown by `buffer` in every direction.
///
/// Used as spatial filter when loading a catalog for a batch of points.
/// Returns `None` for an empty batch.
pub fn buffered_convex_hull(points: &[PointInfo], buffer: f64) -> Option<Polygon<f64>> {
    if points.is_empty() {
        return None;
    }

    let mut vertices: Vec<Point<f64>> =
        Vec::with_capacity(points.len() * (BUFFER_DIRECTIONS.len() + 1));

    for point in points {
        vertices.push(Point::new(point.x, point.y));
        if buffer > 0.0 {
            vertices.extend(
                BUFFER_DIRECTIONS
                    .iter()
                    .map(|(dx, dy)| Point::new(point.x + dx * buffer, point.y + dy * buffer)),
            );
        }
    }

    Some(MultiPoint::new(vertices).convex_hull())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use geo::{Area, BoundingRect, Contains};

    #[test]
    fn empty_batch_has_no_hull() {
        assert!(buffered_convex_hull(&[], 0.01).is_none());
    }

    #[test]
    fn hull_contains_all_points() {
        let points = vec![
            PointInfo::new(0.0, 0.0),
            PointInfo::new(1.0, 0.0),
            PointInfo::new(0.5, 2.0),
            PointInfo::new(0.5, 0.5),
        ];

        let hull = buffered_convex_hull(&points, 0.01).unwrap();

        for point in &points {
            assert!(hull.contains(&Point::new(point.x, point.y)));
        }

        let bbox = hull.bounding_rect().unwrap();
        assert!(approx_eq!(f64, bbox.min().x, -0.01, epsilon = 1e-12));
        assert!(approx_eq!(f64, bbox.max().y, 2.01, epsilon = 1e-12));
    }

    #[test]
    fn single_point_becomes_octagon() {
        let hull = buffered_convex_hull(&[PointInfo::new(10.0, 10.0)], 1.0).unwrap();

        assert_eq!(hull.exterior().0.len(), 9);
        // area of a regular octagon with circumradius 1
        assert!(approx_eq!(f64, hull.unsigned_area(), 2.0 * 2f64.sqrt(), epsilon = 1e-9));
    }
}
