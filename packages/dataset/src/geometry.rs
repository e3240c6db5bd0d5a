//! Geometry helpers over region outlines.

use agri_map_dataset_models::{BoundingBox, Region, Vertex};
use geo::{BoundingRect, MultiPoint, Point};

/// Computes the tight axis-aligned box around every vertex of `region`.
///
/// Returns `None` only when the region has no vertices at all.
#[must_use]
pub fn bounds(region: &Region) -> Option<BoundingBox> {
    let points: MultiPoint<f64> = region
        .vertices()
        .map(|&[x, y]| Point::new(x, y))
        .collect();

    points
        .bounding_rect()
        .map(|rect| BoundingBox::new(rect.min().x, rect.max().x, rect.min().y, rect.max().y))
}

/// Formats a polygon as a flat `x,y,x,y,...` list, the form taken by the SVG
/// `points` attribute.
#[must_use]
pub fn svg_points(polygon: &[Vertex]) -> String {
    polygon
        .iter()
        .map(|[x, y]| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_map_dataset_models::Polygon;

    fn region(polygons: Vec<Polygon>) -> Region {
        Region {
            slug: "north-vale".to_string(),
            name: "North Vale".to_string(),
            polygons,
        }
    }

    #[test]
    fn bounds_span_all_polygons() {
        let region = region(vec![
            vec![[1.0, 4.0], [3.0, 2.0], [2.0, 7.0]],
            vec![[-5.0, 10.0], [0.5, 0.5]],
        ]);
        let bbox = bounds(&region).unwrap();
        assert_eq!(bbox, BoundingBox::new(-5.0, 3.0, 0.5, 10.0));
    }

    #[test]
    fn single_point_polygon_is_degenerate_box() {
        let bbox = bounds(&region(vec![vec![[2.5, -1.0]]])).unwrap();
        assert!((bbox.min_x - bbox.max_x).abs() < f64::EPSILON);
        assert!((bbox.min_y - bbox.max_y).abs() < f64::EPSILON);
        assert!(bbox.width().abs() < f64::EPSILON);
    }

    #[test]
    fn no_vertices_has_no_bounds() {
        assert!(bounds(&region(Vec::new())).is_none());
        assert!(bounds(&region(vec![Vec::new()])).is_none());
    }

    #[test]
    fn svg_points_flattens_pairs() {
        assert_eq!(svg_points(&[[1.0, 2.5], [3.0, 4.0]]), "1,2.5,3,4");
        assert_eq!(svg_points(&[]), "");
    }
}
