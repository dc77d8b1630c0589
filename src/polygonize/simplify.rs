//! SIMPLIFY stage shared by all strategies.
//!
//! Rings are reduced with topology-preserving Visvalingam-Whyatt: a vertex
//! is dropped while the triangle it spans with its neighbours is smaller
//! than `tolerance²`. Marching-squares corners are 0.5 px chamfers, and an
//! area criterion keeps both chamfer vertices, so a pixel block comes back
//! with its full extent instead of a skewed quadrilateral.
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, LineString, Polygon, SimplifyVwPreserve};

/// Simplify every polygon, drop degenerate rings, drop holes and polygons
/// under `min_area`, and orient exteriors counter-clockwise.
pub fn simplify_polygons(
    polygons: Vec<Polygon<f64>>,
    tolerance: f64,
    min_area: f64,
) -> Vec<Polygon<f64>> {
    polygons
        .into_iter()
        .filter_map(|p| simplify_polygon(&p, tolerance, min_area))
        .collect()
}

pub fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64, min_area: f64) -> Option<Polygon<f64>> {
    let reduced = if tolerance > 0.0 {
        polygon.simplify_vw_preserve(&(tolerance * tolerance))
    } else {
        polygon.clone()
    };
    let (exterior, interiors) = reduced.into_inner();
    if !is_ring(&exterior) {
        return None;
    }
    let interiors: Vec<LineString<f64>> = interiors
        .into_iter()
        .filter(|ring| is_ring(ring) && ring_area(ring) >= min_area)
        .collect();
    let out = Polygon::new(exterior, interiors);
    if out.unsigned_area() < min_area {
        return None;
    }
    Some(out.orient(Direction::Default))
}

fn is_ring(ring: &LineString<f64>) -> bool {
    ring.0.len() >= 4
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), vec![]).unsigned_area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn collinear_vertices_are_removed() {
        let p = polygon![
            (x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0), (x: 0.0, y: 10.0),
        ];
        let out = simplify_polygon(&p, 0.5, 1.0).unwrap();
        assert_eq!(out.exterior().0.len(), 5);
        assert!((out.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn small_polygons_and_holes_are_dropped() {
        let big = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 20.0), (x: 0.0, y: 20.0)],
            interiors: [[(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)]],
        );
        let small = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let out = simplify_polygons(vec![big, small], 0.1, 10.0);
        assert_eq!(out.len(), 1);
        assert!(out[0].interiors().is_empty());
    }

    #[test]
    fn chamfered_block_keeps_its_extent() {
        // Marching-squares outline of a 50×50 pixel block: half-pixel
        // vertices along the sides and a 0.5 px chamfer at each corner,
        // starting on a chamfer vertex.
        let mut ring = Vec::new();
        ring.push((75.0, 75.5));
        ring.extend((0..50).map(|k| (75.5 + k as f64, 75.0)));
        ring.extend((0..50).map(|k| (125.0, 75.5 + k as f64)));
        ring.extend((0..50).map(|k| (124.5 - k as f64, 125.0)));
        ring.extend((0..49).map(|k| (75.0, 124.5 - k as f64)));
        let block = Polygon::new(LineString::from(ring), vec![]);
        assert!((block.unsigned_area() - 2499.5).abs() < 1e-9);

        let out = simplify_polygon(&block, 1.0, 10.0).unwrap();
        assert!((out.unsigned_area() - 2499.5).abs() < 1e-9);
        assert!(out.exterior().0.len() <= 10);
    }

    #[test]
    fn exterior_is_counter_clockwise() {
        let cw = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 10.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0)];
        let out = simplify_polygon(&cw, 0.0, 0.0).unwrap();
        assert!(out.signed_area() > 0.0);
    }
}
