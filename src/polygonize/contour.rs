//! Marching-squares iso-contour extraction.
//!
//! The grid is padded with a one-pixel virtual border below the level so
//! every contour closes. Output coordinates use the raster corner convention:
//! pixel `(c, r)` has its centre at `(c + 0.5, r + 0.5)`.
//!
//! Each crossing is the start of exactly one cell segment and the end of
//! exactly one other, so rings are linked through a start→end map keyed by
//! grid edge id. Segments keep foreground on a fixed side, which makes
//! exteriors come out with positive signed area and holes negative.
use crate::image::ImageF32;
use geo::{Contains, Coord, LineString, Point, Polygon};
use std::collections::HashMap;

/// Extract polygons (with holes) from `plane` at iso-level `level`.
/// A pixel is foreground when its value is strictly greater than `level`.
pub fn extract_polygons(plane: &ImageF32, level: f32) -> Vec<Polygon<f64>> {
    let rings = trace_rings(plane, level);
    assemble_polygons(rings)
}

/// Closed rings as open coordinate lists (first vertex not repeated).
pub fn trace_rings(plane: &ImageF32, level: f32) -> Vec<Vec<[f64; 2]>> {
    if plane.w == 0 || plane.h == 0 {
        return Vec::new();
    }
    let grid = PaddedGrid::new(plane, level);
    let mut next: HashMap<usize, usize> = HashMap::new();
    let mut order: Vec<usize> = Vec::new();

    for j in 0..grid.h - 1 {
        for i in 0..grid.w - 1 {
            for (from, to) in grid.cell_segments(i, j) {
                if next.insert(from, to).is_none() {
                    order.push(from);
                }
            }
        }
    }

    let mut rings = Vec::new();
    for start in order {
        let Some(mut cursor) = next.remove(&start) else {
            continue;
        };
        let mut ring = vec![grid.crossing(start)];
        while cursor != start {
            ring.push(grid.crossing(cursor));
            match next.remove(&cursor) {
                Some(n) => cursor = n,
                None => break,
            }
        }
        if ring.len() >= 3 {
            rings.push(ring);
        }
    }
    rings
}

/// Shoelace signed area of an open ring in raw (y-down) coordinates.
pub fn signed_area(ring: &[[f64; 2]]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for k in 0..n {
        let p = ring[k];
        let q = ring[(k + 1) % n];
        acc += p[0] * q[1] - q[0] * p[1];
    }
    0.5 * acc
}

fn assemble_polygons(rings: Vec<Vec<[f64; 2]>>) -> Vec<Polygon<f64>> {
    let mut exteriors: Vec<(f64, Polygon<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes: Vec<Vec<[f64; 2]>> = Vec::new();
    for ring in rings {
        let area = signed_area(&ring);
        if area > 0.0 {
            exteriors.push((area, Polygon::new(closed(&ring), vec![]), Vec::new()));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let probe: Vec<Point<f64>> = hole.iter().map(|p| Point::new(p[0], p[1])).collect();
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (_, poly, _))| probe.iter().any(|p| poly.contains(p)))
            .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
            .map(|(idx, _)| idx);
        if let Some(idx) = owner {
            exteriors[idx].2.push(closed(&hole));
        }
    }

    exteriors
        .into_iter()
        .map(|(_, poly, interiors)| {
            let (exterior, _) = poly.into_inner();
            Polygon::new(exterior, interiors)
        })
        .collect()
}

fn closed(ring: &[[f64; 2]]) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Source plane surrounded by a one-sample border of `pad`.
struct PaddedGrid<'a> {
    plane: &'a ImageF32,
    level: f32,
    pad: f32,
    w: usize,
    h: usize,
}

impl<'a> PaddedGrid<'a> {
    fn new(plane: &'a ImageF32, level: f32) -> Self {
        let pad = if level > 0.0 { 0.0 } else { level - 1.0 };
        Self {
            plane,
            level,
            pad,
            w: plane.w + 2,
            h: plane.h + 2,
        }
    }

    #[inline]
    fn value(&self, i: usize, j: usize) -> f32 {
        if i == 0 || j == 0 || i > self.plane.w || j > self.plane.h {
            self.pad
        } else {
            self.plane.get(i - 1, j - 1)
        }
    }

    #[inline]
    fn inside(&self, i: usize, j: usize) -> bool {
        self.value(i, j) > self.level
    }

    /// Horizontal edge `(i, j)–(i+1, j)`.
    #[inline]
    fn h_edge(&self, i: usize, j: usize) -> usize {
        (j * self.w + i) * 2
    }

    /// Vertical edge `(i, j)–(i, j+1)`.
    #[inline]
    fn v_edge(&self, i: usize, j: usize) -> usize {
        (j * self.w + i) * 2 + 1
    }

    /// Directed segments `(from_edge, to_edge)` of cell `(i, j)`.
    fn cell_segments(&self, i: usize, j: usize) -> Vec<(usize, usize)> {
        // Corners tl, tr, br, bl; edge k joins corner k and corner k + 1.
        let corners = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)];
        let inside = corners.map(|(x, y)| self.inside(x, y));
        if inside.iter().all(|&v| v) || inside.iter().all(|&v| !v) {
            return Vec::new();
        }
        let edges = [
            self.h_edge(i, j),
            self.v_edge(i + 1, j),
            self.h_edge(i, j + 1),
            self.v_edge(i, j),
        ];
        let crossed: Vec<usize> = (0..4).filter(|&k| inside[k] != inside[(k + 1) % 4]).collect();
        // Edge k is left from inside to outside when corner k is foreground.
        let leaving = |k: usize| inside[k];

        if crossed.len() == 2 {
            let (a, b) = (crossed[0], crossed[1]);
            return if leaving(a) {
                vec![(edges[a], edges[b])]
            } else {
                vec![(edges[b], edges[a])]
            };
        }

        let centre = corners
            .iter()
            .map(|&(x, y)| self.value(x, y))
            .sum::<f32>()
            / 4.0;
        let connected = centre > self.level;
        (0..4)
            .filter(|&k| leaving(k))
            .map(|k| {
                let partner = if connected { (k + 1) % 4 } else { (k + 3) % 4 };
                (edges[k], edges[partner])
            })
            .collect()
    }

    /// Interpolated crossing point of a grid edge in raster coordinates.
    fn crossing(&self, edge: usize) -> [f64; 2] {
        let base = edge / 2;
        let (i, j) = (base % self.w, base / self.w);
        let (i2, j2) = if edge % 2 == 0 { (i + 1, j) } else { (i, j + 1) };
        let va = self.value(i, j) as f64;
        let vb = self.value(i2, j2) as f64;
        let denom = vb - va;
        let t = if denom.abs() > f64::EPSILON {
            ((self.level as f64 - va) / denom).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let x = i as f64 + t * (i2 as f64 - i as f64);
        let y = j as f64 + t * (j2 as f64 - j as f64);
        // Padded index (i, j) is the pixel centre (i - 0.5, j - 0.5).
        [x - 0.5, y - 0.5]
    }
}
