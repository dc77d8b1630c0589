//! Burn geometries into a `u8` mask.
//!
//! Polygons are filled with an even-odd scanline rule evaluated at pixel
//! centres, lines are walked in steps of at most half a pixel, and points set
//! the pixel they fall in. Everything is burnt with 255.
use crate::geometry::GeoTransform;
use crate::image::ImageU8;
use geo::{Coord, Geometry, LineString, MapCoords, Polygon};

pub const BURN_VALUE: u8 = 255;

/// Burn world-space geometries into a `width × height` mask, using
/// `world_to_pixel` to reach raster coordinates.
pub fn burn_geometries<'a, I>(
    geoms: I,
    width: usize,
    height: usize,
    world_to_pixel: &GeoTransform,
) -> ImageU8
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut mask = ImageU8::new(width, height);
    for geom in geoms {
        let pixel = geom.map_coords(|c| {
            let (x, y) = world_to_pixel.apply(c.x, c.y);
            Coord { x, y }
        });
        burn_geometry(&mut mask, &pixel);
    }
    mask
}

/// Burn one geometry already expressed in raster coordinates.
pub fn burn_geometry(mask: &mut ImageU8, geom: &Geometry<f64>) {
    match geom {
        Geometry::Point(p) => burn_point(mask, p.0),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| burn_point(mask, p.0)),
        Geometry::Line(l) => burn_segment(mask, l.start, l.end),
        Geometry::LineString(ls) => burn_line(mask, ls),
        Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| burn_line(mask, ls)),
        Geometry::Polygon(p) => fill_polygon(mask, p),
        Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| fill_polygon(mask, p)),
        Geometry::Rect(r) => fill_polygon(mask, &r.to_polygon()),
        Geometry::Triangle(t) => fill_polygon(mask, &t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| burn_geometry(mask, g)),
    }
}

fn burn_point(mask: &mut ImageU8, c: Coord<f64>) {
    if c.x.is_finite() && c.y.is_finite() {
        mask.set_checked(c.x.floor() as i64, c.y.floor() as i64, BURN_VALUE);
    }
}

fn burn_line(mask: &mut ImageU8, ls: &LineString<f64>) {
    match ls.0.as_slice() {
        [] => {}
        [only] => burn_point(mask, *only),
        coords => coords
            .windows(2)
            .for_each(|w| burn_segment(mask, w[0], w[1])),
    }
}

fn burn_segment(mask: &mut ImageU8, a: Coord<f64>, b: Coord<f64>) {
    let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    if !len.is_finite() {
        return;
    }
    let steps = (len / 0.5).ceil().max(1.0) as usize;
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        burn_point(
            mask,
            Coord {
                x: a.x + (b.x - a.x) * t,
                y: a.y + (b.y - a.y) * t,
            },
        );
    }
}

fn fill_polygon(mask: &mut ImageU8, poly: &Polygon<f64>) {
    let rings: Vec<&LineString<f64>> = std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .collect();
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for c in rings.iter().flat_map(|r| r.0.iter()) {
        y_min = y_min.min(c.y);
        y_max = y_max.max(c.y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        return;
    }
    let row_lo = (y_min - 0.5).ceil().max(0.0) as usize;
    let row_hi = ((y_max - 0.5).floor().min(mask.h as f64 - 1.0)).max(-1.0);
    if row_hi < 0.0 {
        return;
    }
    let row_hi = row_hi as usize;

    let mut xs: Vec<f64> = Vec::new();
    for row in row_lo..=row_hi {
        let yc = row as f64 + 0.5;
        xs.clear();
        for ring in &rings {
            for w in ring.0.windows(2) {
                let (p, q) = (w[0], w[1]);
                if (p.y <= yc && yc < q.y) || (q.y <= yc && yc < p.y) {
                    xs.push(p.x + (yc - p.y) * (q.x - p.x) / (q.y - p.y));
                }
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        for pair in xs.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0);
            let end = (pair[1] - 0.5).ceil().min(mask.w as f64);
            let mut col = start;
            while col < end {
                mask.set(col as usize, row, BURN_VALUE);
                col += 1.0;
            }
        }
    }
}
