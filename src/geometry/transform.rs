//! Six-parameter affine georeferencing of a raster.
//!
//! Coefficients follow the rasterio ordering `(a, b, c, d, e, f)`:
//!
//! ```text
//! x = a·col + b·row + c
//! y = d·col + e·row + f
//! ```
//!
//! where `(col, row)` are raster coordinates with pixel corners on integers.
use crate::error::RasterError;
use geo::{Coord, MapCoords, Polygon};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// North-up transform with square-ish pixels of `(res_x, res_y)` whose
    /// upper-left corner sits at `(origin_x, origin_y)`.
    pub fn north_up(origin_x: f64, origin_y: f64, res_x: f64, res_y: f64) -> Self {
        Self::new(res_x, 0.0, origin_x, 0.0, -res_y.abs(), origin_y)
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.a, self.b, self.c, self.d, self.e, self.f, 0.0, 0.0, 1.0)
    }

    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self::new(m[(0, 0)], m[(0, 1)], m[(0, 2)], m[(1, 0)], m[(1, 1)], m[(1, 2)])
    }

    /// Map raster coordinates to world coordinates.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn inverse(&self) -> Result<Self, RasterError> {
        let inv = self
            .to_matrix()
            .try_inverse()
            .ok_or(RasterError::SingularTransform)?;
        Ok(Self::from_matrix(&inv))
    }

    /// Ground size of one pixel, `|det|` of the linear part.
    pub fn pixel_area(&self) -> f64 {
        (self.a * self.e - self.b * self.d).abs()
    }

    pub fn map_polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        polygon.map_coords(|c| {
            let (x, y) = self.apply(c.x, c.y);
            Coord { x, y }
        })
    }

    /// World rectangle covered by a `width × height` raster, as
    /// `(min_x, min_y, max_x, max_y)`.
    pub fn footprint(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Parse an ESRI world file (`.tfw`, `.pgw`, …).
    ///
    /// World files store `a, d, b, e` followed by the *centre* of the
    /// upper-left pixel, so the corner offset is recovered here.
    pub fn from_world_file(text: &str) -> Result<Self, String> {
        let values = text
            .split_whitespace()
            .map(|tok| tok.parse::<f64>().map_err(|e| format!("{tok:?}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        let &[a, d, b, e, cx, cy] = values.as_slice() else {
            return Err(format!("expected 6 values, found {}", values.len()));
        };
        Ok(Self::new(
            a,
            b,
            cx - 0.5 * a - 0.5 * b,
            d,
            e,
            cy - 0.5 * d - 0.5 * e,
        ))
    }

    pub fn to_world_file(&self) -> String {
        let (cx, cy) = self.apply(0.5, 0.5);
        let mut out = String::new();
        for v in [self.a, self.d, self.b, self.e, cx, cy] {
            let _ = writeln!(out, "{v:.12}");
        }
        out
    }
}
