//! Frame field ("crossfield") of one batch element.
//!
//! Each pixel stores the coefficients of `f(z) = z⁴ + c2·z² + c0`, whose
//! roots `±u, ±v` are the two expected edge directions. A unit direction
//! `z` is aligned with the field when `|f(z)|²` vanishes.
use crate::image::ImageF32;
use nalgebra::Complex;

#[derive(Clone, Debug, PartialEq)]
pub struct Crossfield {
    c0_re: ImageF32,
    c0_im: ImageF32,
    c2_re: ImageF32,
    c2_im: ImageF32,
}

impl Crossfield {
    /// Assemble from `[Re c0, Im c0, Re c2, Im c2]` planes of equal size.
    pub fn from_planes(planes: [ImageF32; 4]) -> Self {
        let [c0_re, c0_im, c2_re, c2_im] = planes;
        Self {
            c0_re,
            c0_im,
            c2_re,
            c2_im,
        }
    }

    pub fn into_planes(self) -> [ImageF32; 4] {
        [self.c0_re, self.c0_im, self.c2_re, self.c2_im]
    }

    /// Field with the same pair of directions (angles in radians) everywhere.
    pub fn uniform(w: usize, h: usize, u_angle: f64, v_angle: f64) -> Self {
        let (c0, c2) = coefficients_from_directions(u_angle, v_angle);
        let fill = |v: f64| ImageF32 {
            w,
            h,
            stride: w,
            data: vec![v as f32; w * h],
        };
        Self {
            c0_re: fill(c0.re),
            c0_im: fill(c0.im),
            c2_re: fill(c2.re),
            c2_im: fill(c2.im),
        }
    }

    /// Orthogonal field built from a per-pixel edge angle, `v = u + π/2`.
    pub fn from_angle_field(angles: &ImageF32) -> Self {
        let mut planes = [
            ImageF32::new(angles.w, angles.h),
            ImageF32::new(angles.w, angles.h),
            ImageF32::new(angles.w, angles.h),
            ImageF32::new(angles.w, angles.h),
        ];
        for y in 0..angles.h {
            for x in 0..angles.w {
                let u = angles.get(x, y) as f64;
                let (c0, c2) = coefficients_from_directions(u, u + std::f64::consts::FRAC_PI_2);
                planes[0].set(x, y, c0.re as f32);
                planes[1].set(x, y, c0.im as f32);
                planes[2].set(x, y, c2.re as f32);
                planes[3].set(x, y, c2.im as f32);
            }
        }
        Self::from_planes(planes)
    }

    pub fn width(&self) -> usize {
        self.c0_re.w
    }

    pub fn height(&self) -> usize {
        self.c0_re.h
    }

    /// `(c0, c2)` bilinearly sampled at raster coordinates.
    pub fn coefficients_at(&self, p: [f64; 2]) -> (Complex<f64>, Complex<f64>) {
        (
            Complex::new(self.c0_re.sample_raster(p), self.c0_im.sample_raster(p)),
            Complex::new(self.c2_re.sample_raster(p), self.c2_im.sample_raster(p)),
        )
    }

    /// `|f(ẑ)|²` for the unit vector along `dir`, sampled at `p`.
    pub fn alignment_energy(&self, p: [f64; 2], dir: [f64; 2]) -> f64 {
        let norm = (dir[0] * dir[0] + dir[1] * dir[1]).sqrt();
        if norm < 1e-12 {
            return 0.0;
        }
        let z = Complex::new(dir[0] / norm, dir[1] / norm);
        let (c0, c2) = self.coefficients_at(p);
        frame_polynomial(z, c0, c2).norm_sqr()
    }
}

/// `c0 = u²v²`, `c2 = −(u² + v²)` for unit directions `u`, `v`.
pub fn coefficients_from_directions(u_angle: f64, v_angle: f64) -> (Complex<f64>, Complex<f64>) {
    let u = Complex::new(u_angle.cos(), u_angle.sin());
    let v = Complex::new(v_angle.cos(), v_angle.sin());
    let u2 = u * u;
    let v2 = v * v;
    (u2 * v2, -(u2 + v2))
}

#[inline]
fn frame_polynomial(z: Complex<f64>, c0: Complex<f64>, c2: Complex<f64>) -> Complex<f64> {
    let z2 = z * z;
    z2 * z2 + c2 * z2 + c0
}
