//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! Holds one probability plane (segmentation) or one crossfield component.
//! Sampling helpers come in two flavours: `sample_bilinear` takes pixel-index
//! coordinates (pixel centres at integers) and `sample_raster` takes raster
//! coordinates (pixel centres at `i + 0.5`), which is the space contours live in.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` on a length mismatch.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == w * h).then_some(Self {
            w,
            h,
            stride: w,
            data,
        })
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Number of NaN or infinite samples.
    pub fn count_non_finite(&self) -> usize {
        self.data.iter().filter(|v| !v.is_finite()).count()
    }

    /// True when no pixel exceeds `level`.
    pub fn is_below(&self, level: f32) -> bool {
        self.data.iter().all(|&v| v <= level)
    }

    /// Bilinear sample at pixel-index coordinates with edge clamping.
    #[inline]
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        match self.corners(x, y) {
            Some((v00, v10, v01, v11, tx, ty)) => {
                let top = v00 + (v10 - v00) * tx;
                let bottom = v01 + (v11 - v01) * tx;
                top + (bottom - top) * ty
            }
            None => 0.0,
        }
    }

    /// Gradient of the bilinear interpolant at pixel-index coordinates.
    #[inline]
    pub fn gradient_bilinear(&self, x: f64, y: f64) -> [f64; 2] {
        match self.corners(x, y) {
            Some((v00, v10, v01, v11, tx, ty)) => [
                (1.0 - ty) * (v10 - v00) + ty * (v11 - v01),
                (1.0 - tx) * (v01 - v00) + tx * (v11 - v10),
            ],
            None => [0.0, 0.0],
        }
    }

    /// Bilinear sample at raster coordinates (pixel centres at `i + 0.5`).
    #[inline]
    pub fn sample_raster(&self, p: [f64; 2]) -> f64 {
        self.sample_bilinear(p[0] - 0.5, p[1] - 0.5)
    }

    /// Interpolant gradient at raster coordinates.
    #[inline]
    pub fn gradient_raster(&self, p: [f64; 2]) -> [f64; 2] {
        self.gradient_bilinear(p[0] - 0.5, p[1] - 0.5)
    }

    fn corners(&self, x: f64, y: f64) -> Option<(f64, f64, f64, f64, f64, f64)> {
        if self.w == 0 || self.h == 0 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let max_x = (self.w - 1) as f64;
        let max_y = (self.h - 1) as f64;
        let xc = x.clamp(0.0, max_x);
        let yc = y.clamp(0.0, max_y);
        let x0 = xc.floor() as usize;
        let y0 = yc.floor() as usize;
        let x1 = (x0 + 1).min(self.w - 1);
        let y1 = (y0 + 1).min(self.h - 1);
        let tx = xc - x0 as f64;
        let ty = yc - y0 as f64;
        Some((
            self.get(x0, y0) as f64,
            self.get(x1, y0) as f64,
            self.get(x0, y1) as f64,
            self.get(x1, y1) as f64,
            tx,
            ty,
        ))
    }
}
