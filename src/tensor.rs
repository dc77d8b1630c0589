//! Batched prediction tensors handed over by the model.
//!
//! Both tensors are dense `(batch, channel, height, width)` row-major `f32`
//! arrays. They are produced once per inference call and split into owned
//! per-element planes when work units are built.
use crate::crossfield::Crossfield;
use crate::error::PolygonizeError;
use crate::image::ImageF32;

#[derive(Clone, Debug)]
struct Tensor4 {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor4 {
    fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, PolygonizeError> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(PolygonizeError::InvalidTensor {
                shape,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    fn from_planes(planes: Vec<Vec<ImageF32>>) -> Result<Self, PolygonizeError> {
        let batch = planes.len();
        let channels = planes.first().map_or(0, Vec::len);
        let (h, w) = planes
            .first()
            .and_then(|p| p.first())
            .map_or((0, 0), |img| (img.h, img.w));
        let shape = [batch, channels, h, w];
        let mut data = Vec::with_capacity(batch * channels * h * w);
        for element in &planes {
            if element.len() != channels {
                return Err(PolygonizeError::InvalidTensor {
                    shape,
                    actual: element.len() * h * w,
                });
            }
            for plane in element {
                if plane.w != w || plane.h != h {
                    return Err(PolygonizeError::InvalidTensor {
                        shape,
                        actual: plane.w * plane.h,
                    });
                }
                data.extend_from_slice(&plane.data);
            }
        }
        Self::new(shape, data)
    }

    fn plane(&self, b: usize, c: usize) -> ImageF32 {
        let [_, channels, h, w] = self.shape;
        let start = (b * channels + c) * h * w;
        ImageF32 {
            w,
            h,
            stride: w,
            data: self.data[start..start + h * w].to_vec(),
        }
    }
}

/// Per-pixel class probabilities, `(batch, channel, height, width)`.
///
/// Channel 0 holds the building-interior probability consumed by the
/// polygonizers.
#[derive(Clone, Debug)]
pub struct SegmentationBatch {
    inner: Tensor4,
}

impl SegmentationBatch {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, PolygonizeError> {
        Ok(Self {
            inner: Tensor4::new(shape, data)?,
        })
    }

    /// Build a single-channel batch from one plane per element.
    pub fn from_planes(planes: Vec<ImageF32>) -> Result<Self, PolygonizeError> {
        Ok(Self {
            inner: Tensor4::from_planes(planes.into_iter().map(|p| vec![p]).collect())?,
        })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.inner.shape
    }

    pub fn batch_size(&self) -> usize {
        self.inner.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.inner.shape[1]
    }

    /// Spatial size as `(height, width)`.
    pub fn spatial(&self) -> (usize, usize) {
        (self.inner.shape[2], self.inner.shape[3])
    }

    /// Copy out one channel of one batch element.
    pub fn plane(&self, b: usize, c: usize) -> ImageF32 {
        self.inner.plane(b, c)
    }

    /// Interior probability plane of element `b`.
    pub fn interior(&self, b: usize) -> ImageF32 {
        self.plane(b, 0)
    }
}

/// Frame-field coefficients, `(batch, 4, height, width)` laid out as
/// `[Re c0, Im c0, Re c2, Im c2]`.
#[derive(Clone, Debug)]
pub struct CrossfieldBatch {
    inner: Tensor4,
}

impl CrossfieldBatch {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, PolygonizeError> {
        Ok(Self {
            inner: Tensor4::new(shape, data)?,
        })
    }

    pub fn from_fields(fields: Vec<Crossfield>) -> Result<Self, PolygonizeError> {
        Ok(Self {
            inner: Tensor4::from_planes(
                fields.into_iter().map(|f| f.into_planes().to_vec()).collect(),
            )?,
        })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.inner.shape
    }

    pub fn batch_size(&self) -> usize {
        self.inner.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.inner.shape[1]
    }

    pub fn spatial(&self) -> (usize, usize) {
        (self.inner.shape[2], self.inner.shape[3])
    }

    /// Crossfield of element `b`. Only valid once the channel count was checked.
    pub fn element(&self, b: usize) -> Crossfield {
        Crossfield::from_planes([
            self.inner.plane(b, 0),
            self.inner.plane(b, 1),
            self.inner.plane(b, 2),
            self.inner.plane(b, 3),
        ])
    }
}

/// Model output for one inference call.
#[derive(Clone, Debug)]
pub struct Prediction {
    pub seg: SegmentationBatch,
    pub crossfield: Option<CrossfieldBatch>,
}

impl Prediction {
    pub fn new(seg: SegmentationBatch, crossfield: Option<CrossfieldBatch>) -> Self {
        Self { seg, crossfield }
    }

    /// Check that the crossfield, when present, is aligned with the
    /// segmentation: four channels, same batch size and spatial dims.
    pub fn validate(&self) -> Result<(), PolygonizeError> {
        let Some(cf) = &self.crossfield else {
            return Ok(());
        };
        if cf.channels() != 4 {
            return Err(PolygonizeError::InvalidCrossfieldChannels(cf.channels()));
        }
        if cf.batch_size() != self.seg.batch_size() || cf.spatial() != self.seg.spatial() {
            return Err(PolygonizeError::ShapeMismatch {
                seg: self.seg.shape(),
                crossfield: cf.shape(),
            });
        }
        Ok(())
    }
}
