use frame_field_polygonizer::crossfield::Crossfield;
use frame_field_polygonizer::error::WriteError;
use frame_field_polygonizer::image::ImageF32;
use frame_field_polygonizer::polygonize::PolygonSet;
use frame_field_polygonizer::writer::DataWriter;
use std::f64::consts::FRAC_PI_2;
use std::sync::Mutex;

/// Probability plane with `1.0` on the pixel rectangle `[x0, x1) × [y0, y1)`.
pub fn rect_mask(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> ImageF32 {
    let mut img = ImageF32::new(width, height);
    for y in y0..y1 {
        for x in x0..x1 {
            img.set(x, y, 1.0);
        }
    }
    img
}

/// Square building of side `side` centred in a `size × size` map.
pub fn square_mask(size: usize, side: usize) -> ImageF32 {
    let start = (size - side) / 2;
    rect_mask(size, size, start, start, start + side, start + side)
}

/// Crossfield aligned with the image axes.
pub fn axis_crossfield(width: usize, height: usize) -> Crossfield {
    Crossfield::uniform(width, height, 0.0, FRAC_PI_2)
}

/// Sink that keeps every set it receives.
#[derive(Default)]
pub struct MemoryWriter {
    pub sets: Mutex<Vec<PolygonSet>>,
}

impl MemoryWriter {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sets.lock().unwrap().iter().map(|s| s.name.clone()).collect();
        names.sort();
        names
    }
}

impl DataWriter<PolygonSet> for MemoryWriter {
    fn write_data(&self, data: PolygonSet) -> Result<(), WriteError> {
        self.sets.lock().unwrap().push(data);
        Ok(())
    }
}
