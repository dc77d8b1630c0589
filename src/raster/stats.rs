use crate::image::ImageF32;
use serde::Serialize;

/// Per-band mean and population standard deviation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BandStats {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

pub fn band_stats(bands: &[ImageF32]) -> BandStats {
    let mut stats = BandStats::default();
    for band in bands {
        let n = band.data.len();
        if n == 0 {
            stats.means.push(0.0);
            stats.stds.push(0.0);
            continue;
        }
        let mean = band.data.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let var = band
            .data
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        stats.means.push(mean);
        stats.stds.push(var.sqrt());
    }
    stats
}
