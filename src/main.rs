use frame_field_polygonizer::image::ImageF32;
use frame_field_polygonizer::{Polygonizer, PolygonizerConfig};

fn main() {
    // Demo stub: polygonizes a synthetic 50×50 square in a 300×300 map
    let (w, h) = (300usize, 300usize);
    let mut seg = ImageF32::new(w, h);
    for y in 75..125 {
        for x in 75..125 {
            seg.set(x, y, 1.0);
        }
    }

    let polygonizer = match Polygonizer::from_config(&PolygonizerConfig::default()) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    match polygonizer.polygonize(&seg, None) {
        Ok(out) => println!(
            "polygons={} latency_ms={:.3}",
            out.polygons.len(),
            out.timings.total_ms
        ),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
