use frame_field_polygonizer::config::polygonize::{self, InputConfig};
use frame_field_polygonizer::crossfield::Crossfield;
use frame_field_polygonizer::diagnostics::RunReport;
use frame_field_polygonizer::executor::{ExecutionMode, WorkUnit};
use frame_field_polygonizer::image::io::{
    load_crossfield_image, load_probability_image, write_json_file,
};
use frame_field_polygonizer::polygonize::{Polygonizer, PolygonizerProcessor, UnitInput};
use frame_field_polygonizer::raster::profile::read_sidecars;
use std::env;
use std::error::Error;
use std::path::Path;
use std::time::Instant;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = polygonize::load_config(Path::new(&config_path))?;

    let polygonizer = Polygonizer::from_config(&config.polygonizer)?;
    let writer = config.output.build_writer()?;
    let units = config
        .inputs
        .iter()
        .map(|input| load_unit(input, &polygonizer))
        .collect::<Result<Vec<_>, _>>()?;

    let method = polygonizer.method();
    let processor =
        PolygonizerProcessor::new(polygonizer, writer, ExecutionMode::from_workers(config.workers));
    let start = Instant::now();
    let batch = processor.process_units(units, config.convert_to_world_coords);
    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    let report = RunReport::from_batch(method, batch, total_ms);

    for unit in &report.units {
        println!(
            "{}: {} polygons, {} vertices ({:.1} ms)",
            unit.name, unit.polygons, unit.vertices, unit.timings.total_ms
        );
    }
    for failure in &report.failures {
        println!("{}: FAILED: {}", failure.id, failure.message);
    }
    println!(
        "{method}: {} succeeded, {} failed in {:.1} ms",
        report.succeeded, report.failed, report.total_ms
    );

    if let Some(path) = &config.report_json {
        write_json_file(path, &report)?;
        println!("Saved report to {}", path.display());
    }
    Ok(())
}

fn load_unit(input: &InputConfig, polygonizer: &Polygonizer) -> Result<WorkUnit<UnitInput>, Box<dyn Error>> {
    let seg = load_probability_image(&input.seg)?;
    let (transform, crs) = read_sidecars(&input.seg)?;
    let crossfield = match &input.crossfield {
        Some(path) => Some(Crossfield::from_planes(load_crossfield_image(path)?)),
        None if polygonizer.requires_crossfield() => {
            return Err(format!(
                "input {} has no crossfield but the {} method needs one",
                input.seg.display(),
                polygonizer.method()
            )
            .into())
        }
        None => None,
    };
    Ok(WorkUnit::new(
        input.unit_name(),
        UnitInput {
            seg,
            crossfield,
            transform,
            crs,
        },
    ))
}

fn usage() -> String {
    "Usage: polygonize <config.json>".to_string()
}
