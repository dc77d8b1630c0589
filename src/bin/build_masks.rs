use frame_field_polygonizer::config::mask;
use frame_field_polygonizer::mask::build_masks;
use std::env;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = mask::load_config(Path::new(&config_path))?;

    let report = build_masks(&config)?;
    for failure in &report.failures {
        println!("{}: FAILED: {}", failure.id, failure.message);
    }
    println!(
        "Saved {} dataset entries to {} ({} failed, {:.1} ms)",
        report.entries,
        report.csv_path.display(),
        report.failures.len(),
        report.total_ms
    );
    Ok(())
}

fn usage() -> String {
    "Usage: build_masks <config.json>".to_string()
}
