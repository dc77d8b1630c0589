//! Dataset catalog rows and their CSV encoding.
use crate::error::WriteError;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const CSV_HEADER: &str =
    "image,width,height,polygon_mask,boundary_mask,vertex_mask,bands_means,bands_stds";

/// One image of a training dataset together with its masks and band statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DatasetEntry {
    pub image: String,
    pub width: usize,
    pub height: usize,
    pub polygon_mask: Option<String>,
    pub boundary_mask: Option<String>,
    pub vertex_mask: Option<String>,
    pub bands_means: Vec<f64>,
    pub bands_stds: Vec<f64>,
}

impl DatasetEntry {
    /// Row in [`CSV_HEADER`] column order. Missing masks are empty cells,
    /// band statistics are bracketed lists.
    pub fn to_csv_row(&self) -> String {
        let cells = [
            self.image.clone(),
            self.width.to_string(),
            self.height.to_string(),
            self.polygon_mask.clone().unwrap_or_default(),
            self.boundary_mask.clone().unwrap_or_default(),
            self.vertex_mask.clone().unwrap_or_default(),
            format_list(&self.bands_means),
            format_list(&self.bands_stds),
        ];
        cells
            .iter()
            .map(|c| escape_cell(c))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Write `entries` to `path`, header first.
pub fn write_dataset_csv(path: &Path, entries: &[DatasetEntry]) -> Result<(), WriteError> {
    let mut out = String::with_capacity(64 * (entries.len() + 1));
    let _ = writeln!(out, "{CSV_HEADER}");
    for entry in entries {
        let _ = writeln!(out, "{}", entry.to_csv_row());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
    }
    fs::write(path, out).map_err(|e| WriteError::io(path, e))
}

fn format_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
    format!("[{}]", items.join(", "))
}

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
