use super::timing::TimingBreakdown;
use crate::executor::{BatchReport, UnitFailure};
use crate::polygonize::RefineReport;
use serde::Serialize;

/// What one polygonization unit produced and how long it took.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub name: String,
    pub polygons: usize,
    pub vertices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine: Option<RefineReport>,
    pub timings: TimingBreakdown,
}

/// JSON report written by the `polygonize` tool.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub method: String,
    pub succeeded: usize,
    pub failed: usize,
    pub total_ms: f64,
    pub units: Vec<UnitSummary>,
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    pub fn from_batch(method: &str, batch: BatchReport<UnitSummary>, total_ms: f64) -> Self {
        Self {
            method: method.to_string(),
            succeeded: batch.succeeded(),
            failed: batch.failed(),
            total_ms,
            units: batch.completed,
            failures: batch.failures,
        }
    }
}
