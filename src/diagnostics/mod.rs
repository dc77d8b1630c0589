//! Serialisable run diagnostics: stage timings and per-unit summaries.
pub mod report;
pub mod timing;

pub use report::{RunReport, UnitSummary};
pub use timing::{StageTiming, TimingBreakdown};
