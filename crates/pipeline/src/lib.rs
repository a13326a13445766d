//! Batch pipeline: read access logs, sessionize, report.

pub mod reader;
pub mod runner;

pub use reader::{parse_lines, read_log_file, IngestOutcome};
pub use runner::{AnalyticsReport, GapSource, PipelineRunner};
