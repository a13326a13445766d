//! Core types and algorithms for weblog sessionization.
//!
//! Events are grouped per key into sessions split by an inactivity gap,
//! measured, rolled up into engagement records, and optionally used to
//! pick the gap itself from a sweep over candidates.

pub mod config;
pub mod engagement;
pub mod error;
pub mod events;
pub mod ingest;
pub mod limits;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod schema;
pub mod session;
pub mod threshold;
pub mod timing;

pub use config::{SessionConfig, SweepConfig};
pub use engagement::{
    aggregate, aggregate_by, rank, top_n, EngagementAccumulator, EngagementRecord,
    EngagementTotals, RankBy, SortOrder,
};
pub use error::{Error, Result};
pub use events::Event;
pub use ingest::parse_log_line;
pub use metrics::{metrics_for_all, metrics_with, SessionMetrics};
pub use normalize::{NormalizationConfig, ResourceNormalizer};
pub use report::{session_records, unique_url_report, RunSummary, SessionRecord, UniqueUrlEntry};
pub use session::{sessionize, Partitions, Session, Sessionization};
pub use threshold::{
    select_optimal_gaps, sweep, sweep_partitions, SweepCurve, SweepTally, ThresholdCandidate,
};
