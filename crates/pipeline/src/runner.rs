//! End-to-end sessionization run.
//!
//! 1. Resolve the inactivity gap (configured, or swept)
//! 2. Sessionize every key
//! 3. Compute per-session metrics
//! 4. Aggregate and rank engagement
//! 5. Assemble the report

use std::time::Instant;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use session_core::{
    engagement::{rank, EngagementTotals},
    metrics_for_all,
    threshold::{optimal_gaps, sweep_partitions},
    timing, EngagementRecord, Error, Event, Partitions, RankBy, ResourceNormalizer, Result,
    RunSummary, SessionConfig, SessionRecord, SortOrder, SweepCurve, UniqueUrlEntry,
};
use telemetry::metrics;

use crate::reader::IngestOutcome;

/// Where the gap used for the run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSource {
    /// `gap_threshold_secs` as configured
    Configured,
    /// First local minimum of the sweep
    Sweep,
    /// Sweep found no minimum; configured gap used instead
    Fallback,
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub gap_threshold_secs: f64,
    pub gap_source: GapSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepCurve>,
    pub summary: RunSummary,
    pub sessions: Vec<SessionRecord>,
    pub unique_urls: Vec<UniqueUrlEntry>,
    /// Ranked per-key engagement
    pub engagement: Vec<EngagementRecord>,
}

/// Runs the analysis with a fixed configuration.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    config: SessionConfig,
    rank_by: RankBy,
}

impl PipelineRunner {
    /// Validates the configuration up front.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rank_by: RankBy::default(),
        })
    }

    /// Dimension the engagement list is ranked on (descending).
    pub fn with_rank_by(mut self, rank_by: RankBy) -> Self {
        self.rank_by = rank_by;
        self
    }

    /// Runs the CPU-bound analysis on the blocking pool.
    pub async fn run(&self, events: Vec<Event>) -> Result<AnalyticsReport> {
        let runner = self.clone();
        on_blocking_pool(move || runner.analyze(events)).await
    }

    /// Like [`run`](Self::run), with the ingest's malformed lines counted
    /// in the summary.
    pub async fn run_ingest(&self, ingest: IngestOutcome) -> Result<AnalyticsReport> {
        let runner = self.clone();
        on_blocking_pool(move || runner.analyze_ingest(ingest)).await
    }

    /// Synchronous analysis of one batch of events.
    pub fn analyze(&self, events: Vec<Event>) -> Result<AnalyticsReport> {
        self.analyze_batch(events, 0)
    }

    /// Synchronous analysis of a parsed log.
    pub fn analyze_ingest(&self, ingest: IngestOutcome) -> Result<AnalyticsReport> {
        self.analyze_batch(ingest.events, ingest.malformed)
    }

    fn analyze_batch(&self, events: Vec<Event>, malformed: usize) -> Result<AnalyticsReport> {
        let normalizer = ResourceNormalizer::new(self.config.normalization);

        let started = Instant::now();
        let partitions = Partitions::new(events);
        metrics().events_rejected.inc_by(partitions.dropped() as u64);
        metrics().keys_last_run.set(partitions.key_count() as u64);

        let (gap, gap_source, sweep) = self.resolve_gap(&partitions, &normalizer)?;
        metrics().gap_threshold_secs.set(gap.num_seconds().max(0) as u64);

        let started_sessionize = Instant::now();
        let sessionization = partitions.sessionize(gap)?;
        let session_metrics = metrics_for_all(&sessionization, &normalizer);
        metrics()
            .sessions_built
            .inc_by(sessionization.session_count() as u64);
        metrics()
            .sessionize_latency_ms
            .observe_since(started_sessionize);

        let engagement = rank(
            EngagementTotals::from_metrics(&session_metrics)
                .into_records()
                .into_values(),
            self.rank_by,
            SortOrder::Descending,
        );
        let summary =
            RunSummary::new(&sessionization, &session_metrics).with_malformed_lines(malformed);

        info!(
            gap_secs = gap.num_seconds(),
            gap_source = ?gap_source,
            keys = summary.keys,
            sessions = summary.sessions,
            page_views = summary.page_views,
            dropped = summary.dropped_records,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalyticsReport {
            gap_threshold_secs: timing::duration_secs(gap),
            gap_source,
            sweep,
            summary,
            sessions: session_core::session_records(&sessionization),
            unique_urls: session_core::unique_url_report(&session_metrics),
            engagement,
        })
    }

    /// Picks the gap, sweeping first when auto-selection is on.
    fn resolve_gap(
        &self,
        partitions: &Partitions,
        normalizer: &ResourceNormalizer,
    ) -> Result<(Duration, GapSource, Option<SweepCurve>)> {
        let configured = self.config.gap_threshold();
        if !self.config.auto_select_gap {
            return Ok((configured, GapSource::Configured, None));
        }

        let started = Instant::now();
        let candidates = self.config.sweep.candidate_gaps();
        let curve = sweep_partitions(partitions, &candidates, normalizer)?;
        metrics()
            .sweep_candidates_evaluated
            .inc_by(curve.len() as u64);
        metrics().sweep_latency_ms.observe_since(started);

        match optimal_gaps(&curve) {
            Ok(minima) => {
                let Some(best) = minima.first() else {
                    return Ok((configured, GapSource::Fallback, Some(curve)));
                };
                info!(
                    gap_secs = best.gap.num_seconds(),
                    single_url_fraction = best.single_url_fraction,
                    minima = minima.len(),
                    "Selected gap from sweep"
                );
                Ok((best.gap, GapSource::Sweep, Some(curve)))
            }
            Err(e @ Error::NoLocalMinimumFound { .. }) => {
                warn!(
                    error = %e,
                    fallback_gap_secs = configured.num_seconds(),
                    "Falling back to configured gap"
                );
                Ok((configured, GapSource::Fallback, Some(curve)))
            }
            Err(e) => Err(e),
        }
    }
}

async fn on_blocking_pool<F>(analysis: F) -> Result<AnalyticsReport>
where
    F: FnOnce() -> Result<AnalyticsReport> + Send + 'static,
{
    tokio::task::spawn_blocking(analysis)
        .await
        .map_err(|e| Error::internal(format!("analysis task failed: {}", e)))?
}
