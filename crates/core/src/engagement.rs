//! Per-key engagement rollups and rankings.
//!
//! Aggregation is a fold over per-key accumulators merged by addition, so
//! any partitioning of the input and any merge order give the same totals.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::metrics::SessionMetrics;
use crate::timing;

/// Running sums for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementAccumulator {
    pub total_duration: Duration,
    pub session_count: u64,
    pub total_page_views: u64,
    pub total_unique_visits: u64,
}

impl Default for EngagementAccumulator {
    fn default() -> Self {
        Self {
            total_duration: Duration::zero(),
            session_count: 0,
            total_page_views: 0,
            total_unique_visits: 0,
        }
    }
}

impl EngagementAccumulator {
    /// Accumulator holding a single session.
    pub fn from_metrics(m: &SessionMetrics) -> Self {
        Self {
            total_duration: m.duration,
            session_count: 1,
            total_page_views: m.event_count as u64,
            total_unique_visits: m.unique_resources as u64,
        }
    }

    /// Adds another accumulator's sums into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total_duration = self.total_duration + other.total_duration;
        self.session_count += other.session_count;
        self.total_page_views += other.total_page_views;
        self.total_unique_visits += other.total_unique_visits;
    }

    /// Finalizes the sums into a record with derived averages.
    pub fn into_record(self, key: String) -> EngagementRecord {
        let n = self.session_count;
        let avg = |total: u64| if n == 0 { 0.0 } else { total as f64 / n as f64 };

        let avg_session_time = timing::average(self.total_duration, n);

        EngagementRecord {
            key,
            total_duration: self.total_duration,
            session_count: n,
            total_page_views: self.total_page_views,
            total_unique_visits: self.total_unique_visits,
            avg_page_views: avg(self.total_page_views),
            avg_unique_visits: avg(self.total_unique_visits),
            avg_session_time,
        }
    }
}

/// Engagement rollup for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub key: String,
    /// Sum of session durations
    #[serde(with = "timing::as_secs_f64")]
    pub total_duration: Duration,
    pub session_count: u64,
    /// Sum of events over all sessions
    pub total_page_views: u64,
    /// Sum of per-session unique resource counts
    pub total_unique_visits: u64,
    pub avg_page_views: f64,
    pub avg_unique_visits: f64,
    /// `total_duration / session_count`, zero without sessions
    #[serde(with = "timing::as_secs_f64")]
    pub avg_session_time: Duration,
}

/// Per-key accumulators for a batch of session metrics.
///
/// Totals built from disjoint sub-batches can be merged in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementTotals {
    by_key: HashMap<String, EngagementAccumulator>,
}

impl EngagementTotals {
    /// Folds metrics in parallel, keyed by `SessionMetrics::key`.
    pub fn from_metrics(metrics: &[SessionMetrics]) -> Self {
        Self::from_metrics_by(metrics, |m| m.key.as_str())
    }

    /// Folds metrics in parallel using an explicit key extractor.
    pub fn from_metrics_by<F>(metrics: &[SessionMetrics], key_of: F) -> Self
    where
        F: Fn(&SessionMetrics) -> &str + Sync,
    {
        metrics
            .par_iter()
            .fold(Self::default, |mut totals, m| {
                totals.add(key_of(m), &EngagementAccumulator::from_metrics(m));
                totals
            })
            .reduce(Self::default, Self::merge)
    }

    fn add(&mut self, key: &str, acc: &EngagementAccumulator) {
        match self.by_key.get_mut(key) {
            Some(existing) => existing.merge(acc),
            None => {
                self.by_key.insert(key.to_string(), *acc);
            }
        }
    }

    /// Combines two totals; associative and commutative.
    pub fn merge(mut self, other: Self) -> Self {
        for (key, acc) in &other.by_key {
            self.add(key, acc);
        }
        self
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn get(&self, key: &str) -> Option<&EngagementAccumulator> {
        self.by_key.get(key)
    }

    pub fn into_records(self) -> BTreeMap<String, EngagementRecord> {
        self.by_key
            .into_iter()
            .map(|(key, acc)| (key.clone(), acc.into_record(key)))
            .collect()
    }
}

/// Rolls session metrics up to one record per key.
pub fn aggregate(metrics: &[SessionMetrics]) -> BTreeMap<String, EngagementRecord> {
    EngagementTotals::from_metrics(metrics).into_records()
}

/// Like [`aggregate`], grouping by `key_of` instead of the metrics' own key.
pub fn aggregate_by<F>(metrics: &[SessionMetrics], key_of: F) -> BTreeMap<String, EngagementRecord>
where
    F: Fn(&SessionMetrics) -> &str + Sync,
{
    EngagementTotals::from_metrics_by(metrics, key_of).into_records()
}

/// Ranking dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    #[default]
    TotalDuration,
    TotalUniqueVisits,
    TotalPageViews,
    AvgPageViews,
    AvgSessionTime,
    SessionCount,
}

impl RankBy {
    /// Compares two records on this dimension only.
    fn compare(&self, a: &EngagementRecord, b: &EngagementRecord) -> Ordering {
        match self {
            Self::TotalDuration => a.total_duration.cmp(&b.total_duration),
            Self::TotalUniqueVisits => a.total_unique_visits.cmp(&b.total_unique_visits),
            Self::TotalPageViews => a.total_page_views.cmp(&b.total_page_views),
            Self::AvgPageViews => a.avg_page_views.total_cmp(&b.avg_page_views),
            Self::AvgSessionTime => a.avg_session_time.cmp(&b.avg_session_time),
            Self::SessionCount => a.session_count.cmp(&b.session_count),
        }
    }
}

/// Sort direction for rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

/// Orders records by `by`; ties always fall back to key ascending.
pub fn rank<I>(records: I, by: RankBy, order: SortOrder) -> Vec<EngagementRecord>
where
    I: IntoIterator<Item = EngagementRecord>,
{
    let mut ranked: Vec<EngagementRecord> = records.into_iter().collect();
    ranked.sort_by(|a, b| {
        let primary = match order {
            SortOrder::Descending => by.compare(b, a),
            SortOrder::Ascending => by.compare(a, b),
        };
        primary.then_with(|| a.key.cmp(&b.key))
    });
    ranked
}

/// The `n` highest-ranked records on `by`.
pub fn top_n<I>(records: I, by: RankBy, n: usize) -> Vec<EngagementRecord>
where
    I: IntoIterator<Item = EngagementRecord>,
{
    let mut ranked = rank(records, by, SortOrder::Descending);
    ranked.truncate(n);
    ranked
}
