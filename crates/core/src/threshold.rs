//! Adaptive inactivity-gap selection.
//!
//! Each candidate gap is scored by the fraction of sessions that touch a
//! single unique resource. A gap at a local minimum of that curve splits
//! visits where users actually stop browsing.

use std::cmp::Ordering;

use chrono::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::Event;
use crate::limits::UNIQUE_URL_BUCKETS;
use crate::metrics::unique_resources;
use crate::normalize::ResourceNormalizer;
use crate::session::{session_ranges, Partitions};
use crate::timing;

/// Session tallies for one candidate gap.
///
/// Built by folding partitions independently and merged by addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepTally {
    pub session_count: u64,
    pub single_url_sessions: u64,
    /// Sessions with 1, 2, 3, 4, 5 and 6+ unique resources
    pub histogram: [u64; UNIQUE_URL_BUCKETS],
}

impl SweepTally {
    /// Counts one session with `unique` distinct resources.
    pub fn record(&mut self, unique: usize) {
        self.session_count += 1;
        if unique == 1 {
            self.single_url_sessions += 1;
        }
        let bucket = unique.clamp(1, UNIQUE_URL_BUCKETS) - 1;
        self.histogram[bucket] += 1;
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.session_count += other.session_count;
        self.single_url_sessions += other.single_url_sessions;
        for (mine, theirs) in self.histogram.iter_mut().zip(other.histogram) {
            *mine += theirs;
        }
        self
    }

    /// `single_url_sessions / session_count`, or 0 without sessions.
    pub fn single_url_fraction(&self) -> f64 {
        if self.session_count == 0 {
            0.0
        } else {
            self.single_url_sessions as f64 / self.session_count as f64
        }
    }

    /// Exact comparison of the single-URL fractions.
    fn cmp_fraction(&self, other: &Self) -> Ordering {
        let (a, b) = self.as_ratio();
        let (c, d) = other.as_ratio();
        (a * d).cmp(&(c * b))
    }

    fn as_ratio(&self) -> (u128, u128) {
        if self.session_count == 0 {
            (0, 1)
        } else {
            (
                u128::from(self.single_url_sessions),
                u128::from(self.session_count),
            )
        }
    }
}

/// One evaluated point of the sweep curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCandidate {
    #[serde(with = "timing::as_secs_f64")]
    pub gap: Duration,
    pub session_count: u64,
    pub single_url_sessions: u64,
    pub single_url_fraction: f64,
    pub unique_url_histogram: [u64; UNIQUE_URL_BUCKETS],
    pub is_local_minimum: bool,
}

impl ThresholdCandidate {
    fn new(gap: Duration, tally: &SweepTally, is_local_minimum: bool) -> Self {
        Self {
            gap,
            session_count: tally.session_count,
            single_url_sessions: tally.single_url_sessions,
            single_url_fraction: tally.single_url_fraction(),
            unique_url_histogram: tally.histogram,
            is_local_minimum,
        }
    }
}

/// Candidates in ascending gap order with local minima flagged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepCurve {
    pub candidates: Vec<ThresholdCandidate>,
}

impl SweepCurve {
    /// Builds the curve from per-gap tallies, flagging local minima.
    pub fn from_tallies(gaps: &[Duration], tallies: &[SweepTally]) -> Self {
        let minima = local_minima(tallies);
        let candidates = gaps
            .iter()
            .zip(tallies)
            .zip(minima)
            .map(|((gap, tally), is_min)| ThresholdCandidate::new(*gap, tally, is_min))
            .collect();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Local minima in ascending gap order.
    pub fn local_minima(&self) -> impl Iterator<Item = &ThresholdCandidate> {
        self.candidates.iter().filter(|c| c.is_local_minimum)
    }
}

/// Flags local minima of the single-URL fraction.
///
/// A run of equal fractions bounded on both sides by strictly higher values
/// is one minimum, flagged at its first index. The ends are never minima.
pub fn local_minima(tallies: &[SweepTally]) -> Vec<bool> {
    let n = tallies.len();
    let mut flags = vec![false; n];

    let mut i = 1;
    while i + 1 < n {
        if tallies[i - 1].cmp_fraction(&tallies[i]) != Ordering::Greater {
            i += 1;
            continue;
        }

        let mut end = i;
        while end + 1 < n && tallies[end + 1].cmp_fraction(&tallies[i]) == Ordering::Equal {
            end += 1;
        }
        if end + 1 < n && tallies[end + 1].cmp_fraction(&tallies[i]) == Ordering::Greater {
            flags[i] = true;
        }
        i = end + 1;
    }

    flags
}

/// Candidate gaps must be non-empty, positive and strictly ascending.
pub fn validate_candidates(candidate_gaps: &[Duration]) -> Result<()> {
    if candidate_gaps.is_empty() {
        return Err(Error::invalid_parameter("candidate gap list is empty"));
    }
    if let Some(gap) = candidate_gaps.iter().find(|g| **g <= Duration::zero()) {
        return Err(Error::invalid_parameter(format!(
            "candidate gaps must be > 0, got {}ms",
            gap.num_milliseconds()
        )));
    }
    if candidate_gaps.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid_parameter(
            "candidate gaps must be strictly ascending",
        ));
    }
    Ok(())
}

/// Tallies one key's sessions at `gap`.
fn tally_partition(events: &[Event], gap: Duration, normalizer: &ResourceNormalizer) -> SweepTally {
    let mut tally = SweepTally::default();
    for range in session_ranges(events, gap) {
        tally.record(unique_resources(&events[range], normalizer));
    }
    tally
}

/// Evaluates every candidate gap over already partitioned events.
pub fn sweep_partitions(
    partitions: &Partitions,
    candidate_gaps: &[Duration],
    normalizer: &ResourceNormalizer,
) -> Result<SweepCurve> {
    validate_candidates(candidate_gaps)?;

    let tallies: Vec<SweepTally> = candidate_gaps
        .par_iter()
        .map(|gap| {
            let tally = partitions
                .par_iter()
                .map(|(_, events)| tally_partition(events, *gap, normalizer))
                .reduce(SweepTally::default, SweepTally::merge);
            debug!(
                gap_secs = gap.num_seconds(),
                sessions = tally.session_count,
                single_url = tally.single_url_sessions,
                "Evaluated candidate gap"
            );
            tally
        })
        .collect();

    let curve = SweepCurve::from_tallies(candidate_gaps, &tallies);
    info!(
        candidates = curve.len(),
        minima = curve.local_minima().count(),
        keys = partitions.key_count(),
        "Threshold sweep complete"
    );
    Ok(curve)
}

/// Sessionizes `events` at every candidate gap and scores each one.
pub fn sweep(events: Vec<Event>, candidate_gaps: &[Duration]) -> Result<SweepCurve> {
    validate_candidates(candidate_gaps)?;
    sweep_partitions(
        &Partitions::new(events),
        candidate_gaps,
        &ResourceNormalizer::exact(),
    )
}

/// Local minima of a curve, or `NoLocalMinimumFound` when there are none.
pub fn optimal_gaps(curve: &SweepCurve) -> Result<Vec<ThresholdCandidate>> {
    let minima: Vec<ThresholdCandidate> = curve.local_minima().cloned().collect();
    if minima.is_empty() {
        return Err(Error::NoLocalMinimumFound {
            candidates: curve.len(),
        });
    }
    Ok(minima)
}

/// Sweeps the candidates and returns every local minimum in gap order.
pub fn select_optimal_gaps(
    events: Vec<Event>,
    candidate_gaps: &[Duration],
) -> Result<Vec<ThresholdCandidate>> {
    optimal_gaps(&sweep(events, candidate_gaps)?)
}
