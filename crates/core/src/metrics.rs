//! Per-session metrics: duration, unique resources, inter-event gaps.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::normalize::ResourceNormalizer;
use crate::session::{Session, Sessionization};
use crate::timing;

/// Metrics derived from one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub key: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Number of events (page views)
    pub event_count: usize,
    /// Last timestamp minus first, zero for a single event
    #[serde(with = "timing::as_secs_f64")]
    pub duration: Duration,
    /// Distinct resources after normalization
    pub unique_resources: usize,
    /// Successive gaps, `event_count - 1` entries
    #[serde(with = "timing::vec_as_secs_f64")]
    pub inter_event_durations: Vec<Duration>,
}

impl SessionMetrics {
    /// Computes metrics for a sorted, non-empty run of one key's events.
    pub fn from_events(key: &str, events: &[Event], normalizer: &ResourceNormalizer) -> Self {
        let start = events[0].timestamp;
        let end = events[events.len() - 1].timestamp;

        Self {
            key: key.to_string(),
            start,
            end,
            event_count: events.len(),
            duration: end - start,
            unique_resources: unique_resources(events, normalizer),
            inter_event_durations: inter_event_durations(events),
        }
    }
}

/// Computes metrics with exact resource matching.
pub fn metrics(session: &Session) -> SessionMetrics {
    metrics_with(session, &ResourceNormalizer::exact())
}

/// Computes metrics with a custom resource normalizer.
pub fn metrics_with(session: &Session, normalizer: &ResourceNormalizer) -> SessionMetrics {
    SessionMetrics::from_events(&session.key, &session.events, normalizer)
}

/// Computes metrics for every session of a run, in key then start order.
pub fn metrics_for_all(
    sessionization: &Sessionization,
    normalizer: &ResourceNormalizer,
) -> Vec<SessionMetrics> {
    sessionization
        .sessions
        .par_iter()
        .flat_map_iter(|(_, sessions)| sessions.iter().map(|s| metrics_with(s, normalizer)))
        .collect()
}

/// Size of the set of distinct resources.
pub fn unique_resources(events: &[Event], normalizer: &ResourceNormalizer) -> usize {
    events
        .iter()
        .map(|e| normalizer.normalize(&e.resource))
        .collect::<HashSet<_>>()
        .len()
}

/// Gaps between consecutive events.
pub fn inter_event_durations(events: &[Event]) -> Vec<Duration> {
    events
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect()
}
