//! Sessionization of keyed event streams.
//!
//! Events are partitioned by key, each partition is stably sorted by
//! timestamp, and a single scan cuts a new session wherever the gap to the
//! previous event exceeds the inactivity threshold. Keys never share state,
//! so partitions are processed in parallel.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::events::Event;
use crate::schema::retain_valid;

/// A maximal run of one key's events with no gap above the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owning key
    pub key: String,
    /// Events in ascending timestamp order (never empty)
    pub events: Vec<Event>,
}

impl Session {
    /// Timestamp of the first event.
    pub fn start(&self) -> DateTime<Utc> {
        self.events[0].timestamp
    }

    /// Timestamp of the last event.
    pub fn end(&self) -> DateTime<Utc> {
        self.events[self.events.len() - 1].timestamp
    }

    /// Number of events (page views).
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Resources in visit order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.resource.as_str())
    }
}

/// Output of one sessionization pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sessionization {
    /// Sessions per key, in chronological order
    pub sessions: BTreeMap<String, Vec<Session>>,
    /// Records dropped as malformed
    pub dropped: usize,
}

impl Sessionization {
    pub fn key_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }

    pub fn event_count(&self) -> usize {
        self.iter().map(Session::len).sum()
    }

    /// Iterates all sessions, ordered by key then start time.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().flatten()
    }

    /// Sessions of a single key (empty if the key has no events).
    pub fn for_key(&self, key: &str) -> &[Session] {
        self.sessions.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Valid events grouped by key and sorted by timestamp.
///
/// Built once and reusable across several gap thresholds.
#[derive(Debug, Clone, Default)]
pub struct Partitions {
    by_key: BTreeMap<String, Vec<Event>>,
    dropped: usize,
}

impl Partitions {
    /// Validates, partitions and sorts events.
    ///
    /// Invalid events are dropped and counted. Ties on timestamp keep their
    /// input order.
    pub fn new(events: Vec<Event>) -> Self {
        let (valid, dropped) = retain_valid(events);
        if dropped > 0 {
            warn!(dropped = dropped, "Dropped malformed events before sessionization");
        }

        let mut by_key: BTreeMap<String, Vec<Event>> = BTreeMap::new();
        for event in valid {
            by_key
                .entry(event.partition_key().to_string())
                .or_default()
                .push(event);
        }

        by_key
            .par_iter_mut()
            .for_each(|(_, events)| events.sort_by_key(|e| e.timestamp));

        Self { by_key, dropped }
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    /// Parallel view over the partitions.
    pub fn par_iter(&self) -> impl ParallelIterator<Item = (&str, &[Event])> {
        self.by_key
            .par_iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Cuts every partition into sessions.
    pub fn sessionize(&self, gap_threshold: Duration) -> Result<Sessionization> {
        validate_gap(gap_threshold)?;

        let sessions: BTreeMap<String, Vec<Session>> = self
            .by_key
            .par_iter()
            .map(|(key, events)| {
                let sessions = session_ranges(events, gap_threshold)
                    .into_iter()
                    .map(|range| Session {
                        key: key.clone(),
                        events: events[range].to_vec(),
                    })
                    .collect();
                (key.clone(), sessions)
            })
            .collect();

        let result = Sessionization {
            sessions,
            dropped: self.dropped,
        };

        debug!(
            gap_secs = gap_threshold.num_seconds(),
            keys = result.key_count(),
            sessions = result.session_count(),
            dropped = result.dropped,
            "Sessionization complete"
        );

        Ok(result)
    }
}

/// Rejects non-positive inactivity gaps.
pub fn validate_gap(gap_threshold: Duration) -> Result<()> {
    if gap_threshold <= Duration::zero() {
        return Err(Error::invalid_parameter(format!(
            "gap_threshold must be > 0, got {}ms",
            gap_threshold.num_milliseconds()
        )));
    }
    Ok(())
}

/// Index ranges of the sessions within one key's sorted events.
///
/// A new range starts wherever the gap to the previous event is strictly
/// greater than `gap_threshold`.
pub fn session_ranges(events: &[Event], gap_threshold: Duration) -> Vec<Range<usize>> {
    if events.is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..events.len() {
        if events[i].timestamp - events[i - 1].timestamp > gap_threshold {
            ranges.push(start..i);
            start = i;
        }
    }
    ranges.push(start..events.len());
    ranges
}

/// Groups events by key into time-ordered sessions.
///
/// Fails only on a non-positive threshold; invalid events are dropped and
/// counted in [`Sessionization::dropped`].
pub fn sessionize(events: Vec<Event>, gap_threshold: Duration) -> Result<Sessionization> {
    validate_gap(gap_threshold)?;
    Partitions::new(events).sessionize(gap_threshold)
}
