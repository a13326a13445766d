//! Typed report rows. Writing them out is the caller's concern.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::SessionMetrics;
use crate::session::{Session, Sessionization};
use crate::timing;

/// One session as emitted in the per-session report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub key: String,
    pub inter_event_durations_secs: Vec<f64>,
    pub resources: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            key: session.key.clone(),
            inter_event_durations_secs: session
                .events
                .windows(2)
                .map(|pair| timing::duration_secs(pair[1].timestamp - pair[0].timestamp))
                .collect(),
            resources: session.resources().map(str::to_string).collect(),
            timestamps: session.events.iter().map(|e| e.timestamp).collect(),
        }
    }
}

/// Records for every session, ordered by key then start.
pub fn session_records(sessionization: &Sessionization) -> Vec<SessionRecord> {
    sessionization.iter().map(SessionRecord::from_session).collect()
}

/// Unique resource count of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueUrlEntry {
    pub key: String,
    pub session_start: DateTime<Utc>,
    pub unique_resources: usize,
}

/// Unique-URL rows sorted by count descending, then key, then start.
pub fn unique_url_report(metrics: &[SessionMetrics]) -> Vec<UniqueUrlEntry> {
    let mut rows: Vec<UniqueUrlEntry> = metrics
        .iter()
        .map(|m| UniqueUrlEntry {
            key: m.key.clone(),
            session_start: m.start,
            unique_resources: m.unique_resources,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.unique_resources
            .cmp(&a.unique_resources)
            .then_with(|| a.key.cmp(&b.key))
            .then_with(|| a.session_start.cmp(&b.session_start))
    });
    rows
}

/// Totals for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub keys: usize,
    pub sessions: usize,
    pub page_views: usize,
    #[serde(with = "timing::as_secs_f64")]
    pub total_session_time: Duration,
    #[serde(with = "timing::as_secs_f64")]
    pub avg_session_time: Duration,
    /// Input lines that never became events
    #[serde(default)]
    pub malformed_lines: usize,
    /// Malformed lines plus events rejected by validation
    pub dropped_records: usize,
}

impl RunSummary {
    pub fn new(sessionization: &Sessionization, metrics: &[SessionMetrics]) -> Self {
        let total_session_time = metrics
            .iter()
            .fold(Duration::zero(), |acc, m| acc + m.duration);
        let avg_session_time = timing::average(total_session_time, metrics.len() as u64);

        Self {
            keys: sessionization.key_count(),
            sessions: metrics.len(),
            page_views: metrics.iter().map(|m| m.event_count).sum(),
            total_session_time,
            avg_session_time,
            malformed_lines: 0,
            dropped_records: sessionization.dropped,
        }
    }

    /// Counts lines rejected before event validation as dropped too.
    pub fn with_malformed_lines(mut self, malformed: usize) -> Self {
        self.malformed_lines = malformed;
        self.dropped_records = self.dropped_records.saturating_add(malformed);
        self
    }
}
