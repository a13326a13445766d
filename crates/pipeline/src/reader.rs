//! Access-log reading.
//!
//! Unparseable lines are counted and skipped; only I/O failures abort.

use std::path::Path;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use session_core::{parse_log_line, Event, Result};
use telemetry::metrics;

/// Parsed events plus the number of lines that were rejected.
#[derive(Debug, Default, Clone)]
pub struct IngestOutcome {
    pub events: Vec<Event>,
    pub malformed: usize,
    /// Non-blank lines seen
    pub lines: usize,
}

impl IngestOutcome {
    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.lines += 1;

        match parse_log_line(line) {
            Ok(event) => self.events.push(event),
            Err(e) => {
                self.malformed += 1;
                debug!(line = self.lines, error = %e, "Skipping malformed log line");
            }
        }
    }

    fn record_metrics(&self) {
        metrics().lines_read.inc_by(self.lines as u64);
        metrics().events_parsed.inc_by(self.events.len() as u64);
        metrics().malformed_lines.inc_by(self.malformed as u64);

        if self.malformed > 0 {
            warn!(
                malformed = self.malformed,
                lines = self.lines,
                "Dropped malformed log lines"
            );
        }
    }
}

/// Parses in-memory log lines. Blank lines are ignored.
pub fn parse_lines<'a, I>(lines: I) -> IngestOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let mut outcome = IngestOutcome::default();
    for line in lines {
        outcome.push_line(line);
    }
    outcome.record_metrics();
    outcome
}

/// Reads and parses an access-log file line by line.
pub async fn read_log_file(path: impl AsRef<Path>) -> Result<IngestOutcome> {
    let path = path.as_ref();
    let started = Instant::now();

    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut outcome = IngestOutcome::default();
    while let Some(line) = lines.next_line().await? {
        outcome.push_line(&line);
    }
    outcome.record_metrics();
    metrics().ingest_latency_ms.observe_since(started);

    info!(
        path = %path.display(),
        lines = outcome.lines,
        events = outcome.events.len(),
        malformed = outcome.malformed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Log file ingested"
    );

    Ok(outcome)
}
