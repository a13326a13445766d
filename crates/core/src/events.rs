//! Normalized access-log event.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};

/// One access-log record: who requested what, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Event {
    /// Client identifier (IP address without port)
    #[validate(length(min = 1, max = 45))]
    pub key: String,
    /// Request timestamp
    pub timestamp: DateTime<Utc>,
    /// Requested path or URL
    #[validate(length(min = 1, max = 8192))]
    pub resource: String,
}

impl Event {
    /// Creates a new event.
    pub fn new(
        key: impl Into<String>,
        timestamp: DateTime<Utc>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            timestamp,
            resource: resource.into(),
        }
    }

    /// Creates an event from fractional Unix seconds.
    ///
    /// Non-finite or negative timestamps are rejected as malformed.
    pub fn from_epoch_secs(
        key: impl Into<String>,
        secs: f64,
        resource: impl Into<String>,
    ) -> Result<Self> {
        if !secs.is_finite() {
            return Err(Error::malformed(format!("non-finite timestamp {}", secs)));
        }
        if secs < 0.0 {
            return Err(Error::malformed(format!("negative timestamp {}", secs)));
        }

        let micros = (secs * 1_000_000.0).round();
        if micros > i64::MAX as f64 {
            return Err(Error::malformed(format!("timestamp {} out of range", secs)));
        }
        let micros = micros as i64;

        let timestamp = Utc
            .timestamp_opt(
                micros.div_euclid(1_000_000),
                (micros.rem_euclid(1_000_000) * 1_000) as u32,
            )
            .single()
            .ok_or_else(|| Error::malformed(format!("timestamp {} out of range", secs)))?;

        Ok(Self::new(key, timestamp, resource))
    }

    /// Returns the partition key (events of one key are sessionized together).
    pub fn partition_key(&self) -> &str {
        &self.key
    }
}
