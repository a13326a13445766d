//! Sessionization parameters.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::{
    DEFAULT_GAP_THRESHOLD_SECS, DEFAULT_SWEEP_END_SECS, DEFAULT_SWEEP_START_SECS,
    DEFAULT_SWEEP_STEP_SECS, MAX_SWEEP_CANDIDATES,
};
use crate::normalize::NormalizationConfig;
use crate::timing::secs;

/// Inclusive range of candidate gaps to sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_start")]
    pub start_secs: u64,
    #[serde(default = "default_sweep_end")]
    pub end_secs: u64,
    #[serde(default = "default_sweep_step")]
    pub step_secs: u64,
}

fn default_sweep_start() -> u64 {
    DEFAULT_SWEEP_START_SECS
}

fn default_sweep_end() -> u64 {
    DEFAULT_SWEEP_END_SECS
}

fn default_sweep_step() -> u64 {
    DEFAULT_SWEEP_STEP_SECS
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_secs: default_sweep_start(),
            end_secs: default_sweep_end(),
            step_secs: default_sweep_step(),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_secs == 0 {
            return Err(Error::invalid_parameter("sweep.start_secs must be > 0"));
        }
        if self.step_secs == 0 {
            return Err(Error::invalid_parameter("sweep.step_secs must be > 0"));
        }
        if self.end_secs < self.start_secs {
            return Err(Error::invalid_parameter(format!(
                "sweep.end_secs ({}) must be >= sweep.start_secs ({})",
                self.end_secs, self.start_secs
            )));
        }
        let count = (self.end_secs - self.start_secs) / self.step_secs + 1;
        if count > MAX_SWEEP_CANDIDATES as u64 {
            return Err(Error::invalid_parameter(format!(
                "sweep covers {} candidate gaps, at most {} allowed",
                count, MAX_SWEEP_CANDIDATES
            )));
        }
        Ok(())
    }

    /// `start, start + step, ...` up to and including `end`, capped at
    /// `MAX_SWEEP_CANDIDATES` entries.
    pub fn candidate_gaps(&self) -> Vec<Duration> {
        if self.step_secs == 0 || self.end_secs < self.start_secs {
            return Vec::new();
        }
        (self.start_secs..=self.end_secs)
            .step_by(usize::try_from(self.step_secs).unwrap_or(usize::MAX))
            .take(MAX_SWEEP_CANDIDATES)
            .map(secs)
            .collect()
    }
}

/// Parameters of a sessionization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity gap used when no sweep runs or the sweep finds no minimum
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold_secs: u64,
    /// Pick the gap from the first local minimum of the sweep
    #[serde(default)]
    pub auto_select_gap: bool,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
}

fn default_gap_threshold() -> u64 {
    DEFAULT_GAP_THRESHOLD_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gap_threshold_secs: default_gap_threshold(),
            auto_select_gap: false,
            sweep: SweepConfig::default(),
            normalization: NormalizationConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Checks parameters before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.gap_threshold_secs == 0 {
            return Err(Error::invalid_parameter("gap_threshold_secs must be > 0"));
        }
        if self.auto_select_gap {
            self.sweep.validate()?;
        }
        Ok(())
    }

    pub fn gap_threshold(&self) -> Duration {
        secs(self.gap_threshold_secs)
    }
}
