//! Field limits and run defaults for the sessionization engine.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Event Field Limits (chars) ===

/// Client key max length (IPv6 = 45 chars).
pub const MAX_KEY_LEN: usize = 45;

/// Requested resource max length.
/// Access logs keep the full request URL including query strings.
pub const MAX_RESOURCE_LEN: usize = 8192;

// === Session Defaults ===

/// Default inactivity gap before a new session starts (15 minutes).
pub const DEFAULT_GAP_THRESHOLD_SECS: u64 = 15 * 60;

/// First candidate gap of the default sweep (1 minute).
pub const DEFAULT_SWEEP_START_SECS: u64 = 60;

/// Last candidate gap of the default sweep (39 minutes).
pub const DEFAULT_SWEEP_END_SECS: u64 = 39 * 60;

/// Step between candidate gaps of the default sweep (1 minute).
pub const DEFAULT_SWEEP_STEP_SECS: u64 = 60;

/// Most candidate gaps a single sweep may evaluate.
/// Each candidate re-sessionizes every key.
pub const MAX_SWEEP_CANDIDATES: usize = 10_000;

// === Sweep Histogram ===

/// Number of unique-URL buckets tallied per candidate gap: 1, 2, 3, 4, 5 and 6+.
pub const UNIQUE_URL_BUCKETS: usize = 6;
