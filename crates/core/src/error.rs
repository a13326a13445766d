//! Unified error types for the sessionization engine.
//!
//! Error codes:
//! - PARAM_001: Invalid run parameter (fatal, aborts before processing)
//! - EVENT_001: Malformed event (recovered, record dropped and counted)
//! - SWEEP_001: No local minimum in the sweep curve (reported, caller falls back)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Parameter error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamErrorCode {
    /// PARAM_001: Parameter outside its valid range
    Invalid,
}

impl ParamErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid => "PARAM_001",
        }
    }
}

/// Event error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventErrorCode {
    /// EVENT_001: Record could not be parsed or failed validation
    Malformed,
}

impl EventErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "EVENT_001",
        }
    }
}

/// Unified error type for the sessionization engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Run parameter rejected before processing.
    #[error("[{code}] invalid parameter: {message}")]
    InvalidParameter { code: &'static str, message: String },

    /// A single record was unusable.
    #[error("[{code}] malformed event: {message}")]
    MalformedEvent { code: &'static str, message: String },

    /// The sweep curve is monotonic or flat over the swept range.
    #[error("[SWEEP_001] no local minimum found across {candidates} candidate gaps")]
    NoLocalMinimumFound { candidates: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            code: ParamErrorCode::Invalid.code(),
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEvent {
            code: EventErrorCode::Malformed.code(),
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error aborts the whole run.
    ///
    /// Malformed records and a missing local minimum are recoverable;
    /// everything else stops the batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MalformedEvent { .. } | Self::NoLocalMinimumFound { .. }
        )
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParameter { code, .. } => Some(code),
            Self::MalformedEvent { code, .. } => Some(code),
            Self::NoLocalMinimumFound { .. } => Some("SWEEP_001"),
            _ => None,
        }
    }
}
