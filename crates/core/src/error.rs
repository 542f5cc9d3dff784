//! Unified error types for the tracker.
//!
//! Every failure the tracker can hit while delivering telemetry is a
//! delivery failure. Coded variants identify which stage failed:
//! - TRACK_001: Network / transport errors
//! - TRACK_002: Serialization errors
//! - TRACK_003: Client storage errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Delivery failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorCode {
    /// TRACK_001: Request could not be sent
    Network,
    /// TRACK_002: Batch could not be encoded
    Serialization,
    /// TRACK_003: Client storage unavailable
    Storage,
}

impl DeliveryErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "TRACK_001",
            Self::Serialization => "TRACK_002",
            Self::Storage => "TRACK_003",
        }
    }
}

/// Unified error type for the tracker.
#[derive(Debug, Error)]
pub enum Error {
    /// Delivery failure with code.
    #[error("[{code}] {message}")]
    Delivery {
        code: &'static str,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a delivery error.
    pub fn delivery(code: DeliveryErrorCode, msg: impl Into<String>) -> Self {
        Self::Delivery {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::delivery(DeliveryErrorCode::Network, msg)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::delivery(DeliveryErrorCode::Storage, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the delivery code for this error.
    ///
    /// Serialization and IO errors map onto their delivery codes so callers
    /// can log every failure under one taxonomy.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Delivery { code, .. } => Some(code),
            Self::Serialization(_) => Some(DeliveryErrorCode::Serialization.code()),
            Self::Storage(_) => Some(DeliveryErrorCode::Storage.code()),
            _ => None,
        }
    }
}
