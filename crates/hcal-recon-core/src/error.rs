//! Error types for the hcal-recon pipeline.
//!
//! # Error Hierarchy
//!
//! - [`ReconError`]: top-level error encompassing all subsystem errors
//! - [`EncodeError`]: feature encoding failures
//! - [`BatchError`]: batch assembly failures
//! - [`TransportError`]: remote inference delivery failures
//! - [`DecodeError`]: result reassociation failures
//! - [`CalibError`]: conditions lookup failures
//!
//! Every failure is fatal to the cycle it occurred in and is never retried;
//! cycles are independent, so [`ReconError::is_recoverable`] answers whether
//! a *later* cycle can be expected to succeed without operator intervention.

use thiserror::Error;

use crate::types::ChannelId;

/// A specialized `Result` type for pipeline operations.
pub type CoreResult<T> = Result<T, ReconError>;

/// Top-level error type for the reconstruction pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReconError {
    /// Feature encoding error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Batch assembly error
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Remote inference transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Result decoding error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Calibration lookup error
    #[error("Calibration error: {0}")]
    Calib(#[from] CalibError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// Validation error for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what validation failed
        message: String,
    },
}

impl ReconError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` if a later cycle may succeed without intervention.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Encode(_)
            | Self::Batch(_)
            | Self::Decode(_)
            | Self::Calib(_)
            | Self::Configuration { .. }
            | Self::Validation { .. } => false,
        }
    }
}

/// Errors raised while encoding a raw frame into its feature slice.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EncodeError {
    /// Calibration data for the channel is missing or malformed; aborts the
    /// cycle
    #[error(transparent)]
    BadCalibration(#[from] CalibError),

    /// Channel depth outside the one-hot encoding range
    #[error("Depth {depth} of {id} outside one-hot range 1..={max}")]
    DepthOutOfRange {
        /// The affected channel
        id: ChannelId,
        /// The out-of-range depth
        depth: u8,
        /// Largest encodable depth
        max: usize,
    },

    /// Destination slice does not match the feature length
    #[error("Feature slice length mismatch: expected {expected}, got {actual}")]
    SliceLength {
        /// Expected slice length
        expected: usize,
        /// Provided slice length
        actual: usize,
    },
}

/// Errors raised during batch assembly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BatchError {
    /// Batch capacity exceeded; the caller must finalize first
    #[error("Batch overflow: capacity {capacity} already filled")]
    Overflow {
        /// Configured slots per batch
        capacity: usize,
    },

    /// Encoding the frame for its slot failed
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors raised while delivering a batch to the inference endpoint.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// Could not reach the endpoint
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection {
        /// Endpoint address
        endpoint: String,
        /// Underlying failure description
        reason: String,
    },

    /// Wire-level IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server response length differs from the declared batch shape
    #[error("Response shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch {
        /// Expected output buffer length
        expected: usize,
        /// Received output buffer length
        actual: usize,
    },

    /// Remote call exceeded its deadline
    #[error("Inference request timed out after {duration_ms}ms")]
    Timeout {
        /// Deadline in milliseconds
        duration_ms: u64,
    },

    /// Background dispatch task failed to complete
    #[error("Dispatch failed: {message}")]
    Dispatch {
        /// Description of the dispatch failure
        message: String,
    },
}

impl TransportError {
    /// Creates a new connection error.
    #[must_use]
    pub fn connection(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new dispatch error.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Returns `true` if a later cycle may succeed without intervention.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Io(_) | Self::Timeout { .. } | Self::Dispatch { .. } => {
                true
            }
            Self::ShapeMismatch { .. } => false,
        }
    }
}

/// Errors raised while reassociating output slots with their channels.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// Batch context longer than the batch it claims to describe
    #[error("Batch context holds {context_len} ids but the batch has {batch_size} slots")]
    ContextMismatch {
        /// Number of ids recorded in the context
        context_len: usize,
        /// Slots per batch
        batch_size: usize,
    },

    /// Output buffer length differs from the declared shape
    #[error("Output buffer length mismatch: expected {expected}, got {actual}")]
    OutputLength {
        /// Expected output buffer length
        expected: usize,
        /// Received output buffer length
        actual: usize,
    },
}

/// Errors raised by the external conditions collaborator.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CalibError {
    /// No calibration stored for the channel
    #[error("No calibration for channel {id}")]
    MissingChannel {
        /// The channel without conditions data
        id: ChannelId,
    },

    /// Stored calibration is unusable
    #[error("Invalid calibration for {id}: {reason}")]
    Invalid {
        /// The affected channel
        id: ChannelId,
        /// What was wrong with the stored values
        reason: String,
    },
}

impl CalibError {
    /// Creates a new invalid-calibration error.
    #[must_use]
    pub fn invalid(id: ChannelId, reason: impl Into<String>) -> Self {
        Self::Invalid {
            id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Subdetector;

    fn id() -> ChannelId {
        ChannelId::new(Subdetector::Barrel, 1, 1, 1)
    }

    #[test]
    fn test_error_conversion() {
        let overflow = BatchError::Overflow { capacity: 16 };
        let top: ReconError = overflow.into();
        assert!(matches!(top, ReconError::Batch(_)));
    }

    #[test]
    fn test_transport_recoverability() {
        assert!(TransportError::Timeout { duration_ms: 500 }.is_recoverable());
        assert!(TransportError::connection("localhost:9000", "refused").is_recoverable());
        assert!(!TransportError::ShapeMismatch {
            expected: 16,
            actual: 4
        }
        .is_recoverable());
    }

    #[test]
    fn test_recoverability_propagates_to_top_level() {
        let recoverable: ReconError = TransportError::Timeout { duration_ms: 10 }.into();
        assert!(recoverable.is_recoverable());

        let fatal: ReconError = CalibError::MissingChannel { id: id() }.into();
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_display_names_the_channel() {
        let err = CalibError::invalid(id(), "gain 0");
        assert!(err.to_string().contains("HB ieta=1 iphi=1 depth=1"));
        assert!(err.to_string().contains("gain 0"));
    }
}
