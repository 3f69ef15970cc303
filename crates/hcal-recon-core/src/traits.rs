//! Core trait definitions for the hcal-recon pipeline.
//!
//! These traits mark the two external boundaries of the system:
//!
//! - [`CalibrationProvider`]: the read-only conditions collaborator the
//!   feature encoder consults per channel
//! - [`InferenceTransport`]: the opaque request/response exchange with the
//!   remote inference endpoint
//!
//! Both are object-safe so concrete implementations can be selected at
//! configuration time and shared across cycles behind `Arc`.

use async_trait::async_trait;

use crate::error::{CalibError, TransportError};
use crate::types::{BatchShape, ChannelCalib, ChannelId};

/// Read-only lookup of per-channel calibration values.
///
/// Implementations are consulted once per accumulated channel. A failed
/// lookup is fatal to the cycle; the encoder never substitutes defaults.
pub trait CalibrationProvider: Send + Sync {
    /// Returns the calibration values for the given channel.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable conditions data exists for the channel.
    fn calibration(&self, id: ChannelId) -> Result<ChannelCalib, CalibError>;
}

/// Opaque delivery of one assembled batch to a remote inference endpoint.
///
/// The transport receives the flat input buffer together with the declared
/// [`BatchShape`] and must return a flat output buffer of exactly
/// `shape.output_len()` values. Implementations own the wire encoding; the
/// pipeline only requires the fixed-shape array exchange.
///
/// A transport is constructed once at startup and shared read-only across
/// cycles; it must tolerate concurrent in-flight requests from pipelined
/// cycles.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Human-readable transport name for log output.
    fn name(&self) -> &str;

    /// Delivers one batch and returns the output buffer.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, wire-level IO failure, or a
    /// malformed response. The caller treats every error as fatal to the
    /// submitting cycle and never retries.
    async fn infer(&self, input: &[f32], shape: &BatchShape) -> Result<Vec<f32>, TransportError>;
}
