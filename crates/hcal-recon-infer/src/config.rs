//! Pipeline configuration.
//!
//! Supplied once at startup and immutable thereafter; every cycle reads the
//! same values. The declared `ninput` must match the encoder's fixed feature
//! layout: the shape is wire metadata, not a knob that changes what gets
//! encoded.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use hcal_recon_core::{BatchShape, CoreResult, DispatchMode, ReconError, NINPUT};

fn default_ninput() -> usize {
    NINPUT
}

fn default_noutput() -> usize {
    1
}

fn default_batch_size() -> usize {
    16
}

fn default_endpoint() -> String {
    "127.0.0.1:8001".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    1
}

/// Configuration for the batched inference pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Feature values per input slot
    #[serde(default = "default_ninput")]
    pub ninput: usize,
    /// Values per output slot
    #[serde(default = "default_noutput")]
    pub noutput: usize,
    /// Slots per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrency strategy of the inference client
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// Inference endpoint as `host:port`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pseudo-async completion poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            ninput: default_ninput(),
            noutput: default_noutput(),
            batch_size: default_batch_size(),
            dispatch: DispatchMode::default(),
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ReconConfig {
    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Sets the inference endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The batch shape declared to the transport.
    #[must_use]
    pub const fn shape(&self) -> BatchShape {
        BatchShape::new(self.ninput, self.noutput, self.batch_size)
    }

    /// Per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Pseudo-async poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks the configuration once at startup.
    ///
    /// # Errors
    ///
    /// Returns an error for a degenerate shape, a declared `ninput` that
    /// does not match the encoder feature layout, or a zero deadline.
    pub fn validate(&self) -> CoreResult<()> {
        self.shape().validate()?;
        if self.ninput != NINPUT {
            return Err(ReconError::configuration(format!(
                "declared ninput {} does not match the encoder feature layout {}",
                self.ninput, NINPUT
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ReconError::configuration("request timeout must be non-zero"));
        }
        Ok(())
    }
}
