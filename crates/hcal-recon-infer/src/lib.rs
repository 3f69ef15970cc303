//! # hcal-recon Inference Crate
//!
//! Batched remote inference for the hcal-recon pipeline: batch assembly,
//! the inference client with its three concurrency strategies, and result
//! decoding.
//!
//! ## Pipeline Shape
//!
//! One processing cycle produces at most one batch:
//!
//! ```text
//! frames ──► BatchAssembler::accumulate ──► finalize
//!                                              │ (InputBuffer, BatchContext)
//!                                              ▼
//!                 InferenceClient::submit ──► PendingBatch::wait
//!                                              │ OutputBuffer
//!                                              ▼
//!                 ResultDecoder::reconstruct ──► Vec<RecHit>
//! ```
//!
//! Slot order is preserved end-to-end within a batch; cycles never share
//! buffers, and the client is the only process-wide shared state.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hcal_recon_core::{ChannelCalib, DispatchMode};
//! use hcal_recon_digi::StaticCalibration;
//! use hcal_recon_infer::{InferenceClient, MockTransport, ReconConfig, ReconPipeline};
//!
//! # async fn run() -> hcal_recon_core::CoreResult<()> {
//! let config = ReconConfig::default().with_batch_size(4);
//! config.validate()?;
//!
//! let client = InferenceClient::new(
//!     Arc::new(MockTransport::new()),
//!     config.shape(),
//!     DispatchMode::Async,
//! )?;
//! let conditions = Arc::new(StaticCalibration::uniform(ChannelCalib::default()));
//! let pipeline = ReconPipeline::new(client, conditions);
//!
//! let hits = pipeline.process_cycle(&[]).await?;
//! assert!(hits.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod batch;
pub mod client;
pub mod config;
pub mod decoder;
pub mod pipeline;
pub mod transport;

// Re-exports for convenience
pub use batch::{BatchAssembler, BatchContext};
pub use client::{InferenceClient, PendingBatch};
pub use config::ReconConfig;
pub use decoder::ResultDecoder;
pub use pipeline::ReconPipeline;
pub use transport::{MockTransport, TcpTransport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{BatchAssembler, BatchContext};
    pub use crate::client::{InferenceClient, PendingBatch};
    pub use crate::config::ReconConfig;
    pub use crate::decoder::ResultDecoder;
    pub use crate::pipeline::ReconPipeline;
    pub use crate::transport::{MockTransport, TcpTransport};
}
