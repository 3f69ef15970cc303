//! One-cycle reconstruction pipeline.
//!
//! Ties the four stages together for one processing cycle:
//! accumulate every frame, finalize the batch, submit it, wait, decode.
//! The surrounding event loop calls [`ReconPipeline::process_cycle`] once
//! per cycle; independent cycles may run concurrently when the client is in
//! async mode, and each cycle's buffers are created and destroyed inside
//! this call, so nothing leaks across cycles, including after a failure.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use hcal_recon_core::{CalibrationProvider, CoreResult, RawFrame, RecHit};

use crate::batch::BatchAssembler;
use crate::client::InferenceClient;
use crate::decoder::ResultDecoder;

/// Shared per-process pipeline state: the client handle, the decoder, and
/// the conditions source. Cheap to clone; every cycle borrows the same
/// underlying transport.
#[derive(Clone)]
pub struct ReconPipeline {
    client: InferenceClient,
    decoder: ResultDecoder,
    conditions: Arc<dyn CalibrationProvider>,
}

impl std::fmt::Debug for ReconPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconPipeline")
            .field("client", &self.client)
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl ReconPipeline {
    /// Creates a pipeline around an already-constructed client.
    #[must_use]
    pub fn new(client: InferenceClient, conditions: Arc<dyn CalibrationProvider>) -> Self {
        let decoder = ResultDecoder::new(*client.shape());
        Self {
            client,
            decoder,
            conditions,
        }
    }

    /// The shared client handle.
    #[must_use]
    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Runs one full cycle over the given frames.
    ///
    /// Issues exactly one inference request, padding included, and returns
    /// one hit per accepted frame in accumulation order. Frames from
    /// excluded subdetectors are silently skipped.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of the cycle: overflow, calibration
    /// failure, or transport failure. A failed cycle yields no hits and
    /// leaves no state behind.
    #[instrument(skip_all, fields(frames = frames.len()))]
    pub async fn process_cycle(&self, frames: &[RawFrame]) -> CoreResult<Vec<RecHit>> {
        let mut assembler = BatchAssembler::new(*self.client.shape())?;
        for frame in frames {
            assembler.accumulate(frame, &*self.conditions)?;
        }
        let accumulated = assembler.len();
        let (input, context) = assembler.finalize();

        let pending = self.client.submit(input).await;
        let output = pending.wait().await.map_err(|e| {
            warn!(error = %e, "cycle batch failed, dropping outputs");
            e
        })?;

        let hits = self.decoder.reconstruct(&output, &context)?;
        info!(accumulated, hits = hits.len(), "cycle reconstructed");
        Ok(hits)
    }
}
