//! Result decoding: reassociating output slots with their channels.
//!
//! The mapping is purely positional (the output buffer carries no channel
//! identifiers), so slot-index integrity between the input buffer, the
//! output buffer, and the batch context is the one invariant everything
//! rests on. The decoder cross-checks every length it can before reading a
//! single value.

use hcal_recon_core::{
    BatchShape, CalibrationProvider, CoreResult, DecodeError, RecHit,
};

use crate::batch::BatchContext;

/// Builds the ordered hit sequence from one output buffer and its context.
#[derive(Debug, Clone, Copy)]
pub struct ResultDecoder {
    shape: BatchShape,
}

impl ResultDecoder {
    /// Creates a decoder for the given batch shape.
    #[must_use]
    pub const fn new(shape: BatchShape) -> Self {
        Self { shape }
    }

    /// Reconstructs one hit per real context entry, in accumulation order.
    ///
    /// Each hit takes its energy from the first value of the matching output
    /// slot. Zero-padded trailing slots have no context entry and are never
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is longer than the batch or the
    /// output buffer length does not match the declared shape.
    pub fn reconstruct(
        &self,
        output: &[f32],
        context: &BatchContext,
    ) -> Result<Vec<RecHit>, DecodeError> {
        if context.len() > self.shape.batch_size {
            return Err(DecodeError::ContextMismatch {
                context_len: context.len(),
                batch_size: self.shape.batch_size,
            });
        }
        if output.len() != self.shape.output_len() {
            return Err(DecodeError::OutputLength {
                expected: self.shape.output_len(),
                actual: output.len(),
            });
        }

        Ok(context
            .iter()
            .map(|(slot, id)| RecHit::new(id, output[self.shape.output_offset(slot)]))
            .collect())
    }

    /// Like [`reconstruct`](Self::reconstruct), but scales each hit's energy
    /// by the channel's gain from the conditions source.
    ///
    /// # Errors
    ///
    /// Returns decode errors as above, or a calibration error if a channel
    /// in the context has no conditions data.
    pub fn reconstruct_calibrated(
        &self,
        output: &[f32],
        context: &BatchContext,
        conditions: &dyn CalibrationProvider,
    ) -> CoreResult<Vec<RecHit>> {
        let mut hits = self.reconstruct(output, context)?;
        for hit in &mut hits {
            let calib = conditions.calibration(hit.id)?;
            hit.energy *= calib.gain;
        }
        Ok(hits)
    }
}
