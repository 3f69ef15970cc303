//! Batch assembly: the input buffer and its slot-to-channel context.
//!
//! One [`BatchAssembler`] lives for exactly one processing cycle. It owns the
//! zero-filled input buffer, assigns each accepted frame the next free slot,
//! and records the channel id per slot in the [`BatchContext`]. The context
//! is the only state that lets output slots be reassociated with channels
//! after inference, so the assembler is the single place that computes slot
//! ranges.

use tracing::{debug, trace};

use hcal_recon_core::{
    BatchError, BatchShape, CalibrationProvider, ChannelId, CoreResult, EncodeError, RawFrame,
};
use hcal_recon_digi::FeatureEncoder;

/// Ordered record of which channel occupies which slot of the current batch.
///
/// Indexed by slot; always at most `batch_size` entries. Frozen once the
/// assembler is finalized and consumed together with the matching output
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    slots: Vec<ChannelId>,
}

impl BatchContext {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, id: ChannelId) {
        self.slots.push(id);
    }

    /// Number of real items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no items were accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Channel occupying the given slot, if the slot is real.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<ChannelId> {
        self.slots.get(slot).copied()
    }

    /// All recorded channel ids, in slot order.
    #[must_use]
    pub fn ids(&self) -> &[ChannelId] {
        &self.slots
    }

    /// Iterates over `(slot, channel)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ChannelId)> + '_ {
        self.slots.iter().copied().enumerate()
    }
}

/// Accumulates encoded frames into one fixed-shape input buffer.
///
/// Created at the start of a cycle, destroyed by [`finalize`](Self::finalize).
/// Unfilled slots stay zero from construction, so a partial batch needs no
/// explicit padding pass.
#[derive(Debug)]
pub struct BatchAssembler {
    shape: BatchShape,
    encoder: FeatureEncoder,
    input: Vec<f32>,
    context: BatchContext,
}

impl BatchAssembler {
    /// Creates an assembler for one cycle.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a degenerate batch shape.
    pub fn new(shape: BatchShape) -> CoreResult<Self> {
        shape.validate()?;
        Ok(Self {
            shape,
            encoder: FeatureEncoder::new(),
            input: vec![0.0; shape.input_len()],
            context: BatchContext::with_capacity(shape.batch_size),
        })
    }

    /// Encodes one frame into the next free slot and records its channel.
    ///
    /// Returns the assigned slot index, or `None` when the frame's
    /// subdetector is excluded from reconstruction (silent skip, no slot
    /// consumed).
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Overflow`], before any buffer mutation, if
    /// the batch is already full, or an encode error if the calibration
    /// lookup or feature encoding fails. Both abort the cycle.
    pub fn accumulate(
        &mut self,
        frame: &RawFrame,
        conditions: &dyn CalibrationProvider,
    ) -> Result<Option<usize>, BatchError> {
        let id = frame.id();
        if !id.is_accepted() {
            trace!(channel = %id, "skipping channel outside accepted subdetectors");
            return Ok(None);
        }

        let slot = self.context.len();
        if slot >= self.shape.batch_size {
            return Err(BatchError::Overflow {
                capacity: self.shape.batch_size,
            });
        }

        let calib = conditions.calibration(id).map_err(EncodeError::from)?;
        let range = self.shape.input_range(slot);
        self.encoder.encode(frame, &calib, &mut self.input[range])?;
        self.context.push(id);

        debug!(channel = %id, slot, "accumulated channel");
        Ok(Some(slot))
    }

    /// Number of slots filled so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.context.len()
    }

    /// Returns `true` if no slots are filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }

    /// Free slots left in the batch.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.shape.batch_size - self.context.len()
    }

    /// The batch shape this assembler was created with.
    #[must_use]
    pub fn shape(&self) -> &BatchShape {
        &self.shape
    }

    /// Freezes the batch: returns the input buffer with zero-padded tail
    /// slots and the matching context.
    #[must_use]
    pub fn finalize(self) -> (Vec<f32>, BatchContext) {
        debug_assert_eq!(self.input.len(), self.shape.input_len());
        debug_assert!(self.context.len() <= self.shape.batch_size);
        (self.input, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcal_recon_core::{
        ChannelCalib, RawSample, Subdetector, DEFAULT_SOI, NINPUT, SAMPLES_PER_FRAME,
    };
    use hcal_recon_digi::StaticCalibration;

    fn frame(subdet: Subdetector, ieta: i32) -> RawFrame {
        let id = ChannelId::new(subdet, ieta, 1, 1);
        let samples = [RawSample::new(30, 0); SAMPLES_PER_FRAME];
        RawFrame::new(id, samples, DEFAULT_SOI).unwrap()
    }

    fn shape(batch_size: usize) -> BatchShape {
        BatchShape::new(NINPUT, 1, batch_size)
    }

    #[test]
    fn test_slots_assigned_monotonically_from_zero() {
        let conditions = StaticCalibration::uniform(ChannelCalib::default());
        let mut assembler = BatchAssembler::new(shape(4)).unwrap();

        for (i, ieta) in [3, 5, 9].iter().enumerate() {
            let slot = assembler
                .accumulate(&frame(Subdetector::Barrel, *ieta), &conditions)
                .unwrap();
            assert_eq!(slot, Some(i));
        }
        assert_eq!(assembler.len(), 3);
        assert_eq!(assembler.remaining(), 1);
    }

    #[test]
    fn test_excluded_subdetector_consumes_no_slot() {
        let conditions = StaticCalibration::uniform(ChannelCalib::default());
        let mut assembler = BatchAssembler::new(shape(2)).unwrap();

        assert_eq!(
            assembler
                .accumulate(&frame(Subdetector::Forward, 30), &conditions)
                .unwrap(),
            None
        );
        assert!(assembler.is_empty());

        let slot = assembler
            .accumulate(&frame(Subdetector::Barrel, 1), &conditions)
            .unwrap();
        assert_eq!(slot, Some(0));
    }

    #[test]
    fn test_overflow_fails_before_buffer_mutation() {
        let conditions = StaticCalibration::uniform(ChannelCalib::default());
        let mut assembler = BatchAssembler::new(shape(2)).unwrap();

        assembler
            .accumulate(&frame(Subdetector::Barrel, 1), &conditions)
            .unwrap();
        assembler
            .accumulate(&frame(Subdetector::Barrel, 2), &conditions)
            .unwrap();

        let snapshot = assembler.input.clone();
        let err = assembler
            .accumulate(&frame(Subdetector::Barrel, 3), &conditions)
            .unwrap_err();
        assert!(matches!(err, BatchError::Overflow { capacity: 2 }));
        assert_eq!(assembler.input, snapshot);
        assert_eq!(assembler.len(), 2);
    }

    #[test]
    fn test_missing_calibration_aborts_accumulation() {
        let conditions = StaticCalibration::new();
        let mut assembler = BatchAssembler::new(shape(2)).unwrap();
        let err = assembler
            .accumulate(&frame(Subdetector::Barrel, 1), &conditions)
            .unwrap_err();
        assert!(matches!(err, BatchError::Encode(_)));
    }

    #[test]
    fn test_finalize_keeps_padding_zero() {
        let conditions = StaticCalibration::uniform(ChannelCalib::default());
        let mut assembler = BatchAssembler::new(shape(4)).unwrap();
        for ieta in [1, 2, 3] {
            assembler
                .accumulate(&frame(Subdetector::Barrel, ieta), &conditions)
                .unwrap();
        }

        let (input, context) = assembler.finalize();
        assert_eq!(input.len(), 4 * NINPUT);
        assert_eq!(context.len(), 3);
        assert!(input[3 * NINPUT..].iter().all(|v| *v == 0.0));
        // Real slots are not all-zero: coordinates are written.
        assert_eq!(input[0], 1.0);
    }

    #[test]
    fn test_degenerate_shape_rejected() {
        assert!(BatchAssembler::new(BatchShape::new(NINPUT, 1, 0)).is_err());
    }
}
