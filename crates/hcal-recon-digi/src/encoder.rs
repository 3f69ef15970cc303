//! Feature encoding of raw frames.
//!
//! One frame becomes one fixed-length feature slice written into the
//! caller-provided buffer region:
//!
//! ```text
//! Index        Field
//! -----        -----
//! 0            ieta
//! 1            iphi
//! 2..10        corrected charge per time sample, in fC
//! 10..14       one-hot depth indicator (depths 1..=4)
//! ```
//!
//! Encoding is a pure function of the frame and its calibration values aside
//! from the write into the destination slice.

use hcal_recon_core::{
    ChannelCalib, EncodeError, RawFrame, RawSample, MAX_DEPTH, NINPUT, SAMPLES_PER_FRAME,
};

use crate::adc::adc_to_fc;

/// Buffer index where the per-sample charges start.
const CHARGE_OFFSET: usize = 2;

/// Buffer index where the one-hot depth indicator starts.
const DEPTH_OFFSET: usize = CHARGE_OFFSET + SAMPLES_PER_FRAME;

/// Encodes raw frames into feature slices.
///
/// Stateless; one instance is shared by all cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Creates a new encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Corrected charge of one sample: pedestal-subtracted decoded charge,
    /// scaled by the photosensor correction factor, with the pedestal
    /// restored.
    #[must_use]
    pub fn corrected_charge(&self, sample: &RawSample, calib: &ChannelCalib) -> f32 {
        let pedestal = calib.pedestal(sample);
        (adc_to_fc(sample.adc) - pedestal) * calib.sipm_correction + pedestal
    }

    /// Encodes one frame into the destination slice.
    ///
    /// `out` must be exactly [`NINPUT`] long; every position is written, so
    /// the destination needs no prior zeroing.
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong-length destination, a depth outside the
    /// one-hot range, or calibration values that fail validation. All of
    /// these abort the cycle.
    pub fn encode(
        &self,
        frame: &RawFrame,
        calib: &ChannelCalib,
        out: &mut [f32],
    ) -> Result<(), EncodeError> {
        if out.len() != NINPUT {
            return Err(EncodeError::SliceLength {
                expected: NINPUT,
                actual: out.len(),
            });
        }

        let id = frame.id();
        calib.validate(id)?;

        let depth = id.depth;
        if depth < 1 || depth as usize > MAX_DEPTH {
            return Err(EncodeError::DepthOutOfRange {
                id,
                depth,
                max: MAX_DEPTH,
            });
        }

        out[0] = id.ieta as f32;
        out[1] = id.iphi as f32;
        for (ts, sample) in frame.samples().iter().enumerate() {
            out[CHARGE_OFFSET + ts] = self.corrected_charge(sample, calib);
        }
        for d in 0..MAX_DEPTH {
            out[DEPTH_OFFSET + d] = if d + 1 == depth as usize { 1.0 } else { 0.0 };
        }

        Ok(())
    }
}
