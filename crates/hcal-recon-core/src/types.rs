//! Core data types for the hcal-recon pipeline.
//!
//! # Type Categories
//!
//! - **Channel Types**: [`ChannelId`], [`Subdetector`]
//! - **Digi Types**: [`RawSample`], [`RawFrame`]
//! - **Calibration Types**: [`ChannelCalib`]
//! - **Batch Types**: [`BatchShape`], [`DispatchMode`]
//! - **Output Types**: [`RecHit`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{CalibError, CoreResult, ReconError};
use crate::{MAX_DEPTH, SAMPLES_PER_FRAME};

// =============================================================================
// Channel Types
// =============================================================================

/// Calorimeter subdetector a channel belongs to.
///
/// Only [`Barrel`](Subdetector::Barrel), [`Endcap`](Subdetector::Endcap), and
/// [`Outer`](Subdetector::Outer) channels are reconstructed; frames from the
/// remaining subdetectors are silently excluded from batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdetector {
    /// Barrel section (HB)
    Barrel,
    /// Endcap section (HE)
    Endcap,
    /// Outer section (HO)
    Outer,
    /// Forward section (HF), not reconstructed here
    Forward,
    /// Anything else read out on the same link
    Other,
}

impl Subdetector {
    /// Returns `true` if channels from this subdetector enter the batch.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Barrel | Self::Endcap | Self::Outer)
    }

    /// Short detector label used in log output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Barrel => "HB",
            Self::Endcap => "HE",
            Self::Outer => "HO",
            Self::Forward => "HF",
            Self::Other => "??",
        }
    }
}

impl fmt::Display for Subdetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stable identifier of one detector channel: subdetector, tower coordinates,
/// and depth segment.
///
/// A `ChannelId` identifies exactly one decodable unit per processing cycle
/// and is the key carried through the batch context to reassociate inference
/// outputs with their channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    /// Subdetector section
    pub subdet: Subdetector,
    /// Signed pseudorapidity tower index
    pub ieta: i32,
    /// Azimuthal tower index
    pub iphi: i32,
    /// Depth segment, 1-based
    pub depth: u8,
}

impl ChannelId {
    /// Creates a new channel id.
    #[must_use]
    pub const fn new(subdet: Subdetector, ieta: i32, iphi: i32, depth: u8) -> Self {
        Self {
            subdet,
            ieta,
            iphi,
            depth,
        }
    }

    /// Returns `true` if this channel's subdetector is reconstructed.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        self.subdet.is_accepted()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ieta={} iphi={} depth={}",
            self.subdet, self.ieta, self.iphi, self.depth
        )
    }
}

// =============================================================================
// Digi Types
// =============================================================================

/// One digitizer time sample: the raw ADC code and the capacitor id that
/// selects the pedestal for this sample.
///
/// `capid` is a 2-bit hardware counter; values are masked to `0..4` when used
/// as a pedestal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Raw ADC code
    pub adc: u8,
    /// Capacitor id (2-bit)
    pub capid: u8,
}

impl RawSample {
    /// Creates a new raw sample.
    #[must_use]
    pub const fn new(adc: u8, capid: u8) -> Self {
        Self { adc, capid }
    }

    /// Capacitor id masked to the 2-bit hardware range, usable as a pedestal
    /// index.
    #[must_use]
    pub const fn capid_index(&self) -> usize {
        (self.capid & 0x3) as usize
    }
}

/// Raw read-out of one channel for one processing cycle: a fixed run of
/// digitizer samples plus the sample-of-interest position.
///
/// Immutable after construction; consumed by exactly one batch slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    id: ChannelId,
    samples: [RawSample; SAMPLES_PER_FRAME],
    soi: usize,
}

impl RawFrame {
    /// Creates a new raw frame.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `soi` is not a valid sample index.
    pub fn new(
        id: ChannelId,
        samples: [RawSample; SAMPLES_PER_FRAME],
        soi: usize,
    ) -> CoreResult<Self> {
        if soi >= SAMPLES_PER_FRAME {
            return Err(ReconError::validation(format!(
                "sample of interest {soi} outside 0..{SAMPLES_PER_FRAME}"
            )));
        }
        Ok(Self { id, samples, soi })
    }

    /// The channel this frame was read out from.
    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// All time samples, in read-out order.
    #[must_use]
    pub const fn samples(&self) -> &[RawSample; SAMPLES_PER_FRAME] {
        &self.samples
    }

    /// Sample-of-interest index.
    #[must_use]
    pub const fn soi(&self) -> usize {
        self.soi
    }
}

// =============================================================================
// Calibration Types
// =============================================================================

/// Per-channel calibration values supplied by the external conditions
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalib {
    /// Pedestal per capacitor id, in fC
    pub pedestals: [f32; 4],
    /// Charge-to-energy gain
    pub gain: f32,
    /// Photosensor non-linearity correction factor applied to
    /// pedestal-subtracted charge
    pub sipm_correction: f32,
}

impl ChannelCalib {
    /// Pedestal for the given sample, selected by its capacitor id.
    #[must_use]
    pub const fn pedestal(&self, sample: &RawSample) -> f32 {
        self.pedestals[sample.capid_index()]
    }

    /// Checks the calibration values for a channel.
    ///
    /// # Errors
    ///
    /// Returns [`CalibError::Invalid`] for a non-positive gain or a
    /// non-finite correction factor; such conditions abort the cycle.
    pub fn validate(&self, id: ChannelId) -> Result<(), CalibError> {
        if self.gain <= 0.0 || !self.gain.is_finite() {
            return Err(CalibError::invalid(id, format!("gain {}", self.gain)));
        }
        if !self.sipm_correction.is_finite() {
            return Err(CalibError::invalid(
                id,
                format!("correction factor {}", self.sipm_correction),
            ));
        }
        if self.pedestals.iter().any(|p| !p.is_finite()) {
            return Err(CalibError::invalid(id, "non-finite pedestal"));
        }
        Ok(())
    }
}

impl Default for ChannelCalib {
    fn default() -> Self {
        Self {
            pedestals: [0.0; 4],
            gain: 1.0,
            sipm_correction: 1.0,
        }
    }
}

// =============================================================================
// Batch Types
// =============================================================================

/// Shape of one inference batch: features per input slot, values per output
/// slot, and the number of slots.
///
/// Slot `i` of the input buffer occupies exactly
/// `[i * ninput, (i + 1) * ninput)`; the parallel output slot occupies
/// `[i * noutput, (i + 1) * noutput)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchShape {
    /// Feature values per input slot
    pub ninput: usize,
    /// Values per output slot
    pub noutput: usize,
    /// Slots per batch
    pub batch_size: usize,
}

impl BatchShape {
    /// Creates a new batch shape.
    #[must_use]
    pub const fn new(ninput: usize, noutput: usize, batch_size: usize) -> Self {
        Self {
            ninput,
            noutput,
            batch_size,
        }
    }

    /// Total input buffer length.
    #[must_use]
    pub const fn input_len(&self) -> usize {
        self.ninput * self.batch_size
    }

    /// Total output buffer length.
    #[must_use]
    pub const fn output_len(&self) -> usize {
        self.noutput * self.batch_size
    }

    /// Input buffer range owned by the given slot.
    #[must_use]
    pub const fn input_range(&self, slot: usize) -> Range<usize> {
        slot * self.ninput..(slot + 1) * self.ninput
    }

    /// Output buffer offset of the given slot.
    #[must_use]
    pub const fn output_offset(&self, slot: usize) -> usize {
        slot * self.noutput
    }

    /// Checks the shape for degenerate dimensions.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any dimension is zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.ninput == 0 || self.noutput == 0 || self.batch_size == 0 {
            return Err(ReconError::validation(format!(
                "batch shape must be non-zero: ninput={} noutput={} batch_size={}",
                self.ninput, self.noutput, self.batch_size
            )));
        }
        Ok(())
    }
}

/// Concurrency strategy of the inference client.
///
/// All three modes share one contract; they differ only in where the wait for
/// the remote response happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// Resolve the remote call inline at submission
    Sync,
    /// Submit immediately, suspend at the explicit wait point
    #[default]
    Async,
    /// Submit without consuming the caller's task, bounded-poll at the wait
    /// point
    PseudoAsync,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
            Self::PseudoAsync => f.write_str("pseudo-async"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "pseudo-async" | "pseudo_async" => Ok(Self::PseudoAsync),
            other => Err(ReconError::validation(format!(
                "unknown dispatch mode '{other}'"
            ))),
        }
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Reconstructed hit for one channel, emitted once per accumulated item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecHit {
    /// Channel the hit belongs to
    pub id: ChannelId,
    /// Reconstructed energy
    pub energy: f32,
    /// Hit time; filled by downstream timing reconstruction
    pub time: f32,
    /// Fit quality; filled by downstream reconstruction
    pub chi2: f32,
}

impl RecHit {
    /// Creates a hit carrying only the reconstructed energy.
    #[must_use]
    pub const fn new(id: ChannelId, energy: f32) -> Self {
        Self {
            id,
            energy,
            time: 0.0,
            chi2: 0.0,
        }
    }

    /// Returns `true` if the depth one-hot encoding covers this channel.
    #[must_use]
    pub const fn depth_in_range(&self) -> bool {
        self.id.depth >= 1 && self.id.depth as usize <= MAX_DEPTH
    }
}
