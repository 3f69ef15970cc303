//! In-memory calibration provider.
//!
//! A map-backed [`CalibrationProvider`] for tests and the synthetic-cycle
//! driver; production deployments implement the trait over the experiment's
//! conditions service instead.

use std::collections::HashMap;

use hcal_recon_core::{CalibError, CalibrationProvider, ChannelCalib, ChannelId};

/// Static, map-backed calibration source.
///
/// Per-channel entries win over the optional fallback; a channel with
/// neither fails the lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticCalibration {
    channels: HashMap<ChannelId, ChannelCalib>,
    fallback: Option<ChannelCalib>,
}

impl StaticCalibration {
    /// Creates an empty calibration source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that answers every lookup with the same values.
    #[must_use]
    pub fn uniform(calib: ChannelCalib) -> Self {
        Self {
            channels: HashMap::new(),
            fallback: Some(calib),
        }
    }

    /// Adds a per-channel entry.
    #[must_use]
    pub fn with_channel(mut self, id: ChannelId, calib: ChannelCalib) -> Self {
        self.channels.insert(id, calib);
        self
    }

    /// Sets the fallback used for channels without their own entry.
    #[must_use]
    pub fn with_fallback(mut self, calib: ChannelCalib) -> Self {
        self.fallback = Some(calib);
        self
    }

    /// Number of per-channel entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no per-channel entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl CalibrationProvider for StaticCalibration {
    fn calibration(&self, id: ChannelId) -> Result<ChannelCalib, CalibError> {
        self.channels
            .get(&id)
            .copied()
            .or(self.fallback)
            .ok_or(CalibError::MissingChannel { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcal_recon_core::Subdetector;

    fn id(ieta: i32) -> ChannelId {
        ChannelId::new(Subdetector::Barrel, ieta, 1, 1)
    }

    #[test]
    fn test_channel_entry_wins_over_fallback() {
        let special = ChannelCalib {
            gain: 2.5,
            ..ChannelCalib::default()
        };
        let source = StaticCalibration::uniform(ChannelCalib::default())
            .with_channel(id(7), special);

        assert_eq!(source.calibration(id(7)).unwrap().gain, 2.5);
        assert_eq!(source.calibration(id(8)).unwrap().gain, 1.0);
    }

    #[test]
    fn test_missing_channel_fails_lookup() {
        let source = StaticCalibration::new();
        let err = source.calibration(id(1)).unwrap_err();
        assert!(matches!(err, CalibError::MissingChannel { .. }));
    }
}
