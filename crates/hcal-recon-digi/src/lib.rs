//! hcal-recon Digi Processing Library
//!
//! This crate turns raw digitizer read-out into the fixed-length feature
//! slices consumed by the batched inference pipeline:
//!
//! - **Stream Unpacking**: parsing the binary digi link format into typed
//!   frames
//! - **Charge Decode**: the piecewise-linear ADC-to-fC transfer curve
//! - **Feature Encoding**: coordinates, corrected per-sample charge, and the
//!   one-hot depth indicator
//! - **Calibration Stub**: a map-backed conditions source for tests and
//!   synthetic runs
//!
//! # Example
//!
//! ```rust
//! use hcal_recon_core::{ChannelCalib, ChannelId, RawFrame, RawSample, Subdetector, NINPUT};
//! use hcal_recon_digi::FeatureEncoder;
//!
//! let id = ChannelId::new(Subdetector::Barrel, 3, 17, 1);
//! let frame = RawFrame::new(id, [RawSample::new(12, 0); 8], 3).unwrap();
//!
//! let mut features = [0.0f32; NINPUT];
//! FeatureEncoder::new()
//!     .encode(&frame, &ChannelCalib::default(), &mut features)
//!     .unwrap();
//! assert_eq!(features[0], 3.0);
//! ```

pub mod adc;
pub mod calib;
pub mod encoder;
pub mod unpack;

// Re-export main types for convenience
pub use adc::adc_to_fc;
pub use calib::StaticCalibration;
pub use encoder::FeatureEncoder;
pub use unpack::{pack_frame, DigiUnpacker, UnpackError, FRAME_LEN};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
