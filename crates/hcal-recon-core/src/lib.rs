//! # hcal-recon Core
//!
//! Core types, traits, and errors for the hcal-recon batched-inference
//! reconstruction pipeline.
//!
//! This crate provides the foundational building blocks used throughout the
//! workspace:
//!
//! - **Core Data Types**: [`ChannelId`], [`RawFrame`], [`ChannelCalib`],
//!   [`BatchShape`], and [`RecHit`] for representing raw digitizer read-out
//!   and reconstruction results.
//!
//! - **Error Types**: the [`error`] module with one enum per subsystem and
//!   the [`ReconError`] top-level type.
//!
//! - **Traits**: the [`CalibrationProvider`] and [`InferenceTransport`]
//!   boundaries behind which the conditions collaborator and the remote
//!   inference server live.
//!
//! ## Example
//!
//! ```rust
//! use hcal_recon_core::{BatchShape, ChannelId, Subdetector, NINPUT};
//!
//! let shape = BatchShape::new(NINPUT, 1, 16);
//! let id = ChannelId::new(Subdetector::Barrel, -3, 42, 2);
//!
//! assert!(id.is_accepted());
//! assert_eq!(shape.input_range(0).len(), NINPUT);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{
    BatchError, CalibError, CoreResult, DecodeError, EncodeError, ReconError, TransportError,
};
pub use traits::{CalibrationProvider, InferenceTransport};
pub use types::{
    BatchShape, ChannelCalib, ChannelId, DispatchMode, RawFrame, RawSample, RecHit, Subdetector,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Digitizer time samples per channel read-out
pub const SAMPLES_PER_FRAME: usize = 8;

/// Depth segments covered by the one-hot depth encoding
pub const MAX_DEPTH: usize = 4;

/// Feature values per input slot: two coordinates, one corrected charge per
/// sample, and the one-hot depth indicator
pub const NINPUT: usize = 2 + SAMPLES_PER_FRAME + MAX_DEPTH;

/// Default sample-of-interest position within a frame
pub const DEFAULT_SOI: usize = 3;

/// Prelude module for convenient imports.
///
/// ```rust
/// use hcal_recon_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{
        BatchError, CalibError, CoreResult, DecodeError, EncodeError, ReconError, TransportError,
    };
    pub use crate::traits::{CalibrationProvider, InferenceTransport};
    pub use crate::types::{
        BatchShape, ChannelCalib, ChannelId, DispatchMode, RawFrame, RawSample, RecHit,
        Subdetector,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_valid() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_feature_layout_constants() {
        assert_eq!(SAMPLES_PER_FRAME, 8);
        assert_eq!(NINPUT, 14);
        assert!(DEFAULT_SOI < SAMPLES_PER_FRAME);
    }
}
