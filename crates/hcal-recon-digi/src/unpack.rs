//! Binary digi stream unpacking.
//!
//! Parses the compact read-out format produced by the digitizer link into
//! typed [`RawFrame`]s.
//!
//! # Frame Format
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic (0xD1610001)
//! 4       1     Subdetector code (0=HB, 1=HE, 2=HO, 3=HF)
//! 5       2     ieta (signed, LE)
//! 7       2     iphi (signed, LE)
//! 9       1     Depth segment
//! 10      1     Sample-of-interest index
//! 11      1     Sample count (must equal SAMPLES_PER_FRAME)
//! 12      16    Sample words, u16 LE each: bits 0..8 ADC, bits 8..10 capid
//! ```
//!
//! The parser either parses real bytes or returns a specific
//! [`UnpackError`]; it never substitutes synthetic samples.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

use hcal_recon_core::{ChannelId, RawFrame, RawSample, Subdetector, SAMPLES_PER_FRAME};

/// Digi frame magic number.
const DIGI_MAGIC: u32 = 0xD161_0001;

/// Header bytes before the sample words.
const HEADER_LEN: usize = 12;

/// Total bytes per encoded frame.
pub const FRAME_LEN: usize = HEADER_LEN + 2 * SAMPLES_PER_FRAME;

/// Errors raised while unpacking the binary digi stream.
#[derive(Error, Debug)]
pub enum UnpackError {
    /// Buffer ends before the frame does
    #[error("Insufficient data: need {needed} bytes, got {got}")]
    InsufficientData {
        /// Bytes required for the frame
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// Frame does not start with the digi magic
    #[error("Invalid magic: expected {expected:#010x}, got {got:#010x}")]
    InvalidMagic {
        /// Expected magic value
        expected: u32,
        /// Value found in the stream
        got: u32,
    },

    /// Frame declares a sample count other than the fixed read-out length
    #[error("Sample count mismatch: expected {expected}, got {got}")]
    SampleCountMismatch {
        /// Fixed samples per frame
        expected: usize,
        /// Declared sample count
        got: usize,
    },

    /// Sample-of-interest index outside the frame
    #[error("Sample of interest {soi} outside 0..{len}")]
    InvalidSoi {
        /// Declared sample-of-interest
        soi: usize,
        /// Samples per frame
        len: usize,
    },
}

/// Parser for the binary digi read-out stream.
pub struct DigiUnpacker;

impl DigiUnpacker {
    /// Parses a single frame from the front of the buffer.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns an [`UnpackError`] describing the first malformed field.
    pub fn parse_frame(data: &[u8]) -> Result<(RawFrame, usize), UnpackError> {
        if data.len() < FRAME_LEN {
            return Err(UnpackError::InsufficientData {
                needed: FRAME_LEN,
                got: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        // The length check above guarantees every read below succeeds.
        let magic = cursor.read_u32::<LittleEndian>().unwrap_or_default();
        if magic != DIGI_MAGIC {
            return Err(UnpackError::InvalidMagic {
                expected: DIGI_MAGIC,
                got: magic,
            });
        }

        let subdet = match cursor.read_u8().unwrap_or_default() {
            0 => Subdetector::Barrel,
            1 => Subdetector::Endcap,
            2 => Subdetector::Outer,
            3 => Subdetector::Forward,
            _ => Subdetector::Other,
        };
        let ieta = i32::from(cursor.read_i16::<LittleEndian>().unwrap_or_default());
        let iphi = i32::from(cursor.read_i16::<LittleEndian>().unwrap_or_default());
        let depth = cursor.read_u8().unwrap_or_default();
        let soi = cursor.read_u8().unwrap_or_default() as usize;
        let nsamples = cursor.read_u8().unwrap_or_default() as usize;

        if nsamples != SAMPLES_PER_FRAME {
            return Err(UnpackError::SampleCountMismatch {
                expected: SAMPLES_PER_FRAME,
                got: nsamples,
            });
        }
        if soi >= SAMPLES_PER_FRAME {
            return Err(UnpackError::InvalidSoi {
                soi,
                len: SAMPLES_PER_FRAME,
            });
        }

        let mut samples = [RawSample::new(0, 0); SAMPLES_PER_FRAME];
        for sample in &mut samples {
            let word = cursor.read_u16::<LittleEndian>().unwrap_or_default();
            *sample = RawSample::new((word & 0xff) as u8, ((word >> 8) & 0x3) as u8);
        }

        let id = ChannelId::new(subdet, ieta, iphi, depth);
        // soi was range-checked above, so construction cannot fail.
        let frame = RawFrame::new(id, samples, soi).expect("soi validated");

        Ok((frame, FRAME_LEN))
    }

    /// Parses consecutive frames until the buffer is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the first parse failure; trailing bytes shorter than one
    /// frame are reported as [`UnpackError::InsufficientData`].
    pub fn parse_stream(mut data: &[u8]) -> Result<Vec<RawFrame>, UnpackError> {
        let mut frames = Vec::with_capacity(data.len() / FRAME_LEN);
        while !data.is_empty() {
            let (frame, consumed) = Self::parse_frame(data)?;
            frames.push(frame);
            data = &data[consumed..];
        }
        Ok(frames)
    }
}

/// Encodes one frame back into the wire format.
///
/// Used by test fixtures and the synthetic-cycle driver; the inverse of
/// [`DigiUnpacker::parse_frame`].
#[must_use]
pub fn pack_frame(frame: &RawFrame) -> Vec<u8> {
    let id = frame.id();
    let mut out = Vec::with_capacity(FRAME_LEN);
    out.extend_from_slice(&DIGI_MAGIC.to_le_bytes());
    out.push(match id.subdet {
        Subdetector::Barrel => 0,
        Subdetector::Endcap => 1,
        Subdetector::Outer => 2,
        Subdetector::Forward => 3,
        Subdetector::Other => 0xff,
    });
    out.extend_from_slice(&(id.ieta as i16).to_le_bytes());
    out.extend_from_slice(&(id.iphi as i16).to_le_bytes());
    out.push(id.depth);
    out.push(frame.soi() as u8);
    out.push(SAMPLES_PER_FRAME as u8);
    for sample in frame.samples() {
        let word = u16::from(sample.adc) | (u16::from(sample.capid & 0x3) << 8);
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcal_recon_core::DEFAULT_SOI;

    fn sample_frame() -> RawFrame {
        let id = ChannelId::new(Subdetector::Endcap, -17, 55, 3);
        let samples: [RawSample; SAMPLES_PER_FRAME] =
            core::array::from_fn(|ts| RawSample::new(20 + ts as u8, (ts % 4) as u8));
        RawFrame::new(id, samples, DEFAULT_SOI).unwrap()
    }

    #[test]
    fn test_pack_parse_round_trip() {
        let frame = sample_frame();
        let bytes = pack_frame(&frame);
        assert_eq!(bytes.len(), FRAME_LEN);

        let (parsed, consumed) = DigiUnpacker::parse_frame(&bytes).unwrap();
        assert_eq!(consumed, FRAME_LEN);
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let bytes = pack_frame(&sample_frame());
        let err = DigiUnpacker::parse_frame(&bytes[..FRAME_LEN - 1]).unwrap_err();
        assert!(matches!(err, UnpackError::InsufficientData { .. }));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = pack_frame(&sample_frame());
        bytes[0] ^= 0xff;
        let err = DigiUnpacker::parse_frame(&bytes).unwrap_err();
        assert!(matches!(err, UnpackError::InvalidMagic { .. }));
    }

    #[test]
    fn test_bad_soi_rejected() {
        let mut bytes = pack_frame(&sample_frame());
        bytes[10] = SAMPLES_PER_FRAME as u8;
        let err = DigiUnpacker::parse_frame(&bytes).unwrap_err();
        assert!(matches!(err, UnpackError::InvalidSoi { .. }));
    }

    #[test]
    fn test_parse_stream_consumes_all_frames() {
        let frame = sample_frame();
        let mut stream = Vec::new();
        for _ in 0..3 {
            stream.extend_from_slice(&pack_frame(&frame));
        }
        let frames = DigiUnpacker::parse_stream(&stream).unwrap();
        assert_eq!(frames.len(), 3);
    }
}
