//! Binary frame → sample conversion.
//!
//! Clients send raw little-endian IEEE-754 `f32` PCM, 16 kHz mono, with no
//! header.  A frame whose length is not a multiple of four bytes, or that
//! contains NaN / infinity, is rejected with a [`DecodeError`]; the session
//! drops that frame and keeps going.

use thiserror::Error;

/// Bytes per encoded sample.
const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Inbound bytes that do not form a valid sample array.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("frame length {len} is not a multiple of 4 bytes")]
    Misaligned { len: usize },

    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },
}

// ---------------------------------------------------------------------------
// decode_f32le
// ---------------------------------------------------------------------------

/// Decode a little-endian `f32` PCM frame.
///
/// An empty frame decodes to an empty vector; callers treat that as a no-op.
///
/// ```
/// use stenny::audio::decode_f32le;
///
/// let mut bytes = Vec::new();
/// bytes.extend_from_slice(&0.5_f32.to_le_bytes());
/// bytes.extend_from_slice(&(-0.25_f32).to_le_bytes());
/// assert_eq!(decode_f32le(&bytes).unwrap(), vec![0.5, -0.25]);
/// ```
pub fn decode_f32le(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.len() % SAMPLE_BYTES != 0 {
        return Err(DecodeError::Misaligned { len: bytes.len() });
    }

    let mut samples = Vec::with_capacity(bytes.len() / SAMPLE_BYTES);
    for (index, raw) in bytes.chunks_exact(SAMPLE_BYTES).enumerate() {
        let sample = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if !sample.is_finite() {
            return Err(DecodeError::NonFinite { index });
        }
        samples.push(sample);
    }
    Ok(samples)
}
