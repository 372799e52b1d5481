//! Bounded per-session store of decoded `f32` samples.
//!
//! Samples are appended at the tail.  Once the retained length exceeds the
//! retention cap, [`SampleBuffer::trim_if_over_capacity`] cuts the buffer
//! back to its most recent "keep-tail" samples in one step.  Samples are only
//! ever discarded from the head, never from the middle.
//!
//! # Example
//!
//! ```rust
//! use stenny::audio::{AudioChunk, BufferLimits, SampleBuffer};
//!
//! let mut buf = SampleBuffer::new(BufferLimits::new(4, 2), 16_000);
//! buf.append(&AudioChunk::new(0, vec![1.0, 2.0, 3.0])).unwrap();
//! buf.append(&AudioChunk::new(1, vec![4.0, 5.0])).unwrap(); // 5 > cap(4)
//! assert!(buf.trim_if_over_capacity());
//! assert_eq!(buf.snapshot(), vec![4.0, 5.0]);
//! ```

use thiserror::Error;

use super::AudioChunk;

// ---------------------------------------------------------------------------
// BufferLimits
// ---------------------------------------------------------------------------

/// Retention cap and trim target, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Retained length above which a trim happens.
    pub max_samples: usize,
    /// Retained length right after a trim.
    pub keep_tail_samples: usize,
}

impl BufferLimits {
    /// # Panics
    ///
    /// Panics if `max_samples == 0` or `keep_tail_samples > max_samples`.
    pub fn new(max_samples: usize, keep_tail_samples: usize) -> Self {
        assert!(max_samples > 0, "BufferLimits max_samples must be > 0");
        assert!(
            keep_tail_samples <= max_samples,
            "BufferLimits keep_tail_samples must not exceed max_samples"
        );
        Self {
            max_samples,
            keep_tail_samples,
        }
    }

    /// Convert second-based settings at `sample_rate` Hz into sample counts.
    pub fn from_secs(max_secs: f32, keep_tail_secs: f32, sample_rate: u32) -> Self {
        let to_samples = |secs: f32| (secs * sample_rate as f32).round() as usize;
        Self::new(to_samples(max_secs), to_samples(keep_tail_secs))
    }
}

// ---------------------------------------------------------------------------
// BufferError
// ---------------------------------------------------------------------------

/// Violations of the buffer's invariants.  Both indicate a defect in the
/// caller and are fatal to the owning session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BufferError {
    /// A chunk arrived with a sequence number that does not advance.
    #[error("chunk {seq} appended after chunk {last}")]
    OutOfOrder { seq: u64, last: u64 },

    /// The retention cap was still exceeded after a trim.
    #[error("buffer holds {len} samples, cap is {max}")]
    OverCapacity { len: usize, max: usize },
}

// ---------------------------------------------------------------------------
// SampleBuffer
// ---------------------------------------------------------------------------

pub struct SampleBuffer {
    samples: Vec<f32>,
    limits: BufferLimits,
    sample_rate: u32,
    /// Sequence number of the newest appended chunk.
    end_seq: Option<u64>,
    trims: u64,
}

impl SampleBuffer {
    pub fn new(limits: BufferLimits, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            limits,
            sample_rate,
            end_seq: None,
            trims: 0,
        }
    }

    /// Append `chunk` at the tail.
    ///
    /// Empty chunks are ignored entirely, including their sequence number.
    /// Does not trim; call [`trim_if_over_capacity`](Self::trim_if_over_capacity)
    /// right after.
    pub fn append(&mut self, chunk: &AudioChunk) -> Result<(), BufferError> {
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(last) = self.end_seq {
            if chunk.seq() <= last {
                return Err(BufferError::OutOfOrder {
                    seq: chunk.seq(),
                    last,
                });
            }
        }

        self.samples.extend_from_slice(chunk.samples());
        self.end_seq = Some(chunk.seq());
        Ok(())
    }

    /// Cut the buffer back to its keep-tail when over the cap.
    ///
    /// Returns `true` when a trim happened.
    pub fn trim_if_over_capacity(&mut self) -> bool {
        if self.samples.len() <= self.limits.max_samples {
            return false;
        }
        let excess = self.samples.len() - self.limits.keep_tail_samples;
        self.samples.drain(..excess);
        self.trims += 1;
        true
    }

    /// Verify the retention cap holds.
    pub fn check_capacity(&self) -> Result<(), BufferError> {
        if self.samples.len() > self.limits.max_samples {
            return Err(BufferError::OverCapacity {
                len: self.samples.len(),
                max: self.limits.max_samples,
            });
        }
        Ok(())
    }

    /// Owned copy of every retained sample, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.clone()
    }

    /// Borrow the most recent `n` samples (all of them when `n >= len`).
    pub fn tail(&self, n: usize) -> &[f32] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sequence number of the newest retained chunk, `None` before the first
    /// non-empty append.
    pub fn end_seq(&self) -> Option<u64> {
        self.end_seq
    }

    pub fn trim_count(&self) -> u64 {
        self.trims
    }

    /// Retained duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
