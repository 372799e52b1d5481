//! Immutable unit of inbound audio.

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One decoded inbound frame: 16 kHz mono `f32` samples tagged with the
/// arrival sequence number assigned by the session.
///
/// The samples are private so a chunk cannot change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    seq: u64,
    samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(seq: u64, samples: Vec<f32>) -> Self {
        Self { seq, samples }
    }

    /// Arrival sequence number (strictly increasing within a session).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
