//! Inference gate state machine.
//!
//! ```text
//! Idle ──chunk, window available──▶ Running
//!      ──chunk, empty window──────▶ Idle
//! Running ──chunk──▶ Pending ──chunk──▶ Pending
//! Running ──inference done──▶ Idle
//! Pending ──inference done──▶ Running   (one re-run on the latest buffer)
//! Running / Pending ──inference failed──▶ Idle
//! ```
//!
//! There is never more than one inference in flight: `Pending` only records
//! that audio arrived while the recognizer was busy.

// ---------------------------------------------------------------------------
// GateState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateState {
    /// No inference in flight.
    #[default]
    Idle,

    /// One inference in flight; no audio arrived since it started.
    Running,

    /// One inference in flight and newer audio is waiting for it.
    Pending,
}

impl GateState {
    /// Returns `true` while an inference is in flight.
    ///
    /// ```
    /// use stenny::pipeline::GateState;
    ///
    /// assert!(!GateState::Idle.is_busy());
    /// assert!(GateState::Running.is_busy());
    /// assert!(GateState::Pending.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, GateState::Running | GateState::Pending)
    }

    /// A short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            GateState::Idle => "idle",
            GateState::Running => "running",
            GateState::Pending => "pending",
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
