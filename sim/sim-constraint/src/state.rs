//! Step-in-progress token owned by the step driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether the owning simulation is currently executing a step.
///
/// The driver flips this around every step. Mutations of solver inputs
/// (joint targets and parameters) query it and are rejected while it is set,
/// since every sub-iteration of a step assumes those inputs are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationState {
    stepping: bool,
}

impl SimulationState {
    /// State of a simulation that is between steps.
    #[must_use]
    pub const fn idle() -> Self {
        Self { stepping: false }
    }

    /// State of a simulation in the middle of a step.
    #[must_use]
    pub const fn stepping() -> Self {
        Self { stepping: true }
    }

    /// Whether a step is in progress.
    #[must_use]
    pub const fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Mark the start of a step.
    pub fn begin_step(&mut self) {
        debug_assert!(!self.stepping, "nested simulation step");
        self.stepping = true;
    }

    /// Mark the end of a step.
    pub fn end_step(&mut self) {
        self.stepping = false;
    }
}
