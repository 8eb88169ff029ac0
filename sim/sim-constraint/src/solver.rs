//! Sequential-impulse driver for joint constraints.
//!
//! # Solver Approach
//!
//! Each step is a Gauss-Seidel sweep over velocities:
//!
//! 1. Resolve every joint's body to its buffer index (once per step)
//! 2. Initialize each joint, which also applies its warm-start impulse
//! 3. Run `velocity_iterations` passes calling `solve_velocity` on every joint
//!
//! Position drift is corrected through the soft-constraint bias computed in
//! initialize, so there is no separate position pass.

use sim_types::{Result, SolverConfig};
use tracing::warn;

use crate::body::{BodyBuffer, StepContext};
use crate::handle::JointSet;
use crate::joint::{Joint, SolverJoint};

/// Runs joint constraints for one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointSolver {
    config: SolverConfig,
}

impl JointSolver {
    /// Create a solver.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Initialize and iterate every joint in `joints` against `bodies`.
    ///
    /// Joints whose body is not in the buffer are skipped for this step.
    /// Joints are visited in slot order, so results are deterministic for a
    /// given insertion history.
    pub fn solve(
        &self,
        joints: &mut JointSet,
        bodies: &mut BodyBuffer,
        ctx: &StepContext,
    ) -> Result<SolverResult> {
        let mut active: Vec<&mut Joint> = Vec::with_capacity(joints.len());
        let mut skipped = 0;

        for joint in joints.joints_mut() {
            let body = joint.body();
            let Some(index) = bodies.index_of(body) else {
                warn!(%body, "joint body missing from step; joint skipped");
                joint.detach();
                skipped += 1;
                continue;
            };
            joint.initialize(index, bodies, ctx)?;
            active.push(joint);
        }

        if active.is_empty() {
            return Ok(SolverResult {
                joints_skipped: skipped,
                ..SolverResult::empty()
            });
        }

        for _ in 0..self.config.velocity_iterations {
            for joint in &mut active {
                joint.solve_velocity(bodies)?;
            }
        }

        Ok(SolverResult {
            joints_solved: active.len(),
            joints_skipped: skipped,
            iterations_used: self.config.velocity_iterations,
        })
    }
}

/// Result of constraint solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverResult {
    /// Joints initialized and iterated this step.
    pub joints_solved: usize,
    /// Joints skipped because their body was missing.
    pub joints_skipped: usize,
    /// Number of velocity iterations run.
    pub iterations_used: usize,
}

impl SolverResult {
    /// Create an empty result.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if no joint was solved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints_solved == 0
    }
}
