//! Joint kinds and the capability set the step driver dispatches on.

use nalgebra::{Point2, Vector2};
use sim_types::{BodyId, Result};

use crate::body::{BodyBuffer, SolverIndex, StepContext};
use crate::mouse::{DragDamping, MouseJoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Operations every joint kind provides to the solver.
pub trait SolverJoint {
    /// The body whose velocity this joint drives.
    fn body(&self) -> BodyId;

    /// Once-per-step setup, including warm starting.
    fn initialize(
        &mut self,
        index: SolverIndex,
        bodies: &mut BodyBuffer,
        ctx: &StepContext,
    ) -> Result<()>;

    /// One velocity sub-iteration.
    fn solve_velocity(&mut self, bodies: &mut BodyBuffer) -> Result<()>;

    /// Forget the buffer index of a previous step.
    fn detach(&mut self);

    /// Change a tunable parameter. Takes effect at the next initialize.
    fn set_parameter(&mut self, parameter: JointParameter) -> Result<()>;

    /// Drop any impulse carried for warm starting.
    fn reset_warm_start(&mut self);

    /// Accumulated impulse of the current (or last) step.
    fn impulse(&self) -> Vector2<f64>;
}

/// A tunable joint parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointParameter {
    /// World-space target point.
    Target(Point2<f64>),
    /// Spring stiffness (N/m).
    Stiffness(f64),
    /// Spring damping (N·s/m).
    Damping(f64),
    /// Maximum constraint force (N).
    MaxForce(f64),
    /// Empirical angular damping of the dragged body.
    DragDamping(DragDamping),
}

/// Type of joint constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointType {
    /// Soft point-to-point drag constraint.
    Mouse,
}

impl std::fmt::Display for JointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mouse => write!(f, "mouse"),
        }
    }
}

/// Closed set of joint kinds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Joint {
    /// Soft point-to-point drag constraint.
    Mouse(MouseJoint),
}

impl Joint {
    /// The kind of this joint.
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        match self {
            Self::Mouse(_) => JointType::Mouse,
        }
    }

    /// Borrow as a mouse joint.
    #[must_use]
    pub fn as_mouse(&self) -> Option<&MouseJoint> {
        match self {
            Self::Mouse(joint) => Some(joint),
        }
    }

    /// Borrow mutably as a mouse joint.
    #[must_use]
    pub fn as_mouse_mut(&mut self) -> Option<&mut MouseJoint> {
        match self {
            Self::Mouse(joint) => Some(joint),
        }
    }
}

impl From<MouseJoint> for Joint {
    fn from(joint: MouseJoint) -> Self {
        Self::Mouse(joint)
    }
}

impl SolverJoint for MouseJoint {
    fn body(&self) -> BodyId {
        MouseJoint::body(self)
    }

    fn initialize(
        &mut self,
        index: SolverIndex,
        bodies: &mut BodyBuffer,
        ctx: &StepContext,
    ) -> Result<()> {
        MouseJoint::initialize(self, index, bodies, ctx)
    }

    fn solve_velocity(&mut self, bodies: &mut BodyBuffer) -> Result<()> {
        MouseJoint::solve_velocity(self, bodies)
    }

    fn detach(&mut self) {
        MouseJoint::detach(self);
    }

    fn set_parameter(&mut self, parameter: JointParameter) -> Result<()> {
        match parameter {
            JointParameter::Target(target) => self.set_target(target),
            JointParameter::Stiffness(value) => self.set_stiffness(value),
            JointParameter::Damping(value) => self.set_damping(value),
            JointParameter::MaxForce(value) => self.set_max_force(value),
            JointParameter::DragDamping(value) => self.set_drag_damping(value),
        }
    }

    fn reset_warm_start(&mut self) {
        MouseJoint::reset_warm_start(self);
    }

    fn impulse(&self) -> Vector2<f64> {
        MouseJoint::impulse(self)
    }
}

impl SolverJoint for Joint {
    fn body(&self) -> BodyId {
        match self {
            Self::Mouse(joint) => SolverJoint::body(joint),
        }
    }

    fn initialize(
        &mut self,
        index: SolverIndex,
        bodies: &mut BodyBuffer,
        ctx: &StepContext,
    ) -> Result<()> {
        match self {
            Self::Mouse(joint) => SolverJoint::initialize(joint, index, bodies, ctx),
        }
    }

    fn solve_velocity(&mut self, bodies: &mut BodyBuffer) -> Result<()> {
        match self {
            Self::Mouse(joint) => SolverJoint::solve_velocity(joint, bodies),
        }
    }

    fn detach(&mut self) {
        match self {
            Self::Mouse(joint) => SolverJoint::detach(joint),
        }
    }

    fn set_parameter(&mut self, parameter: JointParameter) -> Result<()> {
        match self {
            Self::Mouse(joint) => joint.set_parameter(parameter),
        }
    }

    fn reset_warm_start(&mut self) {
        match self {
            Self::Mouse(joint) => SolverJoint::reset_warm_start(joint),
        }
    }

    fn impulse(&self) -> Vector2<f64> {
        match self {
            Self::Mouse(joint) => SolverJoint::impulse(joint),
        }
    }
}
