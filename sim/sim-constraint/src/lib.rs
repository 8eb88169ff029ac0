//! Soft point-to-point joints for interactive dragging.
//!
//! This crate provides the mouse joint: a soft constraint that pulls a point
//! fixed on a body toward a moving world-space target, the way a cursor drags
//! an object in an editor or game.
//!
//! # Components
//!
//! - [`SoftnessCoefficients`] / [`LinearSpring`]: spring-damper to
//!   soft-constraint conversion (`gamma`, `beta`)
//! - [`EffectiveMass`]: inverted 2×2 point mass with a zero fallback for
//!   degenerate bodies
//! - [`MouseJoint`]: initialize, warm start and velocity solve with a
//!   maximum-force clamp
//! - [`JointSet`] / [`JointHandle`]: generational storage with guarded
//!   target and parameter mutation
//! - [`JointSolver`]: per-step driver over a [`BodyBuffer`]
//!
//! # Step Protocol
//!
//! ```text
//! for each step:
//!     build BodyBuffer
//!     for each joint:   initialize (bias, effective mass, warm start)
//!     repeat N times:
//!         for each joint: solve_velocity (clamped impulse)
//!     write velocities back
//! ```
//!
//! Targets and parameters may only change between steps. While a
//! [`SimulationState`] reports a step in progress, [`JointSet::set_target`]
//! and [`JointSet::set_parameter`] fail with
//! [`SimError::StepInProgress`](sim_types::SimError::StepInProgress).
//!
//! # Example
//!
//! ```
//! use sim_constraint::{
//!     BodyBuffer, JointSet, JointSolver, MouseJoint, MouseJointDef, SimulationState,
//!     SolverBody, StepContext,
//! };
//! use sim_types::{BodyId, MassProperties, RigidBodyState, SolverConfig};
//! use nalgebra::Point2;
//!
//! let body = BodyId::new(1);
//! let mut joints = JointSet::new();
//! let handle = joints.insert(MouseJoint::new(
//!     &MouseJointDef::new(body)
//!         .with_frequency(1.0, 5.0, 0.7)
//!         .with_max_force(100.0),
//! )?);
//!
//! let state = SimulationState::idle();
//! joints.set_target(&state, handle, Point2::new(2.0, 0.0))?;
//!
//! let mut bodies = BodyBuffer::new();
//! bodies.push(SolverBody::new(
//!     body,
//!     &RigidBodyState::default(),
//!     &MassProperties::disk(1.0, 0.5),
//! ));
//!
//! let solver = JointSolver::new(SolverConfig::default());
//! let result = solver.solve(&mut joints, &mut bodies, &StepContext::new(1.0 / 60.0, None, true))?;
//! assert_eq!(result.joints_solved, 1);
//! # Ok::<(), sim_types::SimError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This crate has no rendering or engine dependencies and can be driven by
//! any stepper that fills a [`BodyBuffer`].

#![doc(html_root_url = "https://docs.rs/sim-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod body;
mod effective_mass;
mod handle;
mod joint;
mod mouse;
mod softness;
mod solver;
mod state;

pub use body::{cross_sv, BodyBuffer, SolverBody, SolverIndex, StepContext};
pub use effective_mass::{point_inverse_mass, try_invert, EffectiveMass};
pub use handle::{JointHandle, JointSet};
pub use joint::{Joint, JointParameter, JointType, SolverJoint};
pub use mouse::{DragDamping, MouseJoint, MouseJointDef};
pub use softness::{LinearSpring, SoftnessCoefficients};
pub use solver::{JointSolver, SolverResult};
pub use state::SimulationState;

// Re-export types needed to drive the joints
pub use sim_types::{BodyId, Point2, Vector2};
