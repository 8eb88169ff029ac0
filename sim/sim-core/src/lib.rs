//! Step driver for 2D rigid bodies dragged by soft point-to-point joints.
//!
//! This crate provides the simulation loop and world management on top of
//! [`sim_types`] (data) and [`sim_constraint`] (the joint solver).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Stepper                               │
//! │  Orchestrates: gravity → joint solve → integration → time   │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         World                                │
//! │  Contains: bodies, joints, configuration, time, step state  │
//! │  Provides: entity management, guarded joint mutation        │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  sim-constraint / Integrators                │
//! │  BodyBuffer, JointSolver, semi-implicit Euler               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! While [`Stepper::step`] runs, the world reports
//! [`World::is_stepping`] and refuses joint target and parameter changes
//! with [`SimError::StepInProgress`].
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no engine or rendering dependencies. It can
//! be used in:
//!
//! - Editors and tools that drag bodies with a cursor
//! - Headless test harnesses
//! - Other engines, as a reference step loop
//!
//! # Quick Start
//!
//! ```
//! use sim_core::{Stepper, World};
//! use sim_constraint::MouseJointDef;
//! use sim_types::{MassProperties, Pose, RigidBodyState, SimulationConfig};
//! use nalgebra::Point2;
//!
//! let mut world = World::new(SimulationConfig::default());
//! let crate_box = world.add_body(
//!     RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 2.0))),
//!     MassProperties::box_shape(4.0, nalgebra::Vector2::new(0.5, 0.5)),
//! );
//!
//! // Grab the box by a corner and hold it up against gravity
//! let grab = world.create_mouse_joint(
//!     &MouseJointDef::new(crate_box)
//!         .with_local_anchor(Point2::new(0.5, 0.5))
//!         .with_target(Point2::new(0.5, 2.5))
//!         .with_frequency(4.0, 5.0, 0.7)
//!         .with_max_force(1000.0 * 4.0),
//! )?;
//!
//! let mut stepper = Stepper::new();
//! stepper.run_for(&mut world, 1.0)?;
//!
//! let force = world.mouse_joint(grab)?.constraint_force();
//! println!("holding force: {force:?}");
//! # Ok::<(), sim_types::SimError>(())
//! ```
//!
//! # Diagnostics
//!
//! The world provides diagnostic methods:
//!
//! ```
//! use sim_core::World;
//! use sim_types::{MassProperties, RigidBodyState, Twist};
//! use nalgebra::Vector2;
//!
//! let mut world = World::default();
//! world.add_body(
//!     RigidBodyState::new(
//!         sim_types::Pose::identity(),
//!         Twist::linear(Vector2::new(1.0, 0.0)),
//!     ),
//!     MassProperties::disk(2.0, 0.5),
//! );
//!
//! println!("Total kinetic energy: {} J", world.total_kinetic_energy());
//! println!("Total momentum: {:?}", world.total_linear_momentum());
//! ```

#![doc(html_root_url = "https://docs.rs/sim-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
)]

pub mod integrators;
mod stepper;
mod world;

pub use stepper::{StepResult, Stepper, StepperConfig};
pub use world::{Body, World};

// Re-export key types for convenience
pub use sim_constraint::{
    DragDamping, Joint, JointHandle, JointParameter, MouseJoint, MouseJointDef,
};
pub use sim_types::{
    BodyId, MassProperties, Pose, RigidBodyState, SimError, SimulationConfig, SolverConfig, Twist,
};

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn test_basic_simulation() {
        let mut world = World::new(SimulationConfig::default());

        let body_id = world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 10.0))),
            MassProperties::disk(1.0, 0.5),
        );

        let mut stepper = Stepper::new();
        let results = stepper
            .run_for(&mut world, 0.5)
            .expect("simulation should succeed");

        assert!(!results.is_empty());
        let final_state = world.body(body_id).expect("body should exist");
        assert!(final_state.state.pose.position.y < 10.0);
    }

    #[test]
    fn test_momentum_conservation() {
        // In zero gravity with no joints, momentum should be conserved
        let mut world = World::new(SimulationConfig::default().zero_gravity());

        world.add_body(
            RigidBodyState::new(
                Pose::from_position(Point2::new(-5.0, 0.0)),
                Twist::linear(Vector2::new(1.0, 0.0)),
            ),
            MassProperties::disk(1.0, 0.5),
        );
        world.add_body(
            RigidBodyState::new(
                Pose::from_position(Point2::new(5.0, 0.0)),
                Twist::linear(Vector2::new(-1.0, 0.0)),
            ),
            MassProperties::disk(1.0, 0.5),
        );

        let initial_momentum = world.total_linear_momentum();

        let mut stepper = Stepper::with_config(StepperConfig::zero_gravity());
        stepper
            .run_for(&mut world, 1.0)
            .expect("simulation should succeed");

        let final_momentum = world.total_linear_momentum();
        assert_relative_eq!(initial_momentum, final_momentum, epsilon = 1e-10);
    }

    #[test]
    fn test_energy_trend() {
        // Free falling body should gain kinetic energy equal to lost potential energy
        let mut world = World::new(SimulationConfig::default());

        let initial_height = 10.0;
        let mass = 1.0;

        world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, initial_height))),
            MassProperties::disk(mass, 0.5),
        );

        let g = 9.81;
        let initial_total = mass * g * initial_height + world.total_kinetic_energy();

        let mut stepper = Stepper::new();
        stepper
            .run_for(&mut world, 0.5)
            .expect("simulation should succeed");

        let body = world.bodies().next().expect("should have body");
        let final_total = mass * g * body.state.pose.position.y + world.total_kinetic_energy();

        // Semi-implicit Euler drifts by O(h)
        let energy_drift = (final_total - initial_total).abs() / initial_total;
        assert!(
            energy_drift < 0.01,
            "Energy drift too large: {}%",
            energy_drift * 100.0
        );
    }

    #[test]
    fn test_held_body_hangs_below_target() {
        let mut world = World::new(SimulationConfig::default());
        let id = world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 1.0))),
            MassProperties::disk(2.0, 0.25),
        );
        let grab = world
            .create_mouse_joint(
                &MouseJointDef::new(id)
                    .with_target(Point2::new(0.0, 1.0))
                    .with_frequency(2.0, 4.0, 1.0)
                    .with_max_force(1000.0),
            )
            .unwrap();

        let mut stepper = Stepper::new();
        stepper.run_for(&mut world, 4.0).unwrap();

        // Spring sag under gravity: m g / k
        let k = world.mouse_joint(grab).unwrap().stiffness();
        let sag = 2.0 * 9.81 / k;
        let position = world.body(id).unwrap().state.pose.position;
        assert_relative_eq!(position.y, 1.0 - sag, epsilon = 1e-3);

        // Steady force balances the weight
        let force = world.mouse_joint(grab).unwrap().constraint_force();
        assert_relative_eq!(force.y, 2.0 * 9.81, epsilon = 1e-3);
    }

    #[test]
    fn test_static_ground() {
        let mut world = World::new(SimulationConfig::default());

        world.add_static_body(Pose::from_position(Point2::new(0.0, 0.0)));
        world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 1.0))),
            MassProperties::disk(1.0, 0.5),
        );

        let mut stepper = Stepper::new();
        stepper
            .run_for(&mut world, 1.0)
            .expect("simulation should succeed");

        let ground = world
            .bodies()
            .find(|b| b.is_static)
            .expect("should have ground");
        assert_relative_eq!(ground.state.pose.position.y, 0.0, epsilon = 1e-10);
    }
}
