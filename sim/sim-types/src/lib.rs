//! Core types for planar rigid body simulation.
//!
//! This crate provides the foundational types shared by the constraint solver
//! and the step driver:
//!
//! - [`RigidBodyState`] - Position, orientation, velocity of rigid bodies
//! - [`MassProperties`] - Mass, center of mass, rotational inertia
//! - [`SimulationConfig`] - Timestep, gravity, solver settings
//! - [`SimError`] - The error type for every fallible operation
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no solver logic and no
//! integration. Everything here is plain `Copy` structs over `nalgebra` f64
//! types so it can be logged, serialized (with the `serde` feature) and
//! replayed.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up
//! - Angles: counter-clockwise, radians
//!
//! # Example
//!
//! ```
//! use sim_types::{RigidBodyState, Pose, Twist};
//! use nalgebra::{Point2, Vector2};
//!
//! let state = RigidBodyState::new(
//!     Pose::from_position(Point2::new(0.0, 1.0)),
//!     Twist::linear(Vector2::new(2.0, 0.0)),
//! );
//!
//! assert_eq!(state.pose.position.y, 1.0);
//! assert!((state.twist.speed() - 2.0).abs() < 1e-10);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
mod config;
mod error;

pub use body::{BodyId, MassProperties, Pose, RigidBodyState, Twist};
pub use config::{SimulationConfig, SolverConfig};
pub use error::SimError;

// Re-export math types for convenience
pub use nalgebra::{Matrix2, Point2, UnitComplex, Vector2};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
