//! Rigid body state types.
//!
//! This module provides types for representing planar rigid body state in
//! 3 degrees of freedom: position, orientation angle, linear velocity, and
//! angular velocity.

use nalgebra::{Point2, UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a rigid body in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Position and orientation of a rigid body in the plane.
///
/// The position is the body origin; the center of mass may be offset from it
/// (see [`MassProperties::center_of_mass`]).
///
/// # Example
///
/// ```
/// use sim_types::Pose;
/// use nalgebra::Point2;
///
/// let pose = Pose::new(Point2::new(1.0, 2.0), std::f64::consts::FRAC_PI_2);
///
/// // Local +X maps to world +Y after a quarter turn
/// let world = pose.transform_point(&Point2::new(1.0, 0.0));
/// assert!((world.x - 1.0).abs() < 1e-10);
/// assert!((world.y - 3.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position of the body origin in world coordinates.
    pub position: Point2<f64>,
    /// Orientation as a unit complex number.
    pub rotation: UnitComplex<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create an identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point2::origin(),
            rotation: UnitComplex::identity(),
        }
    }

    /// Create a pose from a position and an angle in radians.
    #[must_use]
    pub fn new(position: Point2<f64>, angle: f64) -> Self {
        Self {
            position,
            rotation: UnitComplex::new(angle),
        }
    }

    /// Create a pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point2<f64>) -> Self {
        Self {
            position,
            rotation: UnitComplex::identity(),
        }
    }

    /// Orientation angle in radians, in `(-pi, pi]`.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.position + self.rotation * local.coords
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.rotation.inverse() * (world - self.position))
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.re.is_finite()
            && self.rotation.im.is_finite()
    }
}

/// Linear and angular velocity of a planar rigid body.
///
/// The linear part is the velocity of the center of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Twist {
    /// Linear velocity in world coordinates (m/s).
    pub linear: Vector2<f64>,
    /// Angular velocity about the out-of-plane axis (rad/s).
    pub angular: f64,
}

impl Default for Twist {
    fn default() -> Self {
        Self::zero()
    }
}

impl Twist {
    /// Create a twist with specified linear and angular velocity.
    #[must_use]
    pub const fn new(linear: Vector2<f64>, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Create a zero twist (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector2::zeros(),
            angular: 0.0,
        }
    }

    /// Create a twist with linear velocity only.
    #[must_use]
    pub fn linear(v: Vector2<f64>) -> Self {
        Self {
            linear: v,
            angular: 0.0,
        }
    }

    /// Compute the velocity at a point offset from the center of mass.
    ///
    /// `v_point` = `v_linear` + omega × r
    #[must_use]
    pub fn velocity_at_point(&self, offset: &Vector2<f64>) -> Vector2<f64> {
        self.linear + Vector2::new(-self.angular * offset.y, self.angular * offset.x)
    }

    /// Compute kinetic energy given mass and rotational inertia.
    #[must_use]
    pub fn kinetic_energy(&self, mass: f64, inertia: f64) -> f64 {
        0.5 * mass * self.linear.norm_squared() + 0.5 * inertia * self.angular * self.angular
    }

    /// Check if the twist contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.is_finite()
    }

    /// Get the linear speed (magnitude of linear velocity).
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.linear.norm()
    }
}

/// Complete state of a rigid body.
///
/// # Example
///
/// ```
/// use sim_types::{RigidBodyState, Pose};
/// use nalgebra::Point2;
///
/// let state = RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 1.0)));
/// assert_eq!(state.pose.position.y, 1.0);
/// assert!(state.twist.speed() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyState {
    /// Position and orientation.
    pub pose: Pose,
    /// Linear and angular velocity.
    pub twist: Twist,
}

impl RigidBodyState {
    /// Create a state from pose and twist.
    #[must_use]
    pub const fn new(pose: Pose, twist: Twist) -> Self {
        Self { pose, twist }
    }

    /// Create a state at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose) -> Self {
        Self {
            pose,
            twist: Twist::zero(),
        }
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.twist.is_finite()
    }
}

/// Mass properties of a planar rigid body.
///
/// A body with zero mass and zero inertia is treated as static: both inverse
/// quantities are zero and impulses do not move it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Center of mass offset from body origin in local coordinates.
    pub center_of_mass: Vector2<f64>,
    /// Rotational inertia about the center of mass (kg·m²).
    pub inertia: f64,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::fixed()
    }
}

impl MassProperties {
    /// Create mass properties with given values.
    #[must_use]
    pub const fn new(mass: f64, center_of_mass: Vector2<f64>, inertia: f64) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Mass properties of an immovable body (infinite mass and inertia).
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vector2::zeros(),
            inertia: 0.0,
        }
    }

    /// Create mass properties for a point mass at the origin.
    ///
    /// A point mass has no rotational inertia, so it never spins.
    #[must_use]
    pub fn point_mass(mass: f64) -> Self {
        Self {
            mass,
            center_of_mass: Vector2::zeros(),
            inertia: 0.0,
        }
    }

    /// Create mass properties for a uniform disk.
    ///
    /// Inertia of a solid disk: I = (1/2) * m * r²
    #[must_use]
    pub fn disk(mass: f64, radius: f64) -> Self {
        Self {
            mass,
            center_of_mass: Vector2::zeros(),
            inertia: 0.5 * mass * radius * radius,
        }
    }

    /// Create mass properties for a uniform box.
    ///
    /// Inertia of a solid rectangle with full extents (w, h):
    /// I = (1/12) * m * (w² + h²)
    #[must_use]
    pub fn box_shape(mass: f64, half_extents: Vector2<f64>) -> Self {
        let w2 = 4.0 * half_extents.x * half_extents.x;
        let h2 = 4.0 * half_extents.y * half_extents.y;
        Self {
            mass,
            center_of_mass: Vector2::zeros(),
            inertia: mass * (w2 + h2) / 12.0,
        }
    }

    /// Offset the center of mass from the body origin.
    #[must_use]
    pub fn with_center_of_mass(mut self, center_of_mass: Vector2<f64>) -> Self {
        self.center_of_mass = center_of_mass;
        self
    }

    /// Inverse mass, zero for static bodies.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Inverse rotational inertia, zero when the body cannot rotate.
    #[must_use]
    pub fn inverse_inertia(&self) -> f64 {
        if self.inertia > 0.0 {
            1.0 / self.inertia
        } else {
            0.0
        }
    }

    /// Whether the body has no translational or rotational response.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inverse_mass() == 0.0 && self.inverse_inertia() == 0.0
    }

    /// Validate the mass properties.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(crate::SimError::invalid_mass(format!(
                "mass must be finite and non-negative, got {}",
                self.mass
            )));
        }

        if !self.inertia.is_finite() || self.inertia < 0.0 {
            return Err(crate::SimError::invalid_mass(format!(
                "inertia must be finite and non-negative, got {}",
                self.inertia
            )));
        }

        if !self.center_of_mass.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "center of mass contains NaN or Inf",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_body_id_display() {
        assert_eq!(BodyId::new(7).to_string(), "Body(7)");
        assert_eq!(BodyId::from(3).raw(), 3);
    }

    #[test]
    fn test_pose_round_trip_point() {
        let pose = Pose::new(Point2::new(2.0, -1.0), 0.7);
        let local = Point2::new(0.3, 1.5);
        let back = pose.inverse_transform_point(&pose.transform_point(&local));

        assert_relative_eq!(back.x, local.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_at_point() {
        // Spinning at 2 rad/s, a point at +X moves along +Y
        let twist = Twist::new(Vector2::new(1.0, 0.0), 2.0);
        let v = twist.velocity_at_point(&Vector2::new(1.0, 0.0));

        assert_relative_eq!(v.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_static_mass_properties() {
        let fixed = MassProperties::fixed();
        assert!(fixed.is_static());
        assert_eq!(fixed.inverse_mass(), 0.0);
        assert_eq!(fixed.inverse_inertia(), 0.0);

        let point = MassProperties::point_mass(2.0);
        assert!(!point.is_static());
        assert_relative_eq!(point.inverse_mass(), 0.5, epsilon = 1e-12);
        assert_eq!(point.inverse_inertia(), 0.0);
    }

    #[test]
    fn test_shape_inertia() {
        let disk = MassProperties::disk(2.0, 1.0);
        assert_relative_eq!(disk.inertia, 1.0, epsilon = 1e-12);

        let square = MassProperties::box_shape(12.0, Vector2::new(0.5, 0.5));
        assert_relative_eq!(square.inertia, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mass_validation() {
        assert!(MassProperties::disk(1.0, 0.5).validate().is_ok());
        assert!(MassProperties::point_mass(-1.0).validate().is_err());
        assert!(MassProperties::new(1.0, Vector2::new(f64::NAN, 0.0), 1.0)
            .validate()
            .is_err());
    }
}
