//! Semi-implicit Euler integration over the step body buffer.
//!
//! The step is split around the velocity solver:
//!
//! ```text
//! v(t+dt) = v(t) + g * dt              integrate_velocity
//! v(t+dt) = solve(v(t+dt))             joint solver
//! x(t+dt) = x(t) + v(t+dt) * dt        integrate_position
//! ```
//!
//! Using the solved velocity for the position update makes this symplectic
//! and keeps the soft constraint's spring stable.
//!
//! # Example
//!
//! ```
//! use sim_core::integrators::{integrate_position, integrate_velocity};
//! use sim_constraint::SolverBody;
//! use sim_types::{BodyId, MassProperties, Pose, RigidBodyState};
//! use nalgebra::{Point2, Vector2};
//!
//! let state = RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 10.0)));
//! let mut body = SolverBody::new(BodyId::new(1), &state, &MassProperties::disk(1.0, 0.5));
//!
//! integrate_velocity(&mut body, &Vector2::new(0.0, -9.81), 0.01);
//! integrate_position(&mut body, 0.01);
//!
//! assert!(body.center.y < 10.0);
//! assert!(body.linear_velocity.y < 0.0);
//! ```

use nalgebra::{UnitComplex, Vector2};
use sim_constraint::SolverBody;

/// Apply gravity to a body's velocity.
///
/// Bodies with zero inverse mass are not accelerated.
pub fn integrate_velocity(body: &mut SolverBody, gravity: &Vector2<f64>, dt: f64) {
    if body.inv_mass > 0.0 {
        body.linear_velocity += gravity * dt;
    }
}

/// Advance a body's center of mass and orientation by its velocity.
pub fn integrate_position(body: &mut SolverBody, dt: f64) {
    body.center += body.linear_velocity * dt;
    integrate_rotation(&mut body.rotation, body.angular_velocity, dt);
}

/// Integrate a 2D orientation by a constant angular velocity.
pub fn integrate_rotation(rotation: &mut UnitComplex<f64>, angular_velocity: f64, dt: f64) {
    *rotation = UnitComplex::new(angular_velocity * dt) * *rotation;
}

/// Exponential velocity damping: `v *= exp(-c * dt)`.
pub fn apply_damping(body: &mut SolverBody, linear_damping: f64, angular_damping: f64, dt: f64) {
    body.linear_velocity *= (-linear_damping * dt).exp();
    body.angular_velocity *= (-angular_damping * dt).exp();
}

/// Clamp velocities to maximum magnitudes.
pub fn clamp_velocities(body: &mut SolverBody, max_linear: f64, max_angular: f64) {
    let speed = body.linear_velocity.norm();
    if speed > max_linear {
        body.linear_velocity *= max_linear / speed;
    }
    body.angular_velocity = body.angular_velocity.clamp(-max_angular, max_angular);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;
    use sim_types::{BodyId, MassProperties, Pose, RigidBodyState, Twist};

    fn body_with(twist: Twist, mass: MassProperties) -> SolverBody {
        let state = RigidBodyState::new(Pose::identity(), twist);
        SolverBody::new(BodyId::new(1), &state, &mass)
    }

    #[test]
    fn test_constant_velocity() {
        let mut body = body_with(
            Twist::linear(Vector2::new(1.0, 0.0)),
            MassProperties::disk(1.0, 0.5),
        );

        integrate_velocity(&mut body, &Vector2::zeros(), 1.0);
        integrate_position(&mut body, 1.0);

        assert_relative_eq!(body.center.x, 1.0, epsilon = 1e-10);
        assert_relative_eq!(body.linear_velocity.x, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_semi_implicit_uses_new_velocity() {
        let mut body = body_with(Twist::zero(), MassProperties::disk(1.0, 0.5));
        let g = Vector2::new(0.0, -10.0);

        integrate_velocity(&mut body, &g, 0.1);
        integrate_position(&mut body, 0.1);

        // Position uses v(t+dt), not v(t)
        assert_relative_eq!(body.linear_velocity.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(body.center.y, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_static_body_ignores_gravity() {
        let mut body = body_with(Twist::zero(), MassProperties::fixed());
        integrate_velocity(&mut body, &Vector2::new(0.0, -9.81), 1.0);
        integrate_position(&mut body, 1.0);

        assert_eq!(body.linear_velocity, Vector2::zeros());
        assert_eq!(body.center, Point2::origin());
    }

    #[test]
    fn test_rotation_integration() {
        let mut rotation = UnitComplex::identity();
        integrate_rotation(&mut rotation, std::f64::consts::PI, 0.5);
        assert_relative_eq!(rotation.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);

        integrate_rotation(&mut rotation, 0.0, 10.0);
        assert_relative_eq!(rotation.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_damping() {
        let mut body = body_with(
            Twist::new(Vector2::new(10.0, 0.0), 5.0),
            MassProperties::disk(1.0, 0.5),
        );
        apply_damping(&mut body, 1.0, 2.0, 0.5);

        assert_relative_eq!(body.linear_velocity.x, 10.0 * (-0.5_f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(body.angular_velocity, 5.0 * (-1.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_clamp_velocities() {
        let mut body = body_with(
            Twist::new(Vector2::new(30.0, 40.0), -20.0),
            MassProperties::disk(1.0, 0.5),
        );
        clamp_velocities(&mut body, 10.0, 5.0);

        assert_relative_eq!(body.linear_velocity.norm(), 10.0, epsilon = 1e-12);
        assert_relative_eq!(body.linear_velocity.x, 6.0, epsilon = 1e-12);
        assert_eq!(body.angular_velocity, -5.0);
    }
}
