//! Step-scoped body state consumed by joint constraints.
//!
//! The step driver copies every participating body into a contiguous
//! [`BodyBuffer`] once per step and hands joints a stable [`SolverIndex`]
//! into it. Joints read and write velocities through the buffer only.
//!
//! The buffer performs no synchronization. Constraints acting on the same
//! body must be solved one after another, never concurrently.

use hashbrown::HashMap;
use nalgebra::{Point2, UnitComplex, Vector2};
use sim_types::{BodyId, MassProperties, RigidBodyState};

/// Position of a body inside the [`BodyBuffer`] for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolverIndex(pub usize);

/// Body data as seen by the velocity solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBody {
    /// Body this entry was built from.
    pub id: BodyId,
    /// Inverse mass (0 for static bodies).
    pub inv_mass: f64,
    /// Inverse rotational inertia (0 when rotation is locked).
    pub inv_inertia: f64,
    /// Center of mass in the body frame.
    pub local_center: Vector2<f64>,
    /// Center of mass in world coordinates.
    pub center: Point2<f64>,
    /// Current orientation.
    pub rotation: UnitComplex<f64>,
    /// Linear velocity of the center of mass.
    pub linear_velocity: Vector2<f64>,
    /// Angular velocity.
    pub angular_velocity: f64,
}

impl SolverBody {
    /// Builds a solver entry from a body's state and mass properties.
    #[must_use]
    pub fn new(id: BodyId, state: &RigidBodyState, mass: &MassProperties) -> Self {
        let local_center = mass.center_of_mass;
        Self {
            id,
            inv_mass: mass.inverse_mass(),
            inv_inertia: mass.inverse_inertia(),
            local_center,
            center: state.pose.position + state.pose.rotation * local_center,
            rotation: state.pose.rotation,
            linear_velocity: state.twist.linear,
            angular_velocity: state.twist.angular,
        }
    }

    /// Applies an impulse at offset `r` from the center of mass.
    pub fn apply_impulse(&mut self, r: &Vector2<f64>, impulse: &Vector2<f64>) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * r.perp(impulse);
    }

    /// Velocity of the body point at offset `r` from the center of mass.
    #[must_use]
    pub fn velocity_at(&self, r: &Vector2<f64>) -> Vector2<f64> {
        self.linear_velocity + cross_sv(self.angular_velocity, r)
    }

    /// Body origin in world coordinates.
    #[must_use]
    pub fn origin(&self) -> Point2<f64> {
        self.center - self.rotation * self.local_center
    }
}

/// `w × r` for a scalar angular velocity: `(-w r.y, w r.x)`.
#[must_use]
pub fn cross_sv(w: f64, r: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-w * r.y, w * r.x)
}

/// Contiguous body storage for one simulation step.
#[derive(Debug, Clone, Default)]
pub struct BodyBuffer {
    bodies: Vec<SolverBody>,
    indices: HashMap<BodyId, SolverIndex>,
}

impl BodyBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bodies.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(capacity),
            indices: HashMap::with_capacity(capacity),
        }
    }

    /// Appends a body and returns its index for this step.
    ///
    /// Pushing the same [`BodyId`] twice points lookups at the later entry.
    pub fn push(&mut self, body: SolverBody) -> SolverIndex {
        let index = SolverIndex(self.bodies.len());
        self.indices.insert(body.id, index);
        self.bodies.push(body);
        index
    }

    /// Finds the index assigned to `id` this step.
    #[must_use]
    pub fn index_of(&self, id: BodyId) -> Option<SolverIndex> {
        self.indices.get(&id).copied()
    }

    /// Get a body by index.
    #[must_use]
    pub fn get(&self, index: SolverIndex) -> Option<&SolverBody> {
        self.bodies.get(index.0)
    }

    /// Get a mutable body by index.
    #[must_use]
    pub fn get_mut(&mut self, index: SolverIndex) -> Option<&mut SolverBody> {
        self.bodies.get_mut(index.0)
    }

    /// Number of bodies in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate over all bodies.
    pub fn iter(&self) -> impl Iterator<Item = &SolverBody> {
        self.bodies.iter()
    }

    /// Iterate over all bodies mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SolverBody> {
        self.bodies.iter_mut()
    }

    /// Remove all bodies, keeping the allocation.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.indices.clear();
    }
}

/// Per-step inputs from the step driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Step duration `h` in seconds.
    pub dt: f64,
    /// `1 / h`, or zero when `h` is zero.
    pub inv_dt: f64,
    /// Ratio of this step's duration to the previous one.
    pub dt_ratio: f64,
    /// Whether accumulated impulses are carried into this step.
    pub warm_starting: bool,
}

impl StepContext {
    /// Context for a step of length `dt` following one of length `previous_dt`.
    ///
    /// The ratio is 1 when there is no usable previous step.
    #[must_use]
    pub fn new(dt: f64, previous_dt: Option<f64>, warm_starting: bool) -> Self {
        let dt_ratio = match previous_dt {
            Some(prev) if prev > 0.0 => dt / prev,
            _ => 1.0,
        };
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio,
            warm_starting,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sim_types::{Pose, Twist};

    fn offset_body() -> SolverBody {
        let state = RigidBodyState::at_rest(Pose::new(
            Point2::new(1.0, 1.0),
            std::f64::consts::FRAC_PI_2,
        ));
        let mass = MassProperties::disk(2.0, 1.0).with_center_of_mass(Vector2::new(1.0, 0.0));
        SolverBody::new(BodyId::new(1), &state, &mass)
    }

    #[test]
    fn test_center_is_rotated_local_center() {
        let body = offset_body();
        assert_relative_eq!(body.center.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.center.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(body.origin().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.origin().y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_impulse() {
        let mut body = offset_body();
        // inv_mass = 0.5, inertia = 1.0
        body.apply_impulse(&Vector2::new(1.0, 0.0), &Vector2::new(0.0, 2.0));

        assert_relative_eq!(body.linear_velocity.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.angular_velocity, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_at_point() {
        let mut body = offset_body();
        body.linear_velocity = Vector2::new(1.0, 0.0);
        body.angular_velocity = 3.0;

        let twist = Twist::new(body.linear_velocity, body.angular_velocity);
        let r = Vector2::new(0.5, -0.25);
        assert_relative_eq!(body.velocity_at(&r), twist.velocity_at_point(&r), epsilon = 1e-12);
    }

    #[test]
    fn test_buffer_indices_are_stable() {
        let mut buffer = BodyBuffer::with_capacity(2);
        let a = buffer.push(offset_body());
        let mut second = offset_body();
        second.id = BodyId::new(5);
        let b = buffer.push(second);

        assert_eq!(a, SolverIndex(0));
        assert_eq!(b, SolverIndex(1));
        assert_eq!(buffer.index_of(BodyId::new(5)), Some(b));
        assert_eq!(buffer.index_of(BodyId::new(9)), None);
        assert!(buffer.get(SolverIndex(2)).is_none());
    }

    #[test]
    fn test_clear_forgets_indices() {
        let mut buffer = BodyBuffer::new();
        buffer.push(offset_body());
        assert_eq!(buffer.index_of(BodyId::new(1)), Some(SolverIndex(0)));

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.index_of(BodyId::new(1)), None);

        let mut other = offset_body();
        other.id = BodyId::new(7);
        assert_eq!(buffer.push(other), SolverIndex(0));
        assert_eq!(buffer.index_of(BodyId::new(7)), Some(SolverIndex(0)));
        assert_eq!(buffer.index_of(BodyId::new(1)), None);
    }

    #[test]
    fn test_step_context_ratio() {
        let first = StepContext::new(0.01, None, true);
        assert_relative_eq!(first.dt_ratio, 1.0, epsilon = 1e-12);
        assert_relative_eq!(first.inv_dt, 100.0, epsilon = 1e-9);

        let halved = StepContext::new(0.005, Some(0.01), true);
        assert_relative_eq!(halved.dt_ratio, 0.5, epsilon = 1e-12);
    }
}
