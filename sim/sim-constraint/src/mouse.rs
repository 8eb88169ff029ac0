//! Soft point-to-point ("mouse") constraint.
//!
//! Pulls a point fixed on a body toward a moving world-space target, like a
//! cursor dragging an object. The constraint is soft: it behaves as a damped
//! spring with a bounded force, so a target that jumps far away never
//! produces an unbounded impulse.
//!
//! # Constraint Formulation
//!
//! ```text
//! p    = c + r                  anchor point, r = R (anchor - local_center)
//! C    = p - target
//! Cdot = v + w × r
//! J    = [I, skew(r)]
//! ```
//!
//! Each step runs [`MouseJoint::initialize`] once and then
//! [`MouseJoint::solve_velocity`] once per sub-iteration. The accumulated
//! impulse is clamped to `max_force * h` after every sub-iteration and is
//! carried into the next step for warm starting.

use nalgebra::{Point2, Vector2};
use sim_types::{BodyId, Pose, Result, SimError};

use crate::body::{BodyBuffer, SolverIndex, StepContext};
use crate::effective_mass::{point_inverse_mass, EffectiveMass};
use crate::softness::{LinearSpring, SoftnessCoefficients};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Empirical angular damping applied to a dragged body every step.
///
/// A body dragged by one point tends to keep spinning around it. Each step
/// its angular velocity is scaled by
///
/// ```text
/// max(0, 1 - coefficient * reference_rate * h)
/// ```
///
/// The default (0.02 at 60 Hz) is a heuristic tuned for 60 Hz stepping, not
/// a physical law; behavior at other rates is whatever the formula gives.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragDamping {
    /// Fraction of angular velocity removed per reference step.
    pub coefficient: f64,
    /// Step rate the coefficient was tuned for (Hz).
    pub reference_rate: f64,
}

impl Default for DragDamping {
    fn default() -> Self {
        Self {
            coefficient: 0.02,
            reference_rate: 60.0,
        }
    }
}

impl DragDamping {
    /// No artificial damping.
    pub const NONE: Self = Self {
        coefficient: 0.0,
        reference_rate: 60.0,
    };

    /// Create a damping heuristic.
    #[must_use]
    pub const fn new(coefficient: f64, reference_rate: f64) -> Self {
        Self {
            coefficient,
            reference_rate,
        }
    }

    /// Scale factor for angular velocity over a step of length `h`.
    #[must_use]
    pub fn factor(&self, h: f64) -> f64 {
        (1.0 - self.coefficient * (self.reference_rate * h)).max(0.0)
    }
}

/// Creation parameters for a [`MouseJoint`].
///
/// # Example
///
/// ```
/// use sim_constraint::MouseJointDef;
/// use sim_types::BodyId;
/// use nalgebra::Point2;
///
/// let def = MouseJointDef::new(BodyId::new(1))
///     .with_target(Point2::new(2.0, 3.0))
///     .with_frequency(1.0, 5.0, 0.7)
///     .with_max_force(1000.0);
///
/// assert!(def.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseJointDef {
    /// The dragged body.
    pub body: BodyId,
    /// Initial world-space target.
    pub target: Point2<f64>,
    /// Dragged point in the body frame.
    pub local_anchor: Point2<f64>,
    /// Spring stiffness (N/m).
    pub stiffness: f64,
    /// Spring damping (N·s/m).
    pub damping: f64,
    /// Upper bound on the constraint force magnitude (N).
    pub max_force: f64,
    /// Empirical angular damping of the dragged body.
    pub drag_damping: DragDamping,
}

impl MouseJointDef {
    /// Definition with the anchor at the body origin, the target at the
    /// world origin, a rigid spring and no force budget.
    #[must_use]
    pub fn new(body: BodyId) -> Self {
        Self {
            body,
            target: Point2::origin(),
            local_anchor: Point2::origin(),
            stiffness: 0.0,
            damping: 0.0,
            max_force: 0.0,
            drag_damping: DragDamping::default(),
        }
    }

    /// Set the initial target.
    #[must_use]
    pub fn with_target(mut self, target: Point2<f64>) -> Self {
        self.target = target;
        self
    }

    /// Set the dragged point in the body frame.
    #[must_use]
    pub fn with_local_anchor(mut self, local_anchor: Point2<f64>) -> Self {
        self.local_anchor = local_anchor;
        self
    }

    /// Set stiffness and damping.
    #[must_use]
    pub fn with_spring(mut self, spring: LinearSpring) -> Self {
        self.stiffness = spring.stiffness;
        self.damping = spring.damping;
        self
    }

    /// Tune the spring by oscillation frequency for a body of `mass`.
    #[must_use]
    pub fn with_frequency(self, mass: f64, hertz: f64, damping_ratio: f64) -> Self {
        self.with_spring(LinearSpring::from_frequency(mass, hertz, damping_ratio))
    }

    /// Set the maximum force.
    #[must_use]
    pub fn with_max_force(mut self, max_force: f64) -> Self {
        self.max_force = max_force;
        self
    }

    /// Override the angular damping heuristic.
    #[must_use]
    pub fn with_drag_damping(mut self, drag_damping: DragDamping) -> Self {
        self.drag_damping = drag_damping;
        self
    }

    /// Validate the definition.
    pub fn validate(&self) -> Result<()> {
        check_point("target", &self.target)?;
        check_point("local_anchor", &self.local_anchor)?;
        check_non_negative("stiffness", self.stiffness)?;
        check_non_negative("damping", self.damping)?;
        check_non_negative("max_force", self.max_force)?;
        check_non_negative("drag damping coefficient", self.drag_damping.coefficient)?;
        check_non_negative("drag damping reference rate", self.drag_damping.reference_rate)?;
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn check_point(name: &str, point: &Point2<f64>) -> Result<()> {
    if point.coords.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(SimError::invalid_parameter(format!(
            "{name} contains NaN or Inf"
        )))
    }
}

/// Soft point-to-point constraint between a body point and a world target.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseJoint {
    body: BodyId,
    local_anchor: Point2<f64>,
    target: Point2<f64>,
    stiffness: f64,
    damping: f64,
    max_force: f64,
    drag_damping: DragDamping,

    // Recomputed by `initialize` every step.
    #[cfg_attr(feature = "serde", serde(skip))]
    solver_index: Option<SolverIndex>,
    local_center: Vector2<f64>,
    inv_mass: f64,
    inv_inertia: f64,
    rotated_anchor: Vector2<f64>,
    softness: SoftnessCoefficients,
    effective_mass: EffectiveMass,
    position_bias: Vector2<f64>,
    dt: f64,
    inv_dt: f64,

    // Carried across steps for warm starting.
    impulse: Vector2<f64>,
}

impl MouseJoint {
    /// Create a joint from a validated definition.
    pub fn new(def: &MouseJointDef) -> Result<Self> {
        def.validate()?;
        Ok(Self {
            body: def.body,
            local_anchor: def.local_anchor,
            target: def.target,
            stiffness: def.stiffness,
            damping: def.damping,
            max_force: def.max_force,
            drag_damping: def.drag_damping,
            solver_index: None,
            local_center: Vector2::zeros(),
            inv_mass: 0.0,
            inv_inertia: 0.0,
            rotated_anchor: Vector2::zeros(),
            softness: SoftnessCoefficients::RIGID,
            effective_mass: EffectiveMass::default(),
            position_bias: Vector2::zeros(),
            dt: 0.0,
            inv_dt: 0.0,
            impulse: Vector2::zeros(),
        })
    }

    /// Prepares the joint for a step and applies the warm-start impulse.
    ///
    /// Caches the body's mass properties, computes the soft-constraint
    /// coefficients, the effective mass and the position bias, damps the
    /// body's spin, then either reapplies the previous accumulated impulse
    /// (scaled by `dt_ratio`) or resets it.
    pub fn initialize(
        &mut self,
        index: SolverIndex,
        bodies: &mut BodyBuffer,
        ctx: &StepContext,
    ) -> Result<()> {
        let body = bodies
            .get_mut(index)
            .ok_or(SimError::InvalidBodyId(self.body.raw()))?;

        self.solver_index = Some(index);
        self.local_center = body.local_center;
        self.inv_mass = body.inv_mass;
        self.inv_inertia = body.inv_inertia;
        self.dt = ctx.dt;
        self.inv_dt = ctx.inv_dt;

        let h = ctx.dt;
        self.softness = SoftnessCoefficients::compute(self.stiffness, self.damping, h);

        self.rotated_anchor = body.rotation * (self.local_anchor.coords - self.local_center);

        let k = point_inverse_mass(
            self.inv_mass,
            self.inv_inertia,
            &self.rotated_anchor,
            self.softness.gamma,
        );
        self.effective_mass = EffectiveMass::from_inverse_mass(&k);

        let anchor = body.center + self.rotated_anchor;
        self.position_bias = (anchor - self.target) * self.softness.beta;

        body.angular_velocity *= self.drag_damping.factor(h);

        if ctx.warm_starting {
            self.impulse *= ctx.dt_ratio;
            body.apply_impulse(&self.rotated_anchor, &self.impulse);
        } else {
            self.impulse = Vector2::zeros();
        }

        Ok(())
    }

    /// Drops the buffer index cached by the last [`initialize`](Self::initialize).
    ///
    /// The accumulated impulse is kept for warm starting.
    pub fn detach(&mut self) {
        self.solver_index = None;
    }

    /// Runs one velocity sub-iteration.
    ///
    /// Velocities are read fresh from the buffer since other constraints on
    /// the same body may have changed them since the last call. Does nothing
    /// if the joint has never been initialized or was detached after its
    /// body went missing.
    pub fn solve_velocity(&mut self, bodies: &mut BodyBuffer) -> Result<()> {
        let Some(index) = self.solver_index else {
            return Ok(());
        };
        let body = bodies
            .get_mut(index)
            .ok_or(SimError::InvalidBodyId(self.body.raw()))?;

        let cdot = body.velocity_at(&self.rotated_anchor);
        let soft_cdot = cdot + self.impulse * self.softness.gamma + self.position_bias;
        let impulse = -self.effective_mass.solve(&soft_cdot);

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = self.dt * self.max_force;
        if self.impulse.norm_squared() > max_impulse * max_impulse {
            self.impulse *= max_impulse / self.impulse.norm();
        }
        let applied = self.impulse - old_impulse;

        body.apply_impulse(&self.rotated_anchor, &applied);
        Ok(())
    }

    /// The dragged body.
    #[must_use]
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// World-space target.
    #[must_use]
    pub fn target(&self) -> Point2<f64> {
        self.target
    }

    /// Dragged point in the body frame.
    #[must_use]
    pub fn local_anchor(&self) -> Point2<f64> {
        self.local_anchor
    }

    /// World position of the dragged point for a body at `pose`.
    #[must_use]
    pub fn anchor_world(&self, pose: &Pose) -> Point2<f64> {
        pose.transform_point(&self.local_anchor)
    }

    /// Spring stiffness (N/m).
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Spring damping (N·s/m).
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Maximum constraint force (N).
    #[must_use]
    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    /// Angular damping heuristic.
    #[must_use]
    pub fn drag_damping(&self) -> DragDamping {
        self.drag_damping
    }

    /// Accumulated impulse of the current (or last) step.
    #[must_use]
    pub fn impulse(&self) -> Vector2<f64> {
        self.impulse
    }

    /// Constraint force of the last step, `impulse / h`.
    #[must_use]
    pub fn constraint_force(&self) -> Vector2<f64> {
        self.impulse * self.inv_dt
    }

    /// Soft-constraint coefficients of the current step.
    #[must_use]
    pub fn softness(&self) -> SoftnessCoefficients {
        self.softness
    }

    /// Inverted effective mass of the current step.
    #[must_use]
    pub fn effective_mass(&self) -> &EffectiveMass {
        &self.effective_mass
    }

    /// Whether the last initialize used the zero-matrix fallback.
    #[must_use]
    pub fn is_mass_degenerate(&self) -> bool {
        self.effective_mass.degenerate
    }

    /// Anchor offset from the center of mass in world orientation.
    #[must_use]
    pub fn rotated_anchor(&self) -> Vector2<f64> {
        self.rotated_anchor
    }

    /// Position error scaled by `beta` (a velocity bias).
    #[must_use]
    pub fn position_bias(&self) -> Vector2<f64> {
        self.position_bias
    }

    /// Buffer index resolved by the last initialize.
    #[must_use]
    pub fn solver_index(&self) -> Option<SolverIndex> {
        self.solver_index
    }

    /// Move the target. Takes effect at the next initialize.
    pub fn set_target(&mut self, target: Point2<f64>) -> Result<()> {
        check_point("target", &target)?;
        self.target = target;
        Ok(())
    }

    /// Set the spring stiffness.
    pub fn set_stiffness(&mut self, stiffness: f64) -> Result<()> {
        check_non_negative("stiffness", stiffness)?;
        self.stiffness = stiffness;
        Ok(())
    }

    /// Set the spring damping.
    pub fn set_damping(&mut self, damping: f64) -> Result<()> {
        check_non_negative("damping", damping)?;
        self.damping = damping;
        Ok(())
    }

    /// Set the maximum constraint force.
    pub fn set_max_force(&mut self, max_force: f64) -> Result<()> {
        check_non_negative("max_force", max_force)?;
        self.max_force = max_force;
        Ok(())
    }

    /// Override the angular damping heuristic.
    pub fn set_drag_damping(&mut self, drag_damping: DragDamping) -> Result<()> {
        check_non_negative("drag damping coefficient", drag_damping.coefficient)?;
        check_non_negative("drag damping reference rate", drag_damping.reference_rate)?;
        self.drag_damping = drag_damping;
        Ok(())
    }

    /// Drop the accumulated impulse so the next step starts cold.
    pub fn reset_warm_start(&mut self) {
        self.impulse = Vector2::zeros();
    }
}
