//! Simulation world: bodies, joints, and step state.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use nalgebra::{Point2, Vector2};
use sim_constraint::{
    Joint, JointHandle, JointParameter, JointSet, MouseJoint, MouseJointDef, SimulationState,
    SolverJoint,
};
use sim_types::{BodyId, MassProperties, Pose, RigidBodyState, SimError, SimulationConfig};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid body in the simulation world.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    /// Unique identifier.
    pub id: BodyId,
    /// Optional name for debugging.
    pub name: Option<String>,
    /// Current state (pose + twist).
    pub state: RigidBodyState,
    /// Mass properties (mass, inertia, COM offset).
    pub mass_props: MassProperties,
    /// Whether this body is static (immovable).
    pub is_static: bool,
}

impl Body {
    /// Create a new dynamic body.
    #[must_use]
    pub fn new(id: BodyId, state: RigidBodyState, mass_props: MassProperties) -> Self {
        Self {
            id,
            name: None,
            state,
            mass_props,
            is_static: false,
        }
    }

    /// Create a static (immovable) body.
    #[must_use]
    pub fn new_static(id: BodyId, pose: Pose) -> Self {
        Self {
            id,
            name: None,
            state: RigidBodyState::at_rest(pose),
            mass_props: MassProperties::fixed(),
            is_static: true,
        }
    }

    /// Set the body name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Kinetic energy of the body.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static {
            return 0.0;
        }
        self.state
            .twist
            .kinetic_energy(self.mass_props.mass, self.mass_props.inertia)
    }
}

/// The simulation world containing all entities.
///
/// Bodies are kept in [`BodyId`] order so that every step visits them, and
/// fills the solver buffer, in the same order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct World {
    /// Simulation configuration.
    config: SimulationConfig,
    /// Current simulation time.
    time: f64,
    /// Step counter.
    step_count: u64,
    /// All rigid bodies, indexed by ID.
    bodies: BTreeMap<BodyId, Body>,
    /// Body name to ID mapping.
    body_names: HashMap<String, BodyId>,
    /// All joints.
    joints: JointSet,
    /// Step-in-progress token queried by joint mutations.
    #[cfg_attr(feature = "serde", serde(skip))]
    state: SimulationState,
    /// Duration of the last completed step, for warm-start scaling.
    previous_timestep: Option<f64>,
    /// Next available body ID.
    next_body_id: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl World {
    /// Create a new empty world with the given configuration.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            time: 0.0,
            step_count: 0,
            bodies: BTreeMap::new(),
            body_names: HashMap::new(),
            joints: JointSet::new(),
            state: SimulationState::idle(),
            previous_timestep: None,
            next_body_id: 1,
        }
    }

    /// Get the simulation configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the simulation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepInProgress`] during a step, or a validation
    /// error for an invalid configuration.
    pub fn set_config(&mut self, config: SimulationConfig) -> sim_types::Result<()> {
        self.check_idle()?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Get the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Get the step count.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Get the timestep from configuration.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.config.timestep
    }

    /// Duration of the last completed step, if any.
    #[must_use]
    pub fn previous_timestep(&self) -> Option<f64> {
        self.previous_timestep
    }

    /// Step state of the world.
    #[must_use]
    pub fn simulation_state(&self) -> &SimulationState {
        &self.state
    }

    /// Whether a step is currently executing.
    #[must_use]
    pub fn is_stepping(&self) -> bool {
        self.state.is_stepping()
    }

    /// Get the number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get the number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    // =========================================================================
    // Body Management
    // =========================================================================

    /// Add a body to the world and return its ID.
    pub fn add_body(&mut self, state: RigidBodyState, mass_props: MassProperties) -> BodyId {
        let id = self.allocate_body_id();
        self.bodies.insert(id, Body::new(id, state, mass_props));
        id
    }

    /// Add a static body at the given pose.
    pub fn add_static_body(&mut self, pose: Pose) -> BodyId {
        let id = self.allocate_body_id();
        self.bodies.insert(id, Body::new_static(id, pose));
        id
    }

    /// Add a pre-built body to the world.
    ///
    /// # Errors
    ///
    /// Returns an error if the body ID already exists.
    pub fn insert_body(&mut self, body: Body) -> sim_types::Result<()> {
        if self.bodies.contains_key(&body.id) {
            return Err(SimError::invalid_config(format!(
                "body ID {} already exists",
                body.id
            )));
        }
        if let Some(ref name) = body.name {
            self.body_names.insert(name.clone(), body.id);
        }
        self.next_body_id = self.next_body_id.max(body.id.raw() + 1);
        self.bodies.insert(body.id, body);
        Ok(())
    }

    fn allocate_body_id(&mut self) -> BodyId {
        let id = BodyId::new(self.next_body_id);
        self.next_body_id += 1;
        id
    }

    /// Get a body by ID.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Get a mutable body by ID.
    #[must_use]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Find a body by the name it was inserted with.
    #[must_use]
    pub fn body_by_name(&self, name: &str) -> Option<&Body> {
        self.body_names.get(name).and_then(|id| self.bodies.get(id))
    }

    /// Remove a body along with every joint attached to it.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(&id)?;
        if let Some(ref name) = body.name {
            self.body_names.remove(name);
        }

        let attached: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.body() == id)
            .map(|(handle, _)| handle)
            .collect();
        for handle in attached {
            if self.joints.remove(handle).is_ok() {
                debug!(%handle, body = %id, "joint destroyed with its body");
            }
        }

        Some(body)
    }

    /// Iterate over all bodies in ID order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Iterate over all bodies mutably in ID order.
    pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.values_mut()
    }

    /// Get all body IDs in order.
    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.keys().copied()
    }

    // =========================================================================
    // Joint Management
    // =========================================================================

    /// Create a mouse joint dragging `def.body` toward `def.target`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] if the body is missing or static,
    /// or an invalid-parameter error for a bad definition.
    pub fn create_mouse_joint(&mut self, def: &MouseJointDef) -> sim_types::Result<JointHandle> {
        match self.bodies.get(&def.body) {
            Some(body) if !body.is_static => {}
            _ => return Err(SimError::InvalidBodyId(def.body.raw())),
        }

        let joint = MouseJoint::new(def)?;
        let handle = self.joints.insert(joint);
        debug!(%handle, body = %def.body, "mouse joint created");
        Ok(handle)
    }

    /// Destroy a joint. Its handle, and every copy of it, becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepInProgress`] during a step or
    /// [`SimError::InvalidJointHandle`] for a stale handle.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> sim_types::Result<Joint> {
        self.check_idle()?;
        let joint = self.joints.remove(handle)?;
        debug!(%handle, body = %joint.body(), "joint destroyed");
        Ok(joint)
    }

    /// Move a mouse joint's target.
    ///
    /// Rejected while a step is executing and for stale handles; a rejected
    /// call leaves the joint untouched. The new target takes effect at the
    /// next step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepInProgress`] or [`SimError::InvalidJointHandle`].
    pub fn set_mouse_target(
        &mut self,
        handle: JointHandle,
        target: Point2<f64>,
    ) -> sim_types::Result<()> {
        self.joints.set_target(&self.state, handle, target)
    }

    /// Change a joint parameter under the same rules as
    /// [`World::set_mouse_target`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepInProgress`], [`SimError::InvalidJointHandle`]
    /// or [`SimError::InvalidJointParameter`].
    pub fn set_joint_parameter(
        &mut self,
        handle: JointHandle,
        parameter: JointParameter,
    ) -> sim_types::Result<()> {
        self.joints.set_parameter(&self.state, handle, parameter)
    }

    /// Drop a joint's carried impulse so its next step starts cold.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepInProgress`] or [`SimError::InvalidJointHandle`].
    pub fn reset_joint_warm_start(&mut self, handle: JointHandle) -> sim_types::Result<()> {
        self.check_idle()?;
        self.joints.get_mut(handle)?.reset_warm_start();
        Ok(())
    }

    /// Get a joint by handle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidJointHandle`] for a stale handle.
    pub fn joint(&self, handle: JointHandle) -> sim_types::Result<&Joint> {
        self.joints.get(handle)
    }

    /// Get a mouse joint by handle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidJointHandle`] for a stale handle or a
    /// handle to another kind of joint.
    pub fn mouse_joint(&self, handle: JointHandle) -> sim_types::Result<&MouseJoint> {
        self.joints
            .get(handle)?
            .as_mouse()
            .ok_or(SimError::InvalidJointHandle {
                index: handle.index(),
                generation: handle.generation(),
            })
    }

    /// World-space position of a mouse joint's dragged point.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidJointHandle`] for a stale handle, or
    /// [`SimError::InvalidBodyId`] if its body is gone.
    pub fn mouse_anchor(&self, handle: JointHandle) -> sim_types::Result<Point2<f64>> {
        let joint = self.mouse_joint(handle)?;
        let body = self
            .body(joint.body())
            .ok_or(SimError::InvalidBodyId(joint.body().raw()))?;
        Ok(joint.anchor_world(&body.state.pose))
    }

    /// All joints.
    #[must_use]
    pub fn joints(&self) -> &JointSet {
        &self.joints
    }

    pub(crate) fn joints_mut(&mut self) -> &mut JointSet {
        &mut self.joints
    }

    fn check_idle(&self) -> sim_types::Result<()> {
        if self.state.is_stepping() {
            warn!("world mutation rejected: simulation step in progress");
            return Err(SimError::StepInProgress);
        }
        Ok(())
    }

    // =========================================================================
    // Simulation Control
    // =========================================================================

    pub(crate) fn begin_step(&mut self) {
        self.state.begin_step();
    }

    /// Close a step of length `dt` (called by stepper).
    pub(crate) fn end_step(&mut self, dt: f64) {
        self.state.end_step();
        self.previous_timestep = Some(dt);
        self.time += dt;
        self.step_count += 1;
    }

    /// Close a step that failed partway. Time does not advance.
    pub(crate) fn abort_step(&mut self) {
        self.state.end_step();
    }

    /// Reset simulation time to zero.
    ///
    /// The next step is treated as the first one for warm-start scaling.
    pub fn reset_time(&mut self) {
        self.time = 0.0;
        self.step_count = 0;
        self.previous_timestep = None;
    }

    /// Check if simulation has reached max time (if configured).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.config.max_time.is_some_and(|max| self.time >= max)
    }

    /// Validate the world state.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - Any body has non-finite state values (`NaN` or `Inf`)
    /// - Any body has invalid mass properties
    pub fn validate(&self) -> sim_types::Result<()> {
        self.config.validate()?;

        for body in self.bodies.values() {
            if !body.state.is_finite() {
                return Err(SimError::diverged(format!(
                    "body {} has non-finite state",
                    body.id
                )));
            }
            body.mass_props.validate()?;
        }

        Ok(())
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Total kinetic energy of all bodies.
    #[must_use]
    pub fn total_kinetic_energy(&self) -> f64 {
        self.bodies.values().map(Body::kinetic_energy).sum()
    }

    /// Total linear momentum of all dynamic bodies.
    #[must_use]
    pub fn total_linear_momentum(&self) -> Vector2<f64> {
        self.bodies
            .values()
            .filter(|body| !body.is_static)
            .map(|body| body.state.twist.linear * body.mass_props.mass)
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sim_constraint::DragDamping;

    fn world_with_body() -> (World, BodyId) {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        let id = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        (world, id)
    }

    #[test]
    fn test_body_ids_are_sequential() {
        let mut world = World::default();
        let a = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        let b = world.add_static_body(Pose::identity());

        assert_eq!(a, BodyId::new(1));
        assert_eq!(b, BodyId::new(2));
        assert!(world.body(b).unwrap().is_static);
        assert_eq!(world.body_ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_insert_body_rejects_duplicate() {
        let (mut world, id) = world_with_body();
        let duplicate = Body::new(id, RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        assert!(world.insert_body(duplicate).is_err());

        let named = Body::new(BodyId::new(10), RigidBodyState::default(), MassProperties::fixed())
            .with_name("anchor");
        world.insert_body(named).unwrap();
        assert_eq!(world.body_by_name("anchor").unwrap().id, BodyId::new(10));
        assert!(world.body_by_name("missing").is_none());

        // IDs continue past inserted ones
        let next = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        assert_eq!(next, BodyId::new(11));
    }

    #[test]
    fn test_removed_body_name_is_released() {
        let mut world = World::default();
        let crate_body = Body::new(
            BodyId::new(3),
            RigidBodyState::default(),
            MassProperties::disk(1.0, 0.5),
        )
        .with_name("crate");
        world.insert_body(crate_body).unwrap();

        world.remove_body(BodyId::new(3)).unwrap();
        assert!(world.body_by_name("crate").is_none());

        let replacement = Body::new(
            BodyId::new(4),
            RigidBodyState::default(),
            MassProperties::disk(1.0, 0.5),
        )
        .with_name("crate");
        world.insert_body(replacement).unwrap();
        assert_eq!(world.body_by_name("crate").unwrap().id, BodyId::new(4));
    }

    #[test]
    fn test_bodies_mut_edits_every_body() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        world.add_body(RigidBodyState::default(), MassProperties::disk(2.0, 0.5));
        world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));

        for body in world.bodies_mut() {
            body.state.twist.linear = Vector2::new(1.0, 0.0);
        }

        // (2 + 1) kg at 1 m/s
        assert!((world.total_kinetic_energy() - 1.5).abs() < 1e-12);
        assert_eq!(world.total_linear_momentum(), Vector2::new(3.0, 0.0));
    }

    #[test]
    fn test_create_mouse_joint_requires_dynamic_body() {
        let (mut world, id) = world_with_body();
        let wall = world.add_static_body(Pose::identity());

        assert!(world.create_mouse_joint(&MouseJointDef::new(id)).is_ok());
        assert_eq!(
            world.create_mouse_joint(&MouseJointDef::new(wall)),
            Err(SimError::InvalidBodyId(wall.raw()))
        );
        assert_eq!(
            world.create_mouse_joint(&MouseJointDef::new(BodyId::new(99))),
            Err(SimError::InvalidBodyId(99))
        );
        assert!(world
            .create_mouse_joint(&MouseJointDef::new(id).with_max_force(-1.0))
            .is_err());
        assert_eq!(world.joint_count(), 1);
    }

    #[test]
    fn test_mutation_rejected_mid_step() {
        let (mut world, id) = world_with_body();
        let handle = world.create_mouse_joint(&MouseJointDef::new(id)).unwrap();

        assert!(!world.simulation_state().is_stepping());
        world.begin_step();
        assert!(world.simulation_state().is_stepping());
        for _ in 0..3 {
            assert_eq!(
                world.set_mouse_target(handle, Point2::new(4.0, 4.0)),
                Err(SimError::StepInProgress)
            );
        }
        assert_eq!(
            world.set_joint_parameter(handle, JointParameter::DragDamping(DragDamping::NONE)),
            Err(SimError::StepInProgress)
        );
        assert!(world.destroy_joint(handle).is_err());
        assert_eq!(world.mouse_joint(handle).unwrap().target(), Point2::origin());
        world.end_step(world.timestep());

        world.set_mouse_target(handle, Point2::new(4.0, 4.0)).unwrap();
        assert_eq!(world.mouse_joint(handle).unwrap().target(), Point2::new(4.0, 4.0));
    }

    #[test]
    fn test_destroyed_handle_is_stale() {
        let (mut world, id) = world_with_body();
        let handle = world.create_mouse_joint(&MouseJointDef::new(id)).unwrap();
        world.destroy_joint(handle).unwrap();

        assert!(matches!(
            world.set_mouse_target(handle, Point2::new(1.0, 0.0)),
            Err(SimError::InvalidJointHandle { .. })
        ));
        assert!(world.mouse_joint(handle).is_err());
        assert!(world.destroy_joint(handle).is_err());
    }

    #[test]
    fn test_remove_body_destroys_attached_joints() {
        let (mut world, id) = world_with_body();
        let other = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        let attached = world.create_mouse_joint(&MouseJointDef::new(id)).unwrap();
        let kept = world.create_mouse_joint(&MouseJointDef::new(other)).unwrap();

        assert!(world.remove_body(id).is_some());
        assert!(world.joint(attached).is_err());
        assert!(world.joint(kept).is_ok());
        assert_eq!(world.joint_count(), 1);
    }

    #[test]
    fn test_mouse_anchor_follows_body_pose() {
        let mut world = World::default();
        let id = world.add_body(
            RigidBodyState::at_rest(Pose::new(Point2::new(1.0, 0.0), std::f64::consts::FRAC_PI_2)),
            MassProperties::disk(1.0, 0.5),
        );
        let handle = world
            .create_mouse_joint(&MouseJointDef::new(id).with_local_anchor(Point2::new(1.0, 0.0)))
            .unwrap();

        let anchor = world.mouse_anchor(handle).unwrap();
        approx::assert_relative_eq!(anchor, Point2::new(1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_end_step_records_timestep() {
        let (mut world, _) = world_with_body();
        assert!(world.previous_timestep().is_none());

        world.begin_step();
        assert!(world.is_stepping());
        world.end_step(0.01);

        assert!(!world.is_stepping());
        assert_eq!(world.previous_timestep(), Some(0.01));
        assert_eq!(world.step_count(), 1);

        world.reset_time();
        assert!(world.previous_timestep().is_none());
    }

    #[test]
    fn test_validate_detects_divergence() {
        let (mut world, id) = world_with_body();
        world.body_mut(id).unwrap().state.twist.linear.x = f64::NAN;
        assert!(world.validate().unwrap_err().is_diverged());
    }
}
