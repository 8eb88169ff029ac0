//! Simulation stepping and control flow.
//!
//! This module provides the [`Stepper`] which orchestrates the simulation loop:
//! integrating velocities, running the joint solver, integrating positions,
//! and advancing time.
//!
//! # Example
//!
//! ```
//! use sim_core::{Stepper, World};
//! use sim_constraint::MouseJointDef;
//! use sim_types::{MassProperties, RigidBodyState, SimulationConfig};
//! use nalgebra::Point2;
//!
//! let mut world = World::new(SimulationConfig::realtime().zero_gravity());
//! let body = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
//! let drag = world.create_mouse_joint(
//!     &MouseJointDef::new(body)
//!         .with_frequency(1.0, 5.0, 0.7)
//!         .with_max_force(1000.0),
//! )?;
//!
//! let mut stepper = Stepper::new();
//! for frame in 0..60 {
//!     world.set_mouse_target(drag, Point2::new(f64::from(frame) * 0.05, 0.0))?;
//!     stepper.step(&mut world)?;
//! }
//!
//! // Body has followed the cursor to the right
//! assert!(world.body(body).is_some_and(|b| b.state.pose.position.x > 1.0));
//! # Ok::<(), sim_types::SimError>(())
//! ```

use sim_constraint::{BodyBuffer, JointSolver, SolverBody, SolverResult, StepContext};
use tracing::trace;

use crate::integrators::{
    apply_damping, clamp_velocities, integrate_position, integrate_velocity,
};
use crate::world::World;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Joint solver summary.
    pub solver: SolverResult,
    /// Ratio of this step's duration to the previous one.
    pub dt_ratio: f64,
    /// Whether simulation has completed (reached `max_time`).
    pub completed: bool,
}

/// Configuration for the stepper.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepperConfig {
    /// Whether to automatically apply gravity each step.
    pub apply_gravity: bool,
    /// Whether to solve joint constraints each step.
    pub enable_constraints: bool,
    /// Maximum linear velocity (m/s). Bodies exceeding this are clamped.
    pub max_linear_velocity: Option<f64>,
    /// Maximum angular velocity (rad/s). Bodies exceeding this are clamped.
    pub max_angular_velocity: Option<f64>,
    /// Linear velocity damping coefficient.
    pub linear_damping: f64,
    /// Angular velocity damping coefficient.
    pub angular_damping: f64,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            apply_gravity: true,
            enable_constraints: true,
            max_linear_velocity: Some(100.0),
            max_angular_velocity: Some(100.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl StepperConfig {
    /// Create config with no velocity limits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_linear_velocity: None,
            max_angular_velocity: None,
            ..Default::default()
        }
    }

    /// Create config without gravity.
    #[must_use]
    pub fn zero_gravity() -> Self {
        Self {
            apply_gravity: false,
            ..Default::default()
        }
    }

    /// Set damping coefficients.
    #[must_use]
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Enable or disable the joint solver.
    #[must_use]
    pub fn with_constraints(mut self, enable: bool) -> Self {
        self.enable_constraints = enable;
        self
    }
}

/// The simulation stepper orchestrates the physics loop.
#[derive(Debug, Clone, Default)]
pub struct Stepper {
    /// Stepper configuration.
    config: StepperConfig,
    /// Per-step body storage, reused between steps.
    bodies: BodyBuffer,
}

impl Stepper {
    /// Create a new stepper with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stepper with custom configuration.
    #[must_use]
    pub fn with_config(config: StepperConfig) -> Self {
        Self {
            config,
            bodies: BodyBuffer::new(),
        }
    }

    /// Get the stepper configuration.
    #[must_use]
    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Execute one simulation step.
    ///
    /// This performs:
    /// 1. Mark the world as stepping
    /// 2. Copy dynamic and static bodies into the step buffer, in ID order
    /// 3. Apply gravity and damping to velocities
    /// 4. Initialize joints (warm start) and run the velocity iterations
    /// 5. Apply velocity limits and integrate positions
    /// 6. Write poses and velocities back
    /// 7. Advance time and clear the stepping mark
    ///
    /// Joint targets and parameters cannot change while steps 2-6 run.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The world state is invalid (contains `NaN` or `Inf` values)
    /// - The step produced non-finite state
    pub fn step(&mut self, world: &mut World) -> sim_types::Result<StepResult> {
        world.validate()?;

        world.begin_step();
        let result = self.run_step(world);
        match result {
            Ok(mut result) => {
                world.end_step(world.timestep());
                result.completed = world.is_complete();
                world.validate()?;
                Ok(result)
            }
            Err(err) => {
                world.abort_step();
                Err(err)
            }
        }
    }

    fn run_step(&mut self, world: &mut World) -> sim_types::Result<StepResult> {
        let dt = world.timestep();
        let gravity = world.config().gravity;
        let solver_config = world.config().solver;
        let ctx = StepContext::new(dt, world.previous_timestep(), solver_config.warm_starting);

        self.bodies.clear();
        for body in world.bodies() {
            self.bodies
                .push(SolverBody::new(body.id, &body.state, &body.mass_props));
        }

        for body in self.bodies.iter_mut() {
            if self.config.apply_gravity {
                integrate_velocity(body, &gravity, dt);
            }
            if self.config.linear_damping > 0.0 || self.config.angular_damping > 0.0 {
                apply_damping(
                    body,
                    self.config.linear_damping,
                    self.config.angular_damping,
                    dt,
                );
            }
        }

        let solver = if self.config.enable_constraints {
            JointSolver::new(solver_config).solve(world.joints_mut(), &mut self.bodies, &ctx)?
        } else {
            SolverResult::empty()
        };

        for body in self.bodies.iter_mut() {
            if let (Some(max_linear), Some(max_angular)) =
                (self.config.max_linear_velocity, self.config.max_angular_velocity)
            {
                clamp_velocities(body, max_linear, max_angular);
            }
            integrate_position(body, dt);
        }

        for solved in self.bodies.iter() {
            let Some(body) = world.body_mut(solved.id) else {
                continue;
            };
            if body.is_static {
                continue;
            }
            body.state.pose.position = solved.origin();
            body.state.pose.rotation = solved.rotation;
            body.state.twist.linear = solved.linear_velocity;
            body.state.twist.angular = solved.angular_velocity;
        }

        trace!(
            dt,
            dt_ratio = ctx.dt_ratio,
            joints = solver.joints_solved,
            iterations = solver.iterations_used,
            "step solved"
        );

        Ok(StepResult {
            solver,
            dt_ratio: ctx.dt_ratio,
            completed: false,
        })
    }

    /// Run the simulation until completion or max steps.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn run(
        &mut self,
        world: &mut World,
        max_steps: Option<u64>,
    ) -> sim_types::Result<Vec<StepResult>> {
        let mut results = Vec::new();

        let mut steps = 0u64;
        loop {
            let result = self.step(world)?;
            results.push(result);

            if result.completed {
                break;
            }

            steps += 1;
            if let Some(max) = max_steps {
                if steps >= max {
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Run for a specific duration.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn run_for(
        &mut self,
        world: &mut World,
        duration: f64,
    ) -> sim_types::Result<Vec<StepResult>> {
        let target_time = world.time() + duration;
        let dt = world.timestep();
        // Safe cast: duration and dt are positive, result is bounded
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let estimated_steps = (duration / dt).ceil().max(1.0) as usize;
        let mut results = Vec::with_capacity(estimated_steps);

        for _ in 0..estimated_steps {
            if world.time() >= target_time {
                break;
            }
            let result = self.step(world)?;
            results.push(result);

            if result.completed {
                break;
            }
        }

        Ok(results)
    }
}

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
    use sim_constraint::MouseJointDef;
    use sim_types::{MassProperties, Pose, RigidBodyState, SimulationConfig, SolverConfig};

    fn setup_falling_body() -> World {
        let mut world = World::new(SimulationConfig::default());
        world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 10.0))),
            MassProperties::disk(1.0, 0.5),
        );
        world
    }

    #[test]
    fn test_single_step() {
        let mut world = setup_falling_body();
        let mut stepper = Stepper::new();

        let result = stepper.step(&mut world).expect("step should succeed");
        assert!(!result.completed);
        assert!(result.solver.is_empty());
        assert_eq!(result.dt_ratio, 1.0);
        assert_eq!(world.step_count(), 1);
        assert!(!world.is_stepping());
    }

    #[test]
    fn test_gravity_falling() {
        let mut world = setup_falling_body();
        let mut stepper = Stepper::new();

        let steps = (1.0 / world.timestep()) as u64;
        for _ in 0..steps {
            stepper.step(&mut world).expect("step should succeed");
        }

        let state = world.bodies().next().unwrap().state;
        // After 1 second of free fall: y ≈ 10 - 0.5*9.81 ≈ 5.1 m
        assert!(state.pose.position.y < 10.0, "body should have fallen");
        assert!(state.pose.position.y > 4.0, "body shouldn't have fallen too far");
        assert!(state.twist.linear.y < 0.0, "body should be moving down");
    }

    #[test]
    fn test_zero_gravity() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        let id = world.add_body(
            RigidBodyState::at_rest(Pose::from_position(Point2::new(0.0, 10.0))),
            MassProperties::disk(1.0, 0.5),
        );
        let mut stepper = Stepper::new();
        stepper.run(&mut world, Some(10)).unwrap();

        assert_relative_eq!(world.body(id).unwrap().state.pose.position.y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_static_body_doesnt_move() {
        let mut world = World::default();
        let wall = world.add_static_body(Pose::from_position(Point2::new(2.0, 0.0)));
        let mut stepper = Stepper::new();
        stepper.run(&mut world, Some(30)).unwrap();

        let body = world.body(wall).unwrap();
        assert_eq!(body.state.pose.position, Point2::new(2.0, 0.0));
        assert_eq!(body.state.twist.linear, Vector2::zeros());
    }

    #[test]
    fn test_run_for_duration() {
        let mut world = setup_falling_body();
        let mut stepper = Stepper::new();

        let results = stepper.run_for(&mut world, 0.5).unwrap();
        // Accumulated float time may land just short of 0.5
        assert!((30..=31).contains(&results.len()));
        assert!(world.time() >= 0.5 - 1e-9);
    }

    #[test]
    fn test_run_until_complete() {
        let mut world = World::new(SimulationConfig::default().max_time(0.1));
        let mut stepper = Stepper::new();

        let results = stepper.run(&mut world, None).unwrap();
        assert!(results.last().unwrap().completed);
        assert!(world.is_complete());
    }

    #[test]
    fn test_dt_ratio_follows_timestep_change() {
        let mut world = setup_falling_body();
        let mut stepper = Stepper::new();

        stepper.step(&mut world).unwrap();
        world
            .set_config(SimulationConfig::with_timestep(1.0 / 120.0))
            .unwrap();
        let result = stepper.step(&mut world).unwrap();
        assert_relative_eq!(result.dt_ratio, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_limits() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        let id = world.add_body(
            RigidBodyState::new(
                Pose::identity(),
                sim_types::Twist::new(Vector2::new(500.0, 0.0), 0.0),
            ),
            MassProperties::disk(1.0, 0.5),
        );
        let mut stepper = Stepper::new();
        stepper.step(&mut world).unwrap();

        assert_relative_eq!(world.body(id).unwrap().state.twist.linear.x, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_drag_pulls_body_to_target() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        let id = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        let handle = world
            .create_mouse_joint(
                &MouseJointDef::new(id)
                    .with_target(Point2::new(1.0, 1.0))
                    .with_frequency(1.0, 3.0, 1.0)
                    .with_max_force(1000.0),
            )
            .unwrap();
        let mut stepper = Stepper::new();

        let results = stepper.run_for(&mut world, 3.0).unwrap();
        assert!(results.iter().all(|r| r.solver.joints_solved == 1));

        let anchor = world.mouse_anchor(handle).unwrap();
        assert_relative_eq!(anchor, Point2::new(1.0, 1.0), epsilon = 1e-3);
    }

    #[test]
    fn test_constraints_disabled() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        let id = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
        world
            .create_mouse_joint(
                &MouseJointDef::new(id)
                    .with_target(Point2::new(1.0, 0.0))
                    .with_frequency(1.0, 3.0, 1.0)
                    .with_max_force(1000.0),
            )
            .unwrap();
        let mut stepper = Stepper::with_config(StepperConfig::default().with_constraints(false));
        stepper.run(&mut world, Some(10)).unwrap();

        assert_eq!(world.body(id).unwrap().state.pose.position, Point2::origin());
    }

    #[test]
    fn test_cold_start_differs_from_warm_start() {
        // Two joints share one body and a single sweep leaves them unconverged,
        // so the carried impulses change where the body ends up.
        fn run_pair(warm_starting: bool) -> (Point2<f64>, Vector2<f64>) {
            let mut solver = SolverConfig::default().iterations(1);
            if !warm_starting {
                solver = solver.no_warm_starting();
            }
            let mut world = World::new(SimulationConfig::default().zero_gravity().solver(solver));
            let id = world.add_body(RigidBodyState::default(), MassProperties::disk(1.0, 0.5));
            let first = world
                .create_mouse_joint(
                    &MouseJointDef::new(id)
                        .with_target(Point2::new(1.0, 0.0))
                        .with_frequency(1.0, 3.0, 1.0)
                        .with_max_force(1000.0),
                )
                .unwrap();
            world
                .create_mouse_joint(
                    &MouseJointDef::new(id)
                        .with_target(Point2::new(0.0, 1.0))
                        .with_frequency(1.0, 5.0, 0.7)
                        .with_max_force(1000.0),
                )
                .unwrap();

            Stepper::new().run(&mut world, Some(5)).unwrap();
            (
                world.body(id).unwrap().state.pose.position,
                world.mouse_joint(first).unwrap().impulse(),
            )
        }

        let (warm_position, warm_impulse) = run_pair(true);
        let (cold_position, cold_impulse) = run_pair(false);

        assert!(warm_position.x > 0.0 && warm_position.y > 0.0);
        assert!(cold_position.x > 0.0 && cold_position.y > 0.0);
        assert!((warm_position - cold_position).norm() > 1e-2);
        assert!((warm_impulse - cold_impulse).norm() > 1e-1);
    }
}
