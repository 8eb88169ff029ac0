//! Generational joint handles and the joint arena.
//!
//! A [`JointHandle`] is a slot index plus the generation the slot had when
//! the joint was inserted. Removing a joint bumps the slot generation, so a
//! handle that outlives its joint, or that points at a recycled slot, is
//! rejected with [`SimError::InvalidJointHandle`] instead of touching
//! whatever now lives there.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use nalgebra::Point2;
use sim_types::{Result, SimError};
use tracing::warn;

use crate::joint::{Joint, JointParameter, SolverJoint};
use crate::state::SimulationState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable reference to a joint in a [`JointSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointHandle {
    index: u32,
    generation: u32,
}

impl JointHandle {
    /// Build a handle from raw parts.
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation the handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    fn invalid(self) -> SimError {
        SimError::InvalidJointHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl std::fmt::Display for JointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Joint({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Slot {
    generation: u32,
    joint: Option<Joint>,
}

/// Arena of joints addressed by [`JointHandle`].
///
/// Freed slots are reused lowest index first.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointSet {
    slots: Vec<Slot>,
    free: BinaryHeap<Reverse<u32>>,
    len: usize,
}

impl JointSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set has no live joints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a joint and return its handle.
    pub fn insert(&mut self, joint: impl Into<Joint>) -> JointHandle {
        let joint = joint.into();
        self.len += 1;

        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.joint = Some(joint);
            return JointHandle::from_raw_parts(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            joint: Some(joint),
        });
        JointHandle::from_raw_parts(index, 0)
    }

    /// Remove a joint, invalidating every copy of its handle.
    pub fn remove(&mut self, handle: JointHandle) -> Result<Joint> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| handle.invalid())?;
        let joint = slot.joint.take().ok_or_else(|| handle.invalid())?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(Reverse(handle.index));
        self.len -= 1;
        Ok(joint)
    }

    /// Whether `handle` refers to a live joint.
    #[must_use]
    pub fn contains(&self, handle: JointHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Look up a joint.
    pub fn get(&self, handle: JointHandle) -> Result<&Joint> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.joint.as_ref())
            .ok_or_else(|| handle.invalid())
    }

    /// Look up a joint mutably.
    ///
    /// This bypasses the step check; it is meant for the step driver.
    /// External callers go through [`JointSet::set_target`] and
    /// [`JointSet::set_parameter`].
    pub fn get_mut(&mut self, handle: JointHandle) -> Result<&mut Joint> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.joint.as_mut())
            .ok_or_else(|| handle.invalid())
    }

    /// Iterate over live joints and their handles.
    pub fn iter(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let index = u32::try_from(i).unwrap_or(u32::MAX);
            slot.joint
                .as_ref()
                .map(|joint| (JointHandle::from_raw_parts(index, slot.generation), joint))
        })
    }

    /// Iterate over live joints mutably, in slot order.
    pub fn joints_mut(&mut self) -> impl Iterator<Item = &mut Joint> {
        self.slots.iter_mut().filter_map(|slot| slot.joint.as_mut())
    }

    /// Move a joint's target point.
    ///
    /// Rejected with [`SimError::StepInProgress`] while `state` reports a
    /// step in progress, and with [`SimError::InvalidJointHandle`] for a
    /// stale handle. A rejected call changes nothing. The new target is
    /// picked up by the next step's initialize.
    pub fn set_target(
        &mut self,
        state: &SimulationState,
        handle: JointHandle,
        target: Point2<f64>,
    ) -> Result<()> {
        self.set_parameter(state, handle, JointParameter::Target(target))
    }

    /// Change a joint parameter, under the same rules as
    /// [`JointSet::set_target`].
    pub fn set_parameter(
        &mut self,
        state: &SimulationState,
        handle: JointHandle,
        parameter: JointParameter,
    ) -> Result<()> {
        if state.is_stepping() {
            warn!(%handle, ?parameter, "joint mutation rejected: simulation step in progress");
            return Err(SimError::StepInProgress);
        }

        let joint = self.get_mut(handle).map_err(|err| {
            warn!(%handle, ?parameter, "joint mutation rejected: stale or unknown handle");
            err
        })?;
        joint.set_parameter(parameter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mouse::{MouseJoint, MouseJointDef};
    use sim_types::BodyId;

    fn mouse(body: u64) -> MouseJoint {
        MouseJoint::new(&MouseJointDef::new(BodyId::new(body))).unwrap()
    }

    fn target_of(set: &JointSet, handle: JointHandle) -> Point2<f64> {
        set.get(handle).unwrap().as_mouse().unwrap().target()
    }

    #[test]
    fn test_insert_and_get() {
        let mut set = JointSet::new();
        let a = set.insert(mouse(1));
        let b = set.insert(mouse(2));

        assert_eq!(set.len(), 2);
        assert_ne!(a, b);
        assert_eq!(SolverJoint::body(set.get(a).unwrap()), BodyId::new(1));
        assert_eq!(SolverJoint::body(set.get(b).unwrap()), BodyId::new(2));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut set = JointSet::new();
        let old = set.insert(mouse(1));
        set.remove(old).unwrap();
        assert!(set.is_empty());

        // Slot is recycled with a new generation
        let new = set.insert(mouse(2));
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());

        let err = set
            .set_target(&SimulationState::idle(), old, Point2::new(9.0, 9.0))
            .unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidJointHandle {
                index: old.index(),
                generation: old.generation()
            }
        );
        assert_eq!(target_of(&set, new), Point2::origin());
        assert!(set.remove(old).is_err());
        assert!(!set.contains(old));
        assert!(set.contains(new));
    }

    #[test]
    fn test_unknown_handle_is_rejected() {
        let mut set = JointSet::new();
        let handle = JointHandle::from_raw_parts(7, 0);
        assert!(set.get(handle).is_err());
        assert!(set
            .set_target(&SimulationState::idle(), handle, Point2::origin())
            .is_err());
    }

    #[test]
    fn test_free_slots_reused_lowest_first() {
        let mut set = JointSet::new();
        let handles: Vec<_> = (0..4).map(|i| set.insert(mouse(i))).collect();
        set.remove(handles[3]).unwrap();
        set.remove(handles[1]).unwrap();

        assert_eq!(set.insert(mouse(10)).index(), 1);
        assert_eq!(set.insert(mouse(11)).index(), 3);
        assert_eq!(set.insert(mouse(12)).index(), 4);
    }

    #[test]
    fn test_set_target_between_steps() {
        let mut set = JointSet::new();
        let handle = set.insert(mouse(1));

        set.set_target(&SimulationState::idle(), handle, Point2::new(2.0, 3.0))
            .unwrap();
        assert_eq!(target_of(&set, handle), Point2::new(2.0, 3.0));
    }

    #[test]
    fn test_rejection_while_stepping_is_idempotent() {
        let mut set = JointSet::new();
        let handle = set.insert(mouse(1));
        let stepping = SimulationState::stepping();

        for i in 0..10 {
            let err = set
                .set_target(&stepping, handle, Point2::new(f64::from(i), 1.0))
                .unwrap_err();
            assert_eq!(err, SimError::StepInProgress);
            assert_eq!(target_of(&set, handle), Point2::origin());
        }

        let err = set
            .set_parameter(&stepping, handle, JointParameter::MaxForce(5.0))
            .unwrap_err();
        assert_eq!(err, SimError::StepInProgress);
    }

    #[test]
    fn test_step_check_precedes_handle_check() {
        let mut set = JointSet::new();
        let err = set
            .set_target(
                &SimulationState::stepping(),
                JointHandle::from_raw_parts(0, 0),
                Point2::origin(),
            )
            .unwrap_err();
        assert_eq!(err, SimError::StepInProgress);
    }
}
