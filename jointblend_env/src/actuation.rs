//! Actuation layer abstraction.
//!
//! The engine never touches a physics body directly. It hands one local
//! rotation target per joint to a [`JointActuator`], which owns whatever
//! drives the real or simulated manipulator.

use nalgebra::UnitQuaternion;

/// Receives per-joint rotation targets.
pub trait JointActuator {
    /// Applies a local rotation target to the joint at `joint_index`.
    fn apply_rotation(&mut self, joint_index: usize, rotation: UnitQuaternion<f64>);
}

/// Actuator that just remembers the last rotation sent to each joint.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    rotations: Vec<Option<UnitQuaternion<f64>>>,
    applied: usize,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last rotation applied to `joint_index`, if any.
    pub fn rotation(&self, joint_index: usize) -> Option<UnitQuaternion<f64>> {
        self.rotations.get(joint_index).copied().flatten()
    }

    /// Number of joints that have received at least one rotation.
    pub fn joint_count(&self) -> usize {
        self.rotations.iter().filter(|r| r.is_some()).count()
    }

    /// Total number of `apply_rotation` calls.
    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl JointActuator for RecordingActuator {
    fn apply_rotation(&mut self, joint_index: usize, rotation: UnitQuaternion<f64>) {
        if self.rotations.len() <= joint_index {
            self.rotations.resize(joint_index + 1, None);
        }
        self.rotations[joint_index] = Some(rotation);
        self.applied += 1;
    }
}
