//! Common types shared between the engine and its collaborators.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A 3D sample position, used as a dataset key.
pub type SamplePoint = Point3<f64>;

/// A rotation triple in degrees, one angle per axis.
///
/// How the three angles compose into a rotation is decided by the
/// consumer (see `EulerConvention` in `jointblend_core`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerAngles {
    /// Creates a triple from degrees.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the triple converted to radians as `[x, y, z]`.
    pub fn to_radians(&self) -> [f64; 3] {
        [self.x.to_radians(), self.y.to_radians(), self.z.to_radians()]
    }

    /// Builds a triple from radians.
    pub fn from_radians(x: f64, y: f64, z: f64) -> Self {
        Self::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }
}

impl From<[f64; 3]> for EulerAngles {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Ordered per-joint rotations for one sample position.
pub type JointRotationSet = Vec<EulerAngles>;

/// A named joint rotation as it appears in a recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRotation {
    /// Joint name (e.g. "Link3")
    pub name: String,

    /// Local rotation in degrees
    pub rotation: EulerAngles,
}

impl JointRotation {
    pub fn new(name: impl Into<String>, rotation: EulerAngles) -> Self {
        Self {
            name: name.into(),
            rotation,
        }
    }
}

/// One recorded sample: where the end effector was, and every joint's pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// End-effector target position
    pub target: SamplePoint,

    /// Joint rotations in actuation order
    pub joints: Vec<JointRotation>,
}

impl PoseRecord {
    /// Creates a record with no joints.
    pub fn new(target: SamplePoint) -> Self {
        Self {
            target,
            joints: Vec::new(),
        }
    }

    /// Appends a joint rotation.
    pub fn with_joint(mut self, name: impl Into<String>, rotation: EulerAngles) -> Self {
        self.joints.push(JointRotation::new(name, rotation));
        self
    }

    /// Returns the rotations without names, in joint order.
    pub fn rotation_set(&self) -> JointRotationSet {
        self.joints.iter().map(|j| j.rotation).collect()
    }

    /// Returns the joint names in order.
    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }
}
