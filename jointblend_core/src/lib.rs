//! JointBlend Core - Pose Interpolation Engine
//!
//! Synthesizes a joint configuration for an arbitrary end-effector target from
//! a set of recorded (target position → per-joint rotation) samples:
//! 1. **Selection**: the k nearest recorded samples by Euclidean distance
//! 2. **IDW blending**: hemisphere-corrected, inverse-distance-weighted quaternion average
//! 3. **RBF blending**: Gaussian kernel solve that reproduces every sample exactly
//!
//! Every rotation leaving the engine is a unit quaternion; degenerate inputs
//! produce the identity and a diagnostic, never a panic.

pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod grid;
pub mod idw;
pub mod neighbors;
pub mod quat_math;
pub mod rbf;
pub mod validation;

// Re-export key types for convenience
pub use config::{ConfigError, EngineConfig, InterpolationMethod};
pub use dataset::{DatasetEntry, PoseDataset};
pub use driver::{JointSolution, JointStatus, PoseDriver, PoseSolution};
pub use error::{FailureKind, Fallback, InterpolationError};
pub use grid::{GridLine, GridPlane, GridSlerp};
pub use idw::{inverse_distance_weights, IdwConfig, IdwInterpolator};
pub use neighbors::{find_nearest, Neighbor, NeighborSet};
pub use quat_math::{EulerConvention, Interpolated};
pub use rbf::{RbfConfig, RbfFit, RbfInterpolator};
pub use validation::{leave_one_out, ValidationReport};
