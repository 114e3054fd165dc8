//! Error and fallback taxonomy for the interpolation engine.

use serde::{Deserialize, Serialize};

/// Errors that can occur while interpolating a joint rotation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    /// A neighbor's rotation table is shorter than the requested joint
    #[error("Joint index {joint_index} out of range: sample has {available} joints")]
    JointIndexOutOfRange { joint_index: usize, available: usize },

    /// The RBF kernel matrix cannot be inverted (duplicate positions)
    #[error("RBF kernel matrix is singular: {reason}")]
    SingularSystem { reason: String },

    /// Parallel input slices disagree in length
    #[error("Length mismatch: expected {expected} entries, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Gaussian shape parameter must be finite and positive
    #[error("Invalid RBF shape parameter: {0}")]
    InvalidShape(f64),

    /// Not enough samples to interpolate along a grid line
    #[error("Insufficient samples: need {needed}, found {found}")]
    InsufficientSamples { needed: usize, found: usize },
}

impl InterpolationError {
    pub fn singular(reason: impl Into<String>) -> Self {
        Self::SingularSystem {
            reason: reason.into(),
        }
    }

    /// Diagnostic kind, if this error belongs to the documented taxonomy.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::JointIndexOutOfRange { .. } => Some(FailureKind::JointIndexOutOfRange),
            Self::SingularSystem { .. } => Some(FailureKind::SingularSystem),
            _ => None,
        }
    }
}

/// Degenerate cases recovered locally by returning the identity rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fallback {
    /// No neighbors were supplied
    EmptyNeighborSet,

    /// The blended 4-vector was too short to normalize
    DegenerateNormalization,
}

/// Every way a joint can end up without a proper interpolated rotation.
///
/// Used for logging and per-joint diagnostics in a pose solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    EmptyNeighborSet,
    JointIndexOutOfRange,
    SingularSystem,
    DegenerateNormalization,
}

impl From<Fallback> for FailureKind {
    fn from(fallback: Fallback) -> Self {
        match fallback {
            Fallback::EmptyNeighborSet => FailureKind::EmptyNeighborSet,
            Fallback::DegenerateNormalization => FailureKind::DegenerateNormalization,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::EmptyNeighborSet => "empty_neighbor_set",
            FailureKind::JointIndexOutOfRange => "joint_index_out_of_range",
            FailureKind::SingularSystem => "singular_system",
            FailureKind::DegenerateNormalization => "degenerate_normalization",
        };
        write!(f, "{}", name)
    }
}

pub type Result<T> = std::result::Result<T, InterpolationError>;
