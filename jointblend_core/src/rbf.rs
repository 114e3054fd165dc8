//! Radial basis function quaternion interpolation.
//!
//! The alternative, higher-fidelity path. For `n` neighbors the `n × n`
//! Gaussian kernel matrix `K[i][j] = exp(-ε·|p_i - p_j|²)` is factored once
//! and solved against the four quaternion component vectors. Evaluating the
//! resulting interpolant at a neighbor's own position reproduces that
//! neighbor's quaternion exactly, unlike IDW which only smooths.
//!
//! # Numerics
//!
//! With distinct positions the Gaussian kernel matrix is symmetric positive
//! definite, so it is factored with Cholesky. Coinciding (or nearly
//! coinciding) positions make it singular. That is reported as
//! [`InterpolationError::SingularSystem`] so the caller can fall back to IDW.

use crate::error::{InterpolationError, Result};
use crate::neighbors::Neighbor;
use crate::quat_math::{align_to_first, normalize_or_identity, EulerConvention, Interpolated, RBF_NORM_THRESHOLD};
use jointblend_env::SamplePoint;
use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector4};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Smallest Cholesky pivot accepted before the system counts as singular.
const MIN_PIVOT: f64 = 1e-12;

/// Tuning for the RBF interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbfConfig {
    /// Gaussian shape parameter ε (larger = more local)
    pub shape: f64,

    /// Positions closer than this are treated as duplicates
    pub duplicate_tolerance: f64,
}

impl Default for RbfConfig {
    fn default() -> Self {
        Self {
            shape: 1.0,
            duplicate_tolerance: 1e-9,
        }
    }
}

impl RbfConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.shape.is_finite() || self.shape <= 0.0 {
            return Err(InterpolationError::InvalidShape(self.shape));
        }
        Ok(())
    }
}

/// Gaussian kernel `exp(-shape · distance²)`.
#[inline]
pub fn gaussian(distance: f64, shape: f64) -> f64 {
    (-shape * distance * distance).exp()
}

/// Symmetric kernel matrix over `positions`. The diagonal is exactly 1.
pub fn kernel_matrix(positions: &[SamplePoint], shape: f64) -> DMatrix<f64> {
    let n = positions.len();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            gaussian(nalgebra::distance(&positions[i], &positions[j]), shape)
        }
    })
}

/// A solved RBF system, evaluable at any target.
///
/// Stores one coefficient column per quaternion component, in `[x, y, z, w]`
/// order.
#[derive(Debug, Clone)]
pub struct RbfFit {
    positions: Vec<SamplePoint>,
    shape: f64,
    coefficients: DMatrix<f64>,
}

impl RbfFit {
    /// Solves for the coefficients reproducing `quaternions` at `positions`.
    ///
    /// Quaternions are hemisphere-aligned against the first entry before the
    /// solve; already-aligned input is left unchanged.
    pub fn solve(
        positions: &[SamplePoint],
        quaternions: &[UnitQuaternion<f64>],
        config: &RbfConfig,
    ) -> Result<Self> {
        config.validate()?;
        if positions.len() != quaternions.len() {
            return Err(InterpolationError::LengthMismatch {
                expected: positions.len(),
                found: quaternions.len(),
            });
        }
        if positions.is_empty() {
            return Err(InterpolationError::InsufficientSamples { needed: 1, found: 0 });
        }

        check_duplicates(positions, config.duplicate_tolerance)?;

        let n = positions.len();
        let kernel = kernel_matrix(positions, config.shape);

        let aligned = align_to_first(quaternions);
        let rhs = DMatrix::from_fn(n, 4, |i, c| aligned[i].coords[c]);

        let cholesky = kernel
            .cholesky()
            .ok_or_else(|| InterpolationError::singular("kernel matrix is not positive definite"))?;

        let min_pivot = cholesky
            .l()
            .diagonal()
            .iter()
            .map(|d| d * d)
            .fold(f64::INFINITY, f64::min);
        if min_pivot < MIN_PIVOT {
            return Err(InterpolationError::singular(format!(
                "pivot {:e} below {:e}",
                min_pivot, MIN_PIVOT
            )));
        }

        let coefficients = cholesky.solve(&rhs);
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InterpolationError::singular("non-finite coefficients"));
        }

        trace!("RBF solve: n={} shape={} min_pivot={:e}", n, config.shape, min_pivot);

        Ok(Self {
            positions: positions.to_vec(),
            shape: config.shape,
            coefficients,
        })
    }

    /// Evaluates the interpolant at `target` and normalizes.
    pub fn evaluate(&self, target: &SamplePoint) -> Interpolated {
        let basis = DVector::from_iterator(
            self.positions.len(),
            self.positions
                .iter()
                .map(|p| gaussian(nalgebra::distance(p, target), self.shape)),
        );
        let sums = self.coefficients.tr_mul(&basis);
        let result = normalize_or_identity(Vector4::new(sums[0], sums[1], sums[2], sums[3]), RBF_NORM_THRESHOLD);

        if let Some(fallback) = result.fallback {
            debug!("RBF evaluation fell back to identity: {:?}", fallback);
        }
        result
    }

    /// Number of samples in the system.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `n × 4` coefficient matrix, columns in `[x, y, z, w]` order.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }
}

fn check_duplicates(positions: &[SamplePoint], tolerance: f64) -> Result<()> {
    for (i, a) in positions.iter().enumerate() {
        for (j, b) in positions.iter().enumerate().skip(i + 1) {
            if nalgebra::distance(a, b) <= tolerance {
                return Err(InterpolationError::singular(format!(
                    "samples {} and {} coincide at ({:.6}, {:.6}, {:.6})",
                    i, j, a.x, a.y, a.z
                )));
            }
        }
    }
    Ok(())
}

/// RBF interpolator for one joint at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbfInterpolator {
    config: RbfConfig,
    convention: EulerConvention,
}

impl RbfInterpolator {
    pub fn new(config: RbfConfig, convention: EulerConvention) -> Self {
        Self { config, convention }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &RbfConfig {
        &self.config
    }

    /// Interpolates at `target` from parallel position and quaternion slices.
    pub fn interpolate(
        &self,
        target: &SamplePoint,
        positions: &[SamplePoint],
        quaternions: &[UnitQuaternion<f64>],
    ) -> Result<UnitQuaternion<f64>> {
        self.interpolate_detailed(target, positions, quaternions)
            .map(|result| result.rotation)
    }

    /// Like [`interpolate`](Self::interpolate), also reporting fallbacks.
    ///
    /// No samples yields the identity rotation rather than an error.
    pub fn interpolate_detailed(
        &self,
        target: &SamplePoint,
        positions: &[SamplePoint],
        quaternions: &[UnitQuaternion<f64>],
    ) -> Result<Interpolated> {
        self.config.validate()?;
        if positions.len() != quaternions.len() {
            return Err(InterpolationError::LengthMismatch {
                expected: positions.len(),
                found: quaternions.len(),
            });
        }
        if positions.is_empty() {
            return Ok(Interpolated::identity(crate::error::Fallback::EmptyNeighborSet));
        }

        let fit = RbfFit::solve(positions, quaternions, &self.config)?;
        Ok(fit.evaluate(target))
    }

    /// Interpolates `joint_index` from a neighbor set.
    pub fn interpolate_neighbors(
        &self,
        target: &SamplePoint,
        neighbors: &[Neighbor<'_>],
        joint_index: usize,
    ) -> Result<Interpolated> {
        let mut positions = Vec::with_capacity(neighbors.len());
        let mut quaternions = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            positions.push(neighbor.position);
            quaternions.push(self.convention.to_quaternion(neighbor.rotation(joint_index)?));
        }

        self.interpolate_detailed(target, &positions, &quaternions)
    }
}
