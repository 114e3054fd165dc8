//! Inverse-distance-weighted quaternion interpolation.
//!
//! The primary real-time path: each neighbor's rotation for one joint is
//! converted to a quaternion, aligned to the first neighbor's hemisphere,
//! weighted by `1 / (distance + ε)` and averaged component-wise.
//!
//! This is not a geodesic mean. It is close to one when the neighbors are
//! close together, which holds on a dense calibration grid.

use crate::error::{InterpolationError, Result};
use crate::neighbors::Neighbor;
use crate::quat_math::{weighted_average, EulerConvention, Interpolated};
use jointblend_env::SamplePoint;
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tuning for the IDW interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwConfig {
    /// Added to every distance so a target on a sample doesn't divide by zero
    pub epsilon: f64,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self { epsilon: 1e-6 }
    }
}

/// Normalized inverse-distance weights, `w_i ∝ 1 / (d_i + ε)`.
///
/// The result sums to 1. If some weights are infinite (`ε = 0` with a
/// target exactly on a sample) those samples share the weight equally.
pub fn inverse_distance_weights(distances: &[f64], epsilon: f64) -> Vec<f64> {
    let raw: Vec<f64> = distances.iter().map(|d| 1.0 / (d + epsilon)).collect();

    let exact = raw.iter().filter(|w| w.is_infinite()).count();
    if exact > 0 {
        let share = 1.0 / exact as f64;
        return raw
            .iter()
            .map(|w| if w.is_infinite() { share } else { 0.0 })
            .collect();
    }

    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| w / total).collect()
}

/// IDW interpolator for one joint at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdwInterpolator {
    config: IdwConfig,
    convention: EulerConvention,
}

impl IdwInterpolator {
    pub fn new(config: IdwConfig, convention: EulerConvention) -> Self {
        Self { config, convention }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &IdwConfig {
        &self.config
    }

    /// Interpolates `joint_index` at `target` from a neighbor set.
    ///
    /// An empty neighbor set yields the identity rotation.
    pub fn interpolate(
        &self,
        target: &SamplePoint,
        neighbors: &[Neighbor<'_>],
        joint_index: usize,
    ) -> Result<UnitQuaternion<f64>> {
        self.interpolate_detailed(target, neighbors, joint_index)
            .map(|result| result.rotation)
    }

    /// Like [`interpolate`](Self::interpolate), but also reports whether the
    /// identity fallback was taken.
    pub fn interpolate_detailed(
        &self,
        target: &SamplePoint,
        neighbors: &[Neighbor<'_>],
        joint_index: usize,
    ) -> Result<Interpolated> {
        let mut positions = Vec::with_capacity(neighbors.len());
        let mut quaternions = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let angles = neighbor.rotation(joint_index)?;
            positions.push(neighbor.position);
            quaternions.push(self.convention.to_quaternion(angles));
        }

        self.blend(target, &positions, &quaternions)
    }

    /// Blends quaternions already paired with their sample positions.
    ///
    /// Distances are measured from `target`, so this works for any sample
    /// set, not just the output of [`find_nearest`](crate::find_nearest).
    pub fn blend(
        &self,
        target: &SamplePoint,
        positions: &[SamplePoint],
        quaternions: &[UnitQuaternion<f64>],
    ) -> Result<Interpolated> {
        if positions.len() != quaternions.len() {
            return Err(InterpolationError::LengthMismatch {
                expected: positions.len(),
                found: quaternions.len(),
            });
        }

        let distances: Vec<f64> = positions
            .iter()
            .map(|p| nalgebra::distance(p, target))
            .collect();
        let weights = inverse_distance_weights(&distances, self.config.epsilon);

        let result = weighted_average(quaternions, &weights)?;
        if let Some(fallback) = result.fallback {
            debug!("IDW fell back to identity: {:?} ({} samples)", fallback, positions.len());
        }
        Ok(result)
    }
}
