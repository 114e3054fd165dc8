//! Slider-driven SLERP over a structured calibration grid.
//!
//! When the samples lie on axis-aligned lines, a target can be reached by
//! chaining SLERPs instead of a neighbor query: along X within a line, then
//! between two lines (Z), then between two planes (Y). Each stage takes a
//! factor in `[0, 1]`.

use crate::dataset::{DatasetEntry, PoseDataset};
use crate::error::{InterpolationError, Result};
use crate::quat_math::{slerp, EulerConvention};
use jointblend_env::SamplePoint;
use nalgebra::UnitQuaternion;

/// Coordinates closer than this are on the same grid line.
const LINE_TOLERANCE: f64 = 1e-9;

/// Dataset entries on one line, sorted by ascending X.
#[derive(Debug, Clone)]
pub struct GridLine<'a> {
    entries: Vec<&'a DatasetEntry>,
}

impl<'a> GridLine<'a> {
    /// Builds a line from the entries whose position satisfies `predicate`.
    pub fn select<F>(dataset: &'a PoseDataset, predicate: F) -> Self
    where
        F: Fn(&SamplePoint) -> bool,
    {
        Self::from_entries(dataset.iter().filter(|e| predicate(&e.position)).collect())
    }

    /// The line running along X at fixed `y` and `z`.
    pub fn along_x(dataset: &'a PoseDataset, y: f64, z: f64) -> Self {
        Self::select(dataset, |p| {
            (p.y - y).abs() <= LINE_TOLERANCE && (p.z - z).abs() <= LINE_TOLERANCE
        })
    }

    pub fn from_entries(mut entries: Vec<&'a DatasetEntry>) -> Self {
        entries.sort_by(|a, b| a.position.x.total_cmp(&b.position.x));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &SamplePoint> {
        self.entries.iter().map(|e| &e.position)
    }
}

/// Two lines spanning a plane of constant Y.
#[derive(Debug, Clone)]
pub struct GridPlane<'a> {
    pub near: GridLine<'a>,
    pub far: GridLine<'a>,
}

impl<'a> GridPlane<'a> {
    /// The plane at height `y`, between the lines at `z_near` and `z_far`.
    pub fn at(dataset: &'a PoseDataset, y: f64, z_near: f64, z_far: f64) -> Self {
        Self {
            near: GridLine::along_x(dataset, y, z_near),
            far: GridLine::along_x(dataset, y, z_far),
        }
    }
}

/// Chained SLERP along grid lines, planes and volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSlerp {
    convention: EulerConvention,
}

impl GridSlerp {
    pub fn new(convention: EulerConvention) -> Self {
        Self { convention }
    }

    /// SLERP along a line.
    ///
    /// `t = 0` is the lowest-X entry and `t = 1` the highest; in between,
    /// `s = t·(n−1)` picks the segment `⌊s⌋` and the factor `s − ⌊s⌋`.
    pub fn slerp_along_line(&self, line: &GridLine<'_>, t: f64, joint_index: usize) -> Result<UnitQuaternion<f64>> {
        let n = line.len();
        if n < 2 {
            return Err(InterpolationError::InsufficientSamples { needed: 2, found: n });
        }

        let s = clamp_factor(t) * (n - 1) as f64;
        let segment = (s.floor() as usize).min(n - 2);
        let local = s - segment as f64;

        let start = self.joint_rotation(line.entries[segment], joint_index)?;
        let end = self.joint_rotation(line.entries[segment + 1], joint_index)?;
        Ok(slerp(&start, &end, local))
    }

    /// SLERP along both lines by `tx`, then between them by `tz`.
    pub fn slerp_across_lines(
        &self,
        plane: &GridPlane<'_>,
        tx: f64,
        tz: f64,
        joint_index: usize,
    ) -> Result<UnitQuaternion<f64>> {
        let near = self.slerp_along_line(&plane.near, tx, joint_index)?;
        let far = self.slerp_along_line(&plane.far, tx, joint_index)?;
        Ok(slerp(&near, &far, clamp_factor(tz)))
    }

    /// Interpolates both planes, then SLERPs between them by `ty`.
    pub fn slerp_across_planes(
        &self,
        bottom: &GridPlane<'_>,
        top: &GridPlane<'_>,
        factors: [f64; 3],
        joint_index: usize,
    ) -> Result<UnitQuaternion<f64>> {
        let [tx, ty, tz] = factors;
        let lower = self.slerp_across_lines(bottom, tx, tz, joint_index)?;
        let upper = self.slerp_across_lines(top, tx, tz, joint_index)?;
        Ok(slerp(&lower, &upper, clamp_factor(ty)))
    }

    fn joint_rotation(&self, entry: &DatasetEntry, joint_index: usize) -> Result<UnitQuaternion<f64>> {
        entry
            .rotations
            .get(joint_index)
            .map(|angles| self.convention.to_quaternion(angles))
            .ok_or(InterpolationError::JointIndexOutOfRange {
                joint_index,
                available: entry.rotations.len(),
            })
    }
}

fn clamp_factor(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}
