//! Pose application driver.
//!
//! Turns a target position into one rotation per joint: a single neighbor
//! query, then every joint interpolated on its own with the configured
//! method. A joint that fails gets the identity rotation and a status saying
//! why; the other joints are unaffected.

use crate::config::{EngineConfig, InterpolationMethod};
use crate::dataset::PoseDataset;
use crate::error::{Fallback, FailureKind, InterpolationError};
use crate::idw::IdwInterpolator;
use crate::neighbors::{find_nearest, Neighbor};
use crate::quat_math::{EulerConvention, Interpolated};
use crate::rbf::RbfInterpolator;
use jointblend_env::{EulerAngles, JointActuator, PoseRecord, SamplePoint};
use nalgebra::UnitQuaternion;
use tracing::{debug, warn};

/// How a joint's rotation was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum JointStatus {
    /// The configured interpolator succeeded
    Interpolated,

    /// The interpolator recovered a degenerate case with the identity
    Fallback(Fallback),

    /// RBF was singular and IDW produced the rotation instead
    FellBackToIdw,

    /// Interpolation failed; the joint gets the identity
    Failed(InterpolationError),
}

/// One joint's result.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSolution {
    pub joint_index: usize,
    pub rotation: UnitQuaternion<f64>,
    pub status: JointStatus,
}

impl JointSolution {
    /// Taxonomy kind for diagnostics, if the joint did not interpolate cleanly.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            JointStatus::Interpolated | JointStatus::FellBackToIdw => None,
            JointStatus::Fallback(fallback) => Some((*fallback).into()),
            JointStatus::Failed(err) => err.kind(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, JointStatus::Failed(_))
    }
}

/// Every joint's rotation for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSolution {
    pub target: SamplePoint,
    pub neighbor_count: usize,
    pub joints: Vec<JointSolution>,
}

impl PoseSolution {
    pub fn rotations(&self) -> Vec<UnitQuaternion<f64>> {
        self.joints.iter().map(|j| j.rotation).collect()
    }

    /// Joints that failed outright.
    pub fn failures(&self) -> impl Iterator<Item = &JointSolution> {
        self.joints.iter().filter(|j| j.is_failed())
    }

    /// True when no joint failed or fell back.
    pub fn is_clean(&self) -> bool {
        self.joints.iter().all(|j| j.failure_kind().is_none())
    }

    /// Rotations as Euler triples in `convention`.
    pub fn euler_angles(&self, convention: EulerConvention) -> Vec<EulerAngles> {
        self.joints
            .iter()
            .map(|j| convention.to_euler(&j.rotation))
            .collect()
    }

    /// Packs the solution as a record, ready for a `PoseRecorder`.
    ///
    /// Joints without a name are called `Joint{index}`.
    pub fn to_record(&self, joint_names: &[String], convention: EulerConvention) -> PoseRecord {
        self.joints.iter().fold(PoseRecord::new(self.target), |record, joint| {
            let name = joint_names
                .get(joint.joint_index)
                .cloned()
                .unwrap_or_else(|| format!("Joint{}", joint.joint_index));
            record.with_joint(name, convention.to_euler(&joint.rotation))
        })
    }
}

/// Solves and applies poses against a caller-owned dataset.
#[derive(Debug, Clone)]
pub struct PoseDriver {
    config: EngineConfig,
    idw: IdwInterpolator,
    rbf: RbfInterpolator,
}

impl PoseDriver {
    pub fn new(config: EngineConfig) -> Self {
        let idw = IdwInterpolator::new(config.idw, config.euler_convention);
        let rbf = RbfInterpolator::new(config.rbf, config.euler_convention);
        Self { config, idw, rbf }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Solves every joint the dataset records.
    ///
    /// Uses the longest rotation table, so a joint missing from some entry
    /// fails for that joint rather than being dropped.
    pub fn solve(&self, dataset: &PoseDataset, target: &SamplePoint) -> PoseSolution {
        self.solve_joints(dataset, target, dataset.max_joint_count())
    }

    /// Solves joints `0..joint_count`.
    pub fn solve_joints(&self, dataset: &PoseDataset, target: &SamplePoint, joint_count: usize) -> PoseSolution {
        let neighbors = find_nearest(dataset, target, self.config.k);

        let joints: Vec<JointSolution> = (0..joint_count)
            .map(|joint_index| self.solve_joint(target, &neighbors, joint_index))
            .collect();

        debug!(
            "Solved ({:.3}, {:.3}, {:.3}) with {}: {} neighbors, {} joints, {} failed",
            target.x,
            target.y,
            target.z,
            self.config.method,
            neighbors.len(),
            joints.len(),
            joints.iter().filter(|j| j.is_failed()).count()
        );

        PoseSolution {
            target: *target,
            neighbor_count: neighbors.len(),
            joints,
        }
    }

    /// Interpolates one joint from an existing neighbor set.
    pub fn solve_joint(&self, target: &SamplePoint, neighbors: &[Neighbor<'_>], joint_index: usize) -> JointSolution {
        let result = match self.config.method {
            InterpolationMethod::Idw => self
                .idw
                .interpolate_detailed(target, neighbors, joint_index)
                .map(|r| (r, false)),
            InterpolationMethod::Rbf => match self.rbf.interpolate_neighbors(target, neighbors, joint_index) {
                Err(InterpolationError::SingularSystem { reason }) if self.config.fallback_to_idw => {
                    warn!("Joint {}: RBF singular ({}), retrying with IDW", joint_index, reason);
                    self.idw
                        .interpolate_detailed(target, neighbors, joint_index)
                        .map(|r| (r, true))
                }
                other => other.map(|r| (r, false)),
            },
        };

        let (rotation, status) = match result {
            Ok((Interpolated { rotation, fallback: None }, retried)) => {
                let status = if retried {
                    JointStatus::FellBackToIdw
                } else {
                    JointStatus::Interpolated
                };
                (rotation, status)
            }
            Ok((Interpolated { rotation, fallback: Some(fallback) }, _)) => {
                warn!("Joint {}: {} fallback, using identity", joint_index, FailureKind::from(fallback));
                (rotation, JointStatus::Fallback(fallback))
            }
            Err(err) => {
                warn!("Joint {}: interpolation failed: {}", joint_index, err);
                (UnitQuaternion::identity(), JointStatus::Failed(err))
            }
        };

        JointSolution {
            joint_index,
            rotation,
            status,
        }
    }

    /// Solves and forwards every joint's rotation to `actuator`.
    ///
    /// Failed joints are sent the identity.
    pub fn apply<A>(&self, dataset: &PoseDataset, target: &SamplePoint, actuator: &mut A) -> PoseSolution
    where
        A: JointActuator + ?Sized,
    {
        let solution = self.solve(dataset, target);
        for joint in &solution.joints {
            actuator.apply_rotation(joint.joint_index, joint.rotation);
        }
        solution
    }
}

impl Default for PoseDriver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quat_math::angular_distance;
    use crate::rbf::RbfConfig;
    use jointblend_env::{JointRotationSet, RecordingActuator};

    fn angles(x: f64, y: f64, z: f64) -> EulerAngles {
        EulerAngles::new(x, y, z)
    }

    /// Three joints; joint j at x rotates `10·(j+1)·x` degrees about X.
    fn line_dataset() -> PoseDataset {
        (0..5)
            .map(|i| {
                let x = i as f64;
                let rotations: JointRotationSet = (0..3)
                    .map(|j| angles(10.0 * (j + 1) as f64 * x, 0.0, 0.0))
                    .collect();
                (SamplePoint::new(x, 0.0, 0.0), rotations)
            })
            .collect()
    }

    #[test]
    fn test_solve_every_joint() {
        let dataset = line_dataset();
        let solution = PoseDriver::with_defaults().solve(&dataset, &SamplePoint::new(2.0, 0.0, 0.0));

        assert_eq!(solution.joints.len(), 3);
        assert_eq!(solution.neighbor_count, 5);
        assert!(solution.is_clean());

        for (j, joint) in solution.joints.iter().enumerate() {
            assert_eq!(joint.joint_index, j);
            assert_eq!(joint.status, JointStatus::Interpolated);
            assert!((joint.rotation.coords.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_short_entry_fails_only_its_joint() {
        let mut dataset = line_dataset();
        dataset.insert(SamplePoint::new(2.5, 0.0, 0.0), vec![angles(5.0, 0.0, 0.0), angles(5.0, 0.0, 0.0)]);

        let solution = PoseDriver::with_defaults().solve(&dataset, &SamplePoint::new(2.4, 0.0, 0.0));

        assert_eq!(solution.joints.len(), 3);
        assert_eq!(solution.joints[0].status, JointStatus::Interpolated);
        assert_eq!(solution.joints[1].status, JointStatus::Interpolated);
        assert_eq!(solution.joints[2].rotation, UnitQuaternion::identity());
        assert_eq!(
            solution.joints[2].failure_kind(),
            Some(FailureKind::JointIndexOutOfRange)
        );
        assert_eq!(solution.failures().count(), 1);
    }

    #[test]
    fn test_apply_forwards_one_rotation_per_joint() {
        let dataset = line_dataset();
        let mut actuator = RecordingActuator::new();

        let solution = PoseDriver::with_defaults().apply(&dataset, &SamplePoint::new(1.0, 0.0, 0.0), &mut actuator);

        assert_eq!(actuator.applied(), 3);
        assert_eq!(actuator.joint_count(), 3);
        for joint in &solution.joints {
            assert_eq!(actuator.rotation(joint.joint_index), Some(joint.rotation));
        }
    }

    #[test]
    fn test_empty_dataset_gives_identity_fallbacks() {
        let dataset = PoseDataset::new();
        let driver = PoseDriver::with_defaults();

        assert!(driver.solve(&dataset, &SamplePoint::origin()).joints.is_empty());

        let solution = driver.solve_joints(&dataset, &SamplePoint::origin(), 2);
        assert_eq!(solution.neighbor_count, 0);
        for joint in &solution.joints {
            assert_eq!(joint.rotation, UnitQuaternion::identity());
            assert_eq!(joint.status, JointStatus::Fallback(Fallback::EmptyNeighborSet));
        }
    }

    fn near_duplicate_config(fallback_to_idw: bool) -> EngineConfig {
        EngineConfig {
            method: InterpolationMethod::Rbf,
            rbf: RbfConfig {
                duplicate_tolerance: 1e-3,
                ..RbfConfig::default()
            },
            fallback_to_idw,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_rbf_singular_without_fallback() {
        let mut dataset = line_dataset();
        dataset.insert(SamplePoint::new(1.0001, 0.0, 0.0), vec![angles(10.0, 0.0, 0.0); 3]);

        let solution = PoseDriver::new(near_duplicate_config(false)).solve(&dataset, &SamplePoint::new(1.0, 0.0, 0.0));
        for joint in &solution.joints {
            assert_eq!(joint.rotation, UnitQuaternion::identity());
            assert_eq!(joint.failure_kind(), Some(FailureKind::SingularSystem));
        }
    }

    #[test]
    fn test_rbf_singular_falls_back_to_idw() {
        let mut dataset = line_dataset();
        dataset.insert(SamplePoint::new(1.0001, 0.0, 0.0), vec![angles(10.0, 0.0, 0.0); 3]);

        let solution = PoseDriver::new(near_duplicate_config(true)).solve(&dataset, &SamplePoint::new(1.0, 0.0, 0.0));
        for joint in &solution.joints {
            assert_eq!(joint.status, JointStatus::FellBackToIdw);
            assert!(angular_distance(&joint.rotation, &UnitQuaternion::identity()) > 0.01);
        }
    }

    #[test]
    fn test_rbf_reproduces_sample() {
        let dataset = line_dataset();
        let config = EngineConfig {
            method: InterpolationMethod::Rbf,
            ..EngineConfig::default()
        };

        let solution = PoseDriver::new(config).solve(&dataset, &SamplePoint::new(3.0, 0.0, 0.0));
        let euler = solution.euler_angles(EulerConvention::Xyz);
        for (j, e) in euler.iter().enumerate() {
            assert!((e.x - 30.0 * (j + 1) as f64).abs() < 1e-3, "joint {}: {}", j, e.x);
        }
    }

    #[test]
    fn test_to_record_names_joints() {
        let dataset = line_dataset().with_joint_names(vec!["Shoulder".into(), "Elbow".into()]);
        let solution = PoseDriver::with_defaults().solve(&dataset, &SamplePoint::new(0.0, 0.0, 0.0));

        let record = solution.to_record(dataset.joint_names(), EulerConvention::Xyz);
        assert_eq!(record.target, SamplePoint::origin());
        assert_eq!(record.joint_names(), vec!["Shoulder", "Elbow", "Joint2"]);
    }

    #[test]
    fn test_dataset_shared_across_threads() {
        let dataset = line_dataset();
        let driver = PoseDriver::with_defaults();
        let target = SamplePoint::new(1.5, 0.0, 0.0);
        let sequential = driver.solve(&dataset, &target);
        let neighbors = find_nearest(&dataset, &target, driver.config().k);

        let parallel: Vec<JointSolution> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|j| {
                    let (driver, neighbors) = (&driver, &neighbors);
                    scope.spawn(move || driver.solve_joint(&target, neighbors, j))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(parallel, sequential.joints);
    }
}
