//! Validation Module - Angular Error Against Known Rotations
//! ===========================================================
//!
//! Tools for checking interpolated poses against rotations that are known to
//! be right: recorded samples held out of the dataset, or a SLERP reference.
//!
//! Key metrics:
//! - Angular error per joint (RMS, mean, max)
//! - Failed joints (interpolation errors, not fallbacks)
//! - Solve latency
//!
//! Usage:
//! ```ignore
//! use jointblend_core::validation::leave_one_out;
//!
//! let report = leave_one_out(&dataset, &driver);
//! report.print();
//! ```

use crate::dataset::PoseDataset;
use crate::driver::{PoseDriver, PoseSolution};
use crate::quat_math::slerp;
use nalgebra::UnitQuaternion;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

pub use crate::quat_math::angular_distance;

// =============================================================================
// REFERENCE CHECKS
// =============================================================================

/// Angle (radians) between `result` and the SLERP from `a` to `b` at `t`.
pub fn slerp_agreement(
    result: &UnitQuaternion<f64>,
    a: &UnitQuaternion<f64>,
    b: &UnitQuaternion<f64>,
    t: f64,
) -> f64 {
    angular_distance(result, &slerp(a, b, t))
}

// =============================================================================
// VALIDATION METRICS
// =============================================================================

/// Per-joint error statistics (radians)
#[derive(Debug, Clone, Serialize)]
pub struct JointErrorStats {
    /// Number of rotations compared
    pub sample_count: usize,
    /// Sum of squared errors (for RMS)
    pub error_sum_squared: f64,
    /// Sum of errors (for mean)
    pub error_sum: f64,
    /// Largest error observed
    pub max_error: f64,
    /// Number of samples where the joint failed to interpolate
    pub failed_count: usize,
}

impl JointErrorStats {
    pub fn new() -> Self {
        Self {
            sample_count: 0,
            error_sum_squared: 0.0,
            error_sum: 0.0,
            max_error: 0.0,
            failed_count: 0,
        }
    }

    pub fn record(&mut self, error: f64) {
        self.sample_count += 1;
        self.error_sum_squared += error * error;
        self.error_sum += error;
        self.max_error = self.max_error.max(error);
    }

    /// Root mean square error
    pub fn rms(&self) -> f64 {
        if self.sample_count > 0 {
            (self.error_sum_squared / self.sample_count as f64).sqrt()
        } else {
            0.0
        }
    }

    pub fn mean(&self) -> f64 {
        if self.sample_count > 0 {
            self.error_sum / self.sample_count as f64
        } else {
            0.0
        }
    }

    fn merge(&mut self, other: &JointErrorStats) {
        self.sample_count += other.sample_count;
        self.error_sum_squared += other.error_sum_squared;
        self.error_sum += other.error_sum;
        self.max_error = self.max_error.max(other.max_error);
        self.failed_count += other.failed_count;
    }
}

impl Default for JointErrorStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// VALIDATION SESSION
// =============================================================================

/// Collects solved poses and their expected rotations
#[derive(Debug, Clone, Default)]
pub struct ValidationSession {
    per_joint: Vec<JointErrorStats>,
    poses: usize,
    latency_samples: Vec<f64>,
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn joint_mut(&mut self, joint_index: usize) -> &mut JointErrorStats {
        if self.per_joint.len() <= joint_index {
            self.per_joint.resize_with(joint_index + 1, JointErrorStats::new);
        }
        &mut self.per_joint[joint_index]
    }

    /// Records the angular error of one joint
    pub fn record_error(&mut self, joint_index: usize, error: f64) {
        self.joint_mut(joint_index).record(error);
    }

    /// Records a joint that failed to interpolate
    pub fn record_failure(&mut self, joint_index: usize) {
        self.joint_mut(joint_index).failed_count += 1;
    }

    /// Compares a solved pose joint by joint against `expected`.
    ///
    /// Failed joints count as failures, not as errors.
    pub fn record_solution(&mut self, solution: &PoseSolution, expected: &[UnitQuaternion<f64>]) {
        for (joint, truth) in solution.joints.iter().zip(expected) {
            if joint.is_failed() {
                self.record_failure(joint.joint_index);
            } else {
                self.record_error(joint.joint_index, angular_distance(&joint.rotation, truth));
            }
        }
        self.poses += 1;
    }

    pub fn record_latency(&mut self, elapsed: Duration) {
        self.latency_samples.push(elapsed.as_secs_f64());
    }

    pub fn generate_report(&self) -> ValidationReport {
        let mut overall = JointErrorStats::new();
        for stats in &self.per_joint {
            overall.merge(stats);
        }

        let mut sorted = self.latency_samples.clone();
        sorted.sort_by(f64::total_cmp);
        let p95 = if sorted.is_empty() {
            0.0
        } else {
            let idx = (0.95 * sorted.len() as f64) as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        let mean_latency = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        ValidationReport {
            poses: self.poses,
            samples: overall.sample_count,
            failed_joints: overall.failed_count,
            rms_error: overall.rms(),
            mean_error: overall.mean(),
            max_error: overall.max_error,
            mean_latency_ms: mean_latency * 1000.0,
            p95_latency_ms: p95 * 1000.0,
            per_joint: self.per_joint.clone(),
        }
    }
}

// =============================================================================
// LEAVE-ONE-OUT
// =============================================================================

/// Holds out each sample in turn and solves at its position from the rest.
///
/// Errors are measured against the held-out rotations, so this estimates how
/// well the engine predicts poses it has not seen.
pub fn leave_one_out(dataset: &PoseDataset, driver: &PoseDriver) -> ValidationReport {
    let convention = driver.config().euler_convention;
    let mut session = ValidationSession::new();

    for (slot, entry) in dataset.iter().enumerate() {
        let rest = dataset.excluding(slot);

        let start = Instant::now();
        let solution = driver.solve_joints(&rest, &entry.position, entry.rotations.len());
        session.record_latency(start.elapsed());

        let expected: Vec<UnitQuaternion<f64>> = entry
            .rotations
            .iter()
            .map(|angles| convention.to_quaternion(angles))
            .collect();
        session.record_solution(&solution, &expected);
    }

    let report = session.generate_report();
    debug!(
        "Leave-one-out over {} poses: rms={:.4} rad max={:.4} rad failed={}",
        report.poses, report.rms_error, report.max_error, report.failed_joints
    );
    report
}

// =============================================================================
// VALIDATION REPORT
// =============================================================================

/// Final validation report (errors in radians)
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub poses: usize,
    pub samples: usize,
    pub failed_joints: usize,
    pub rms_error: f64,
    pub mean_error: f64,
    pub max_error: f64,
    pub mean_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub per_joint: Vec<JointErrorStats>,
}

impl ValidationReport {
    /// Print formatted report to console
    pub fn print(&self) {
        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║               JOINTBLEND VALIDATION REPORT                   ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Poses:                 {:>10}                            ║", self.poses);
        println!("║ Joint Samples:         {:>10}                            ║", self.samples);
        println!("║ Failed Joints:         {:>10}                            ║", self.failed_joints);
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ RMS Error:             {:>10.3}°                           ║", self.rms_error.to_degrees());
        println!("║ Mean Error:            {:>10.3}°                           ║", self.mean_error.to_degrees());
        println!("║ Max Error:             {:>10.3}°                           ║", self.max_error.to_degrees());
        println!("║ Mean Latency:          {:>10.3} ms                         ║", self.mean_latency_ms);
        println!("║ P95 Latency:           {:>10.3} ms                         ║", self.p95_latency_ms);
        println!("╚══════════════════════════════════════════════════════════════╝");

        if !self.per_joint.is_empty() {
            println!();
            println!("  Joint    Samples    RMS (°)    Max (°)    Failed");
            println!("─────────────────────────────────────────────────────");
            for (joint, stats) in self.per_joint.iter().enumerate() {
                println!(
                    "  {:>5}    {:>7}    {:>7.3}    {:>7.3}    {:>6}",
                    joint,
                    stats.sample_count,
                    stats.rms().to_degrees(),
                    stats.max_error.to_degrees(),
                    stats.failed_count
                );
            }
        }
    }

    /// Check if validation passes acceptance criteria
    pub fn passes_criteria(&self, max_rms_error: f64, max_failed_joints: usize) -> bool {
        self.rms_error <= max_rms_error && self.failed_joints <= max_failed_joints
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, InterpolationMethod};
    use crate::quat_math::EulerConvention;
    use crate::rbf::RbfConfig;
    use jointblend_env::{EulerAngles, JointRotationSet, SamplePoint};

    fn q(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
        EulerConvention::Xyz.to_quaternion(&EulerAngles::new(x, y, z))
    }

    /// Dense grid where each joint's angles vary linearly with position.
    fn smooth_grid() -> PoseDataset {
        let mut dataset = PoseDataset::new();
        for i in 0..6 {
            for j in 0..6 {
                let (x, y) = (i as f64 * 0.2, j as f64 * 0.2);
                let rotations: JointRotationSet = vec![
                    EulerAngles::new(10.0 * x, 5.0 * y, 0.0),
                    EulerAngles::new(0.0, 8.0 * x + 4.0 * y, 3.0 * y),
                ];
                dataset.insert(SamplePoint::new(x, y, 0.0), rotations);
            }
        }
        dataset
    }

    #[test]
    fn test_joint_stats() {
        let mut stats = JointErrorStats::new();
        stats.record(0.3);
        stats.record(0.4);

        assert_eq!(stats.sample_count, 2);
        assert!((stats.mean() - 0.35).abs() < 1e-12);
        assert!((stats.rms() - (0.125f64).sqrt()).abs() < 1e-12);
        assert_eq!(stats.max_error, 0.4);
    }

    #[test]
    fn test_slerp_agreement_zero_for_slerp() {
        let a = q(0.0, 0.0, 0.0);
        let b = q(60.0, 10.0, 0.0);
        let reference = slerp(&a, &b, 0.3);
        assert!(slerp_agreement(&reference, &a, &b, 0.3) < 1e-12);
        assert!(slerp_agreement(&a, &a, &b, 1.0) > 0.5);
    }

    #[test]
    fn test_session_counts_failures_separately() {
        let mut session = ValidationSession::new();
        session.record_error(0, 0.1);
        session.record_failure(1);
        session.record_error(1, 0.2);

        let report = session.generate_report();
        assert_eq!(report.samples, 2);
        assert_eq!(report.failed_joints, 1);
        assert_eq!(report.per_joint.len(), 2);
        assert!((report.max_error - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationSession::new().generate_report();
        assert_eq!(report.samples, 0);
        assert_eq!(report.rms_error, 0.0);
        assert_eq!(report.p95_latency_ms, 0.0);
        assert!(report.passes_criteria(0.0, 0));
    }

    #[test]
    fn test_leave_one_out_idw_smooth_grid() {
        let dataset = smooth_grid();
        let report = leave_one_out(&dataset, &PoseDriver::with_defaults());

        assert_eq!(report.poses, 36);
        assert_eq!(report.samples, 72);
        assert_eq!(report.failed_joints, 0);
        // Grid spacing moves each joint by at most ~2.5°
        assert!(report.max_error < 5f64.to_radians(), "max = {}", report.max_error);
    }

    #[test]
    fn test_leave_one_out_rbf_smooth_grid() {
        let dataset = smooth_grid();
        // Shape sized to the 0.2 spacing so the kernel matrix stays well conditioned
        let driver = PoseDriver::new(EngineConfig {
            method: InterpolationMethod::Rbf,
            rbf: RbfConfig {
                shape: 25.0,
                ..RbfConfig::default()
            },
            ..EngineConfig::default()
        });
        let report = leave_one_out(&dataset, &driver);

        assert_eq!(report.failed_joints, 0);
        assert!(report.passes_criteria(10f64.to_radians(), 0));
    }
}
