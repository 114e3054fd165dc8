//! Scenario runner - executes engine test scenarios.

use crate::calibration::{model_rotations, CalibrationGrid, GRID_X, GRID_Y, GRID_Z, JOINT_NAMES};
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;

use jointblend_core::validation::{leave_one_out, slerp_agreement, ValidationSession};
use jointblend_core::{
    find_nearest, EngineConfig, FailureKind, Fallback, GridPlane, GridSlerp, InterpolationMethod,
    JointStatus, PoseDataset, PoseDriver, RbfConfig,
};
use jointblend_env::{EulerAngles, SamplePoint};
use nalgebra::UnitQuaternion;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Angular RMS error accepted on a noise-free grid (degrees)
const MAX_RMS_ERROR_DEG: f64 = 5.0;

/// Per-pose time budget for one control tick (milliseconds)
const LATENCY_BUDGET_MS: f64 = 30.0;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

impl ScenarioResult {
    fn new(scenario: ScenarioId, seed: u64, metrics: ScenarioMetrics, failures: Vec<String>) -> Self {
        Self {
            scenario,
            seed,
            passed: failures.is_empty(),
            failure_reason: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
            metrics,
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Target positions solved
    pub poses_solved: usize,

    /// Joint rotations produced
    pub joints_solved: usize,

    /// Joints that failed to interpolate
    pub failed_joints: usize,

    /// Angular RMS error against known rotations (degrees)
    pub rms_error_deg: f64,

    /// Largest angular error (degrees)
    pub max_error_deg: f64,

    /// Slowest pose solve (ms); p95 for leave-one-out
    pub max_latency_ms: f64,
}

/// Runs engine scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Engine configuration under test
    config: EngineConfig,

    /// Noise on synthetic samples (degrees)
    noise_std_deg: f64,

    /// Random targets per sweep
    sweep_targets: usize,

    /// Recorded dataset to use instead of the synthetic grid
    dataset: Option<PoseDataset>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: EngineConfig::default(),
            noise_std_deg: 0.0,
            sweep_targets: 200,
            dataset: None,
        }
    }

    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sample noise.
    pub fn with_noise(mut self, std_deg: f64) -> Self {
        self.noise_std_deg = std_deg.max(0.0);
        self
    }

    /// Sets the number of random targets per sweep.
    pub fn with_targets(mut self, targets: usize) -> Self {
        self.sweep_targets = targets;
        self
    }

    /// Uses a recorded dataset for leave-one-out and latency runs.
    pub fn with_dataset(mut self, dataset: PoseDataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh generator for this runner's seed.
    pub fn calibration_grid(&self) -> CalibrationGrid {
        CalibrationGrid::new(self.seed).with_noise(self.noise_std_deg)
    }

    /// The recorded dataset if one was given, else the synthetic grid.
    pub fn dataset(&self) -> PoseDataset {
        match &self.dataset {
            Some(dataset) => dataset.clone(),
            None => self.calibration_grid().dataset(),
        }
    }

    /// RMS threshold, widened by the configured noise.
    fn max_rms_deg(&self) -> f64 {
        MAX_RMS_ERROR_DEG + 2.0 * self.noise_std_deg
    }

    fn driver_with(&self, method: InterpolationMethod) -> PoseDriver {
        PoseDriver::new(EngineConfig {
            method,
            ..self.config.clone()
        })
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!(
            "Starting scenario: {} (seed={}, method={})",
            scenario.name(),
            self.seed,
            self.config.method
        );
        if scenario.needs_model() && self.dataset.is_some() {
            warn!("{} always runs on the synthetic grid", scenario.name());
        }

        match scenario {
            ScenarioId::Midpoint => self.run_midpoint(),
            ScenarioId::GridSweep => self.run_grid_sweep(),
            ScenarioId::LeaveOneOut => self.run_leave_one_out(),
            ScenarioId::DuplicateSamples => self.run_duplicate_samples(),
            ScenarioId::EmptyDataset => self.run_empty_dataset(),
            ScenarioId::Latency => self.run_latency(),
        }
    }

    /// JB-001: Midpoint - two samples, 0° and 90° about X.
    ///
    /// **Assertion**: both methods give 44°-46° about X, Y and Z within 1e-3°,
    /// and IDW is within 0.1 rad of the SLERP halfway point.
    fn run_midpoint(&self) -> ScenarioResult {
        let convention = self.config.euler_convention;
        let start = EulerAngles::new(0.0, 0.0, 0.0);
        let end = EulerAngles::new(90.0, 0.0, 0.0);
        let dataset: PoseDataset = vec![
            (SamplePoint::new(0.0, 0.0, 0.0), vec![start]),
            (SamplePoint::new(1.0, 1.0, 1.0), vec![end]),
        ]
        .into_iter()
        .collect();
        let target = SamplePoint::new(0.5, 0.5, 0.5);

        let mut metrics = ScenarioMetrics::default();
        let mut failures = Vec::new();

        for method in [InterpolationMethod::Idw, InterpolationMethod::Rbf] {
            let driver = PoseDriver::new(EngineConfig {
                method,
                k: 2,
                ..self.config.clone()
            });
            let solution = driver.solve(&dataset, &target);
            metrics.poses_solved += 1;
            metrics.joints_solved += solution.joints.len();

            let angles = convention.to_euler(&solution.joints[0].rotation);
            debug!("  {}: ({:.4}, {:.4}, {:.4})", method, angles.x, angles.y, angles.z);

            if !(44.0..=46.0).contains(&angles.x) {
                failures.push(format!("{} X angle {:.3}° not in [44, 46]", method, angles.x));
            }
            if angles.y.abs() > 1e-3 || angles.z.abs() > 1e-3 {
                failures.push(format!("{} off-axis drift ({:.2e}°, {:.2e}°)", method, angles.y, angles.z));
            }

            let agreement = slerp_agreement(
                &solution.joints[0].rotation,
                &convention.to_quaternion(&start),
                &convention.to_quaternion(&end),
                0.5,
            );
            metrics.max_error_deg = metrics.max_error_deg.max(agreement.to_degrees());
            if method == InterpolationMethod::Idw && agreement > 0.1 {
                failures.push(format!("IDW is {:.4} rad from SLERP", agreement));
            }
        }

        info!("✓ Midpoint complete: max deviation from SLERP {:.4}°", metrics.max_error_deg);
        ScenarioResult::new(ScenarioId::Midpoint, self.seed, metrics, failures)
    }

    /// JB-002: GridSweep - random targets vs the true joint model.
    ///
    /// **Assertion**: no joint fails, RMS error within threshold, and the
    /// grid SLERP path lands on the recorded sample at its corners.
    fn run_grid_sweep(&self) -> ScenarioResult {
        let mut grid = self.calibration_grid();
        let dataset = grid.dataset();
        let driver = PoseDriver::new(self.config.clone());
        let convention = self.config.euler_convention;

        let mut session = ValidationSession::new();
        let mut metrics = ScenarioMetrics::default();
        let mut failures = Vec::new();

        for _ in 0..self.sweep_targets {
            let target = grid.random_target();

            let start = Instant::now();
            let solution = driver.solve(&dataset, &target);
            let elapsed = start.elapsed();
            session.record_latency(elapsed);
            metrics.max_latency_ms = metrics.max_latency_ms.max(elapsed.as_secs_f64() * 1000.0);

            let truth: Vec<UnitQuaternion<f64>> = model_rotations(&target)
                .iter()
                .map(|angles| convention.to_quaternion(angles))
                .collect();
            session.record_solution(&solution, &truth);
            metrics.joints_solved += solution.joints.len();
        }

        let report = session.generate_report();
        metrics.poses_solved = report.poses;
        metrics.failed_joints = report.failed_joints;
        metrics.rms_error_deg = report.rms_error.to_degrees();
        metrics.max_error_deg = report.max_error.to_degrees();

        if report.failed_joints > 0 {
            failures.push(format!("{} joints failed", report.failed_joints));
        }
        if metrics.rms_error_deg > self.max_rms_deg() {
            failures.push(format!(
                "RMS error {:.3}° exceeds {:.3}°",
                metrics.rms_error_deg,
                self.max_rms_deg()
            ));
        }

        // Grid SLERP at the far corner of the lowest cell must hit the sample
        let slerper = GridSlerp::new(convention);
        let bottom = GridPlane::at(&dataset, GRID_Y[0], GRID_Z[0], GRID_Z[1]);
        let top = GridPlane::at(&dataset, GRID_Y[1], GRID_Z[0], GRID_Z[1]);
        let corner = SamplePoint::new(GRID_X[GRID_X.len() - 1], GRID_Y[1], GRID_Z[1]);
        if let Some(recorded) = dataset.get(&corner) {
            for (joint_index, angles) in recorded.iter().enumerate() {
                match slerper.slerp_across_planes(&bottom, &top, [1.0, 1.0, 1.0], joint_index) {
                    Ok(q) => {
                        let error = q.angle_to(&convention.to_quaternion(angles));
                        if error > 1e-6 {
                            failures.push(format!("grid SLERP corner off by {:.2e} rad", error));
                        }
                    }
                    Err(e) => failures.push(format!("grid SLERP failed: {}", e)),
                }
            }
        }

        info!(
            "✓ GridSweep complete: {} targets, RMS {:.3}°, max {:.3}°",
            metrics.poses_solved, metrics.rms_error_deg, metrics.max_error_deg
        );
        ScenarioResult::new(ScenarioId::GridSweep, self.seed, metrics, failures)
    }

    /// JB-003: LeaveOneOut - predict every sample from the others.
    ///
    /// **Assertion**: no joint fails and RMS error within threshold.
    fn run_leave_one_out(&self) -> ScenarioResult {
        let dataset = self.dataset();
        let driver = PoseDriver::new(self.config.clone());
        let report = leave_one_out(&dataset, &driver);

        let metrics = ScenarioMetrics {
            poses_solved: report.poses,
            joints_solved: report.samples + report.failed_joints,
            failed_joints: report.failed_joints,
            rms_error_deg: report.rms_error.to_degrees(),
            max_error_deg: report.max_error.to_degrees(),
            max_latency_ms: report.p95_latency_ms,
        };

        let mut failures = Vec::new();
        if report.failed_joints > 0 {
            failures.push(format!("{} joints failed", report.failed_joints));
        }
        if metrics.rms_error_deg > self.max_rms_deg() {
            failures.push(format!(
                "RMS error {:.3}° exceeds {:.3}°",
                metrics.rms_error_deg,
                self.max_rms_deg()
            ));
        }

        info!(
            "✓ LeaveOneOut complete: {} poses, RMS {:.3}°, max {:.3}°",
            metrics.poses_solved, metrics.rms_error_deg, metrics.max_error_deg
        );
        ScenarioResult::new(ScenarioId::LeaveOneOut, self.seed, metrics, failures)
    }

    /// JB-004: DuplicateSamples - a sample recorded twice, 0.1 mm apart.
    ///
    /// **Assertion**: RBF reports SingularSystem on every joint; with
    /// `fallback_to_idw` every joint is recovered through IDW.
    fn run_duplicate_samples(&self) -> ScenarioResult {
        let mut dataset = self.calibration_grid().dataset();
        let target = SamplePoint::new(GRID_X[4], GRID_Y[2], GRID_Z[1]);
        let twin = SamplePoint::new(GRID_X[4] + 1e-4, GRID_Y[2], GRID_Z[1]);
        dataset.insert(twin, model_rotations(&twin));

        let config = EngineConfig {
            method: InterpolationMethod::Rbf,
            k: self.config.k.max(2),
            rbf: RbfConfig {
                duplicate_tolerance: 1e-3,
                ..self.config.rbf
            },
            ..self.config.clone()
        };

        let mut metrics = ScenarioMetrics::default();
        let mut failures = Vec::new();

        let strict = PoseDriver::new(EngineConfig {
            fallback_to_idw: false,
            ..config.clone()
        })
        .solve(&dataset, &target);
        let singular = strict
            .joints
            .iter()
            .filter(|j| j.failure_kind() == Some(FailureKind::SingularSystem))
            .count();
        if singular != strict.joints.len() {
            failures.push(format!(
                "{}/{} joints reported SingularSystem",
                singular,
                strict.joints.len()
            ));
        }
        if strict.joints.iter().any(|j| j.rotation != UnitQuaternion::identity()) {
            failures.push("singular joints must get the identity".to_string());
        }

        let recovered = PoseDriver::new(EngineConfig {
            fallback_to_idw: true,
            ..config
        })
        .solve(&dataset, &target);
        let fell_back = recovered
            .joints
            .iter()
            .filter(|j| j.status == JointStatus::FellBackToIdw)
            .count();
        if fell_back != recovered.joints.len() {
            failures.push(format!(
                "{}/{} joints recovered through IDW",
                fell_back,
                recovered.joints.len()
            ));
        }

        metrics.poses_solved = 2;
        metrics.joints_solved = strict.joints.len() + recovered.joints.len();
        metrics.failed_joints = strict.failures().count() + recovered.failures().count();

        info!("✓ DuplicateSamples complete: {} singular, {} recovered", singular, fell_back);
        ScenarioResult::new(ScenarioId::DuplicateSamples, self.seed, metrics, failures)
    }

    /// JB-005: EmptyDataset - nothing recorded.
    ///
    /// **Assertion**: no neighbors, every joint is the identity with an
    /// EmptyNeighborSet fallback, for both methods.
    fn run_empty_dataset(&self) -> ScenarioResult {
        let dataset = PoseDataset::new();
        let target = SamplePoint::new(0.25, 1.25, 0.5);

        let mut metrics = ScenarioMetrics::default();
        let mut failures = Vec::new();

        if !find_nearest(&dataset, &target, self.config.k).is_empty() {
            failures.push("neighbors found in an empty dataset".to_string());
        }

        for method in [InterpolationMethod::Idw, InterpolationMethod::Rbf] {
            let solution = self
                .driver_with(method)
                .solve_joints(&dataset, &target, JOINT_NAMES.len());
            metrics.poses_solved += 1;
            metrics.joints_solved += solution.joints.len();

            for joint in &solution.joints {
                if joint.rotation != UnitQuaternion::identity()
                    || joint.status != JointStatus::Fallback(Fallback::EmptyNeighborSet)
                {
                    failures.push(format!("{} joint {}: {:?}", method, joint.joint_index, joint.status));
                }
            }
        }

        info!("✓ EmptyDataset complete: {} joints", metrics.joints_solved);
        ScenarioResult::new(ScenarioId::EmptyDataset, self.seed, metrics, failures)
    }

    /// JB-006: Latency - one pose per control tick.
    ///
    /// **Assertion**: the slowest solve stays under 30 ms.
    fn run_latency(&self) -> ScenarioResult {
        let dataset = self.dataset();
        let driver = PoseDriver::new(self.config.clone());
        let mut grid = self.calibration_grid();

        let mut metrics = ScenarioMetrics::default();
        for _ in 0..self.sweep_targets {
            let target = grid.random_target();
            let start = Instant::now();
            let solution = driver.solve(&dataset, &target);
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            metrics.poses_solved += 1;
            metrics.joints_solved += solution.joints.len();
            metrics.failed_joints += solution.failures().count();
            metrics.max_latency_ms = metrics.max_latency_ms.max(elapsed_ms);
        }

        let mut failures = Vec::new();
        if metrics.max_latency_ms >= LATENCY_BUDGET_MS {
            failures.push(format!(
                "slowest solve {:.3} ms exceeds {} ms",
                metrics.max_latency_ms, LATENCY_BUDGET_MS
            ));
        }

        info!(
            "✓ Latency complete: {} poses, slowest {:.3} ms",
            metrics.poses_solved, metrics.max_latency_ms
        );
        ScenarioResult::new(ScenarioId::Latency, self.seed, metrics, failures)
    }

    /// Solves a sweep of random targets and collects them for export.
    pub fn sweep_export(&self, scenario: &str) -> SimExport {
        let mut grid = self.calibration_grid();
        let dataset = grid.dataset();
        let driver = PoseDriver::new(self.config.clone());
        let convention = self.config.euler_convention;
        let names = dataset.joint_names().to_vec();

        let mut export = SimExport::new(scenario, self.seed, self.config.method.name());
        let mut session = ValidationSession::new();

        for _ in 0..self.sweep_targets {
            let target = grid.random_target();
            let solution = driver.solve(&dataset, &target);
            let truth: Vec<UnitQuaternion<f64>> = model_rotations(&target)
                .iter()
                .map(|angles| convention.to_quaternion(angles))
                .collect();

            let mut frame_session = ValidationSession::new();
            frame_session.record_solution(&solution, &truth);
            session.record_solution(&solution, &truth);

            let frame_rms = frame_session.generate_report().rms_error.to_degrees();
            export.add_frame(SimFrame::from_solution(&solution, &names, convention).with_rms_error(frame_rms));
        }

        let report = session.generate_report();
        let rms_deg = report.rms_error.to_degrees();
        export.finalize(
            report.failed_joints == 0 && rms_deg <= self.max_rms_deg(),
            Some(rms_deg),
        );
        export
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_passes_with_defaults() {
        let runner = ScenarioRunner::new(42).with_targets(50);

        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{} failed: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_midpoint_metrics() {
        let result = ScenarioRunner::new(1).run(ScenarioId::Midpoint);

        assert!(result.passed);
        assert_eq!(result.metrics.poses_solved, 2);
        assert_eq!(result.metrics.joints_solved, 2);
    }

    #[test]
    fn test_grid_sweep_deterministic() {
        let a = ScenarioRunner::new(7).with_targets(20).with_noise(0.5).run(ScenarioId::GridSweep);
        let b = ScenarioRunner::new(7).with_targets(20).with_noise(0.5).run(ScenarioId::GridSweep);

        assert_eq!(a.metrics.rms_error_deg, b.metrics.rms_error_deg);
        assert_eq!(a.metrics.max_error_deg, b.metrics.max_error_deg);
    }

    #[test]
    fn test_duplicate_samples_with_rbf_config() {
        let config = EngineConfig {
            method: InterpolationMethod::Rbf,
            ..EngineConfig::default()
        };
        let result = ScenarioRunner::new(42)
            .with_config(config)
            .run(ScenarioId::DuplicateSamples);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.failed_joints, JOINT_NAMES.len());
    }

    #[test]
    fn test_leave_one_out_on_supplied_dataset() {
        let dataset = CalibrationGrid::new(3).dataset();
        let result = ScenarioRunner::new(3)
            .with_dataset(dataset)
            .run(ScenarioId::LeaveOneOut);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.poses_solved, 144);
        assert_eq!(result.metrics.joints_solved, 144 * 4);
    }

    #[test]
    fn test_sweep_export() {
        let export = ScenarioRunner::new(42).with_targets(5).sweep_export("grid_sweep");

        assert_eq!(export.frames.len(), 5);
        assert_eq!(export.method, "idw");
        assert!(export.passed);
        assert_eq!(export.frames[0].joints[0].name, "Base");
    }
}
