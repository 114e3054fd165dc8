//! JSON exporter for solved poses.
//!
//! Writes every solved target with its per-joint rotations and status, for
//! plotting or diffing between runs.

use jointblend_core::{EulerConvention, JointStatus, PoseSolution};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One joint of a solved pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointFrame {
    pub joint_index: usize,
    pub name: String,

    /// Unit quaternion `[x, y, z, w]`
    pub quaternion: [f64; 4],

    /// Euler angles in degrees
    pub euler: [f64; 3],

    /// `interpolated`, `fell_back_to_idw`, or the failure kind
    pub status: String,
}

/// A single solved target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    pub target: [f64; 3],
    pub neighbor_count: usize,
    pub joints: Vec<JointFrame>,

    /// Angular RMS error against the true model, if known (degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms_error_deg: Option<f64>,
}

impl SimFrame {
    pub fn from_solution(solution: &PoseSolution, joint_names: &[String], convention: EulerConvention) -> Self {
        let joints = solution
            .joints
            .iter()
            .map(|joint| {
                let euler = convention.to_euler(&joint.rotation);
                let status = match (&joint.status, joint.failure_kind()) {
                    (JointStatus::Interpolated, _) => "interpolated".to_string(),
                    (JointStatus::FellBackToIdw, _) => "fell_back_to_idw".to_string(),
                    (_, Some(kind)) => kind.to_string(),
                    (_, None) => "failed".to_string(),
                };
                let c = joint.rotation.coords;
                JointFrame {
                    joint_index: joint.joint_index,
                    name: joint_names
                        .get(joint.joint_index)
                        .cloned()
                        .unwrap_or_else(|| format!("Joint{}", joint.joint_index)),
                    quaternion: [c.x, c.y, c.z, c.w],
                    euler: [euler.x, euler.y, euler.z],
                    status,
                }
            })
            .collect();

        Self {
            target: [solution.target.x, solution.target.y, solution.target.z],
            neighbor_count: solution.neighbor_count,
            joints,
            rms_error_deg: None,
        }
    }

    pub fn with_rms_error(mut self, rms_error_deg: f64) -> Self {
        self.rms_error_deg = Some(rms_error_deg);
        self
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name (or `target` for a single solve)
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Interpolation method
    pub method: String,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_rms_error_deg: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, method: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            method: method.to_string(),
            frames: Vec::new(),
            passed: false,
            final_rms_error_deg: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, rms_error_deg: Option<f64>) {
        self.passed = passed;
        self.final_rms_error_deg = rms_error_deg;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
