//! JointBlend simulation harness
//!
//! Exercises the interpolation engine against a synthetic calibration rig
//! whose true joint angles are known everywhere, so accuracy, failure
//! handling and latency can be checked without recorded data.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     records      ┌──────────────────┐
//! │ CalibrationGrid  │ ───────────────► │   PoseDataset    │
//! │ (seeded model)   │                  └────────┬─────────┘
//! └────────┬─────────┘                           │
//!          │ ground truth                        ▼
//!          │                            ┌──────────────────┐
//!          └──────────────────────────► │  ScenarioRunner  │ ──► SimExport
//!                                       │  (PoseDriver)    │
//!                                       └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use jointblend_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::GridSweep);
//! assert!(result.passed);
//! ```

mod calibration;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use calibration::{model_rotations, CalibrationGrid, GRID_X, GRID_Y, GRID_Z, JOINT_NAMES};
pub use error::SimError;
pub use exporter::{JointFrame, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
