//! JointBlend Environment Layer
//!
//! Everything the pose-interpolation engine talks to but does not own:
//!
//! - **Records**: the plain-text pose format produced by the calibration rig
//! - **Sources**: where recorded poses come from (`DirectorySource`)
//! - **Recorders**: where new poses go (`DirectoryRecorder`, "append one record")
//! - **Actuation**: where interpolated joint rotations are sent (`JointActuator`)
//!
//! The engine in `jointblend_core` depends only on the traits and plain data
//! types here, so it runs the same against real files, in-memory fixtures or
//! the simulation harness.
//!
//! # Example
//!
//! ```ignore
//! use jointblend_env::{DirectorySource, PoseSource};
//!
//! let records = DirectorySource::new("calibration/").load()?;
//! println!("{} recorded poses", records.len());
//! ```

mod actuation;
mod error;
mod fs_impl;
pub mod record_format;
mod source;
mod types;

pub use actuation::{JointActuator, RecordingActuator};
pub use error::EnvError;
pub use fs_impl::{DirectoryRecorder, DirectorySource};
pub use record_format::{format_record, parse_record};
pub use source::{MemoryRecorder, PoseRecorder, PoseSource};
pub use types::{EulerAngles, JointRotation, JointRotationSet, PoseRecord, SamplePoint};
