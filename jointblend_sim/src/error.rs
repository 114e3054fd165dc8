//! Errors surfaced by the simulation harness and CLI.

use jointblend_core::ConfigError;
use jointblend_env::EnvError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} (available: midpoint, grid_sweep, leave_one_out, duplicate_samples, empty_dataset, latency, all)")]
    UnknownScenario(String),

    #[error("Invalid target '{0}': expected x,y,z")]
    InvalidTarget(String),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}
