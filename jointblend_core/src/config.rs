//! Engine configuration.
//!
//! Every tunable lives in [`EngineConfig`]. All fields have defaults, so a
//! JSON file only needs the values it changes:
//!
//! ```json
//! { "k": 8, "method": "rbf", "rbf": { "shape": 2.5 } }
//! ```

use crate::idw::IdwConfig;
use crate::quat_math::EulerConvention;
use crate::rbf::RbfConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which interpolator the driver runs per joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Inverse-distance weighting (real-time path)
    #[default]
    Idw,

    /// Radial basis functions (exact at samples, O(k³) per joint)
    Rbf,
}

impl InterpolationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            InterpolationMethod::Idw => "idw",
            InterpolationMethod::Rbf => "rbf",
        }
    }
}

impl std::str::FromStr for InterpolationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idw" => Ok(InterpolationMethod::Idw),
            "rbf" => Ok(InterpolationMethod::Rbf),
            _ => Err(format!("Unknown interpolation method: {}", s)),
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Configuration for the pose driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Neighbors per query (default: 5)
    pub k: usize,

    /// Interpolator used for every joint (default: IDW)
    pub method: InterpolationMethod,

    /// How recorded Euler triples compose (default: XYZ)
    pub euler_convention: EulerConvention,

    pub idw: IdwConfig,

    pub rbf: RbfConfig,

    /// Retry a joint with IDW when the RBF system is singular
    pub fallback_to_idw: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k: 5,
            method: InterpolationMethod::Idw,
            euler_convention: EulerConvention::Xyz,
            idw: IdwConfig::default(),
            rbf: RbfConfig::default(),
            fallback_to_idw: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::Invalid("k must be at least 1".into()));
        }
        if !self.idw.epsilon.is_finite() || self.idw.epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "idw.epsilon must be finite and non-negative, got {}",
                self.idw.epsilon
            )));
        }
        self.rbf
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !self.rbf.duplicate_tolerance.is_finite() || self.rbf.duplicate_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rbf.duplicate_tolerance must be finite and non-negative, got {}",
                self.rbf.duplicate_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.k, 5);
        assert_eq!(config.method, InterpolationMethod::Idw);
        assert_eq!(config.euler_convention, EulerConvention::Xyz);
        assert_eq!(config.idw.epsilon, 1e-6);
        assert_eq!(config.rbf.shape, 1.0);
        assert_eq!(config.rbf.duplicate_tolerance, 1e-9);
        assert!(!config.fallback_to_idw);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "k": 8, "method": "rbf", "euler_convention": "zxy", "rbf": { "shape": 2.5 } }"#,
        )
        .unwrap();

        assert_eq!(config.k, 8);
        assert_eq!(config.method, InterpolationMethod::Rbf);
        assert_eq!(config.euler_convention, EulerConvention::Zxy);
        assert_eq!(config.rbf.shape, 2.5);
        assert_eq!(config.rbf.duplicate_tolerance, 1e-9);
        assert_eq!(config.idw.epsilon, 1e-6);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig {
            k: 3,
            fallback_to_idw: true,
            ..EngineConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "k": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "rbf": { "shape": -1.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "idw": { "epsilon": -0.5 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "method": "kriging" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("IDW".parse::<InterpolationMethod>(), Ok(InterpolationMethod::Idw));
        assert_eq!("rbf".parse::<InterpolationMethod>(), Ok(InterpolationMethod::Rbf));
        assert!("nearest".parse::<InterpolationMethod>().is_err());
        assert_eq!(InterpolationMethod::Rbf.to_string(), "rbf");
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_json_file("/nonexistent/jointblend.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
