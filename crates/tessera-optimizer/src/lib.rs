//! # Tessera Optimizer
//!
//! Adaptive performance and resource management for a real-time 3D renderer.
//!
//! ## Features
//! - Performance classification with hysteresis
//! - Distance/importance driven level of detail with external ceilings
//! - Furniture occlusion culling against scanned room geometry
//! - LRU temporal cache whose budget follows memory pressure
//! - Continuous quality scaling with thermal throttling and fallback mode
//! - A coordinator publishing one immutable snapshot per monitor tick

pub mod cache;
pub mod classifier;
pub mod coordinator;
pub mod features;
pub mod lod;
pub mod occlusion;
pub mod quality;

pub use cache::{CacheStats, EnvironmentElement, TemporalCache};
pub use classifier::{classify, LevelSmoother};
pub use coordinator::{OptimizationCoordinator, OptimizationSnapshot};
pub use features::{Feature, FeatureSet};
pub use lod::{LodManager, LodMesh};
pub use occlusion::{CullingMode, OcclusionCuller};
pub use quality::{QualityScaler, QualitySettings};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_platform::{MonitorConfig, PlatformError};
use thiserror::Error;

/// Optimizer errors
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Device initialization failed: {0}")]
    Device(#[from] PlatformError),

    #[error("Failed to start performance monitor: {0}")]
    Monitor(PlatformError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for optimizer operations
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Frame rate the classifier measures against
    pub target_frame_rate: f32,
    /// Monitor sampling settings
    pub monitor: MonitorConfig,
    /// Consecutive agreeing samples needed before the level changes
    pub level_change_samples: u32,
    /// Lowest value any quality axis may be scaled to
    pub quality_floor: f32,
    /// Unscaled render resolution (width, height)
    pub base_resolution: (u32, u32),
    /// Devices below this tier start in fallback mode
    pub fallback_tier_threshold: u8,
    /// Cache entries untouched for this long are swept
    pub cache_stale_after_secs: u64,
    /// Minimum time between staleness sweeps
    pub cache_sweep_interval_secs: u64,
    /// Visibility radius used by distance-only culling
    pub low_performance_view_distance: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_frame_rate: 60.0,
            monitor: MonitorConfig::default(),
            level_change_samples: 3,
            quality_floor: 0.2,
            base_resolution: (1920, 1080),
            fallback_tier_threshold: 1,
            cache_stale_after_secs: 300,
            cache_sweep_interval_secs: 60,
            low_performance_view_distance: 15.0,
        }
    }
}

impl OptimizerConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> OptimizerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the optimizer cannot work with
    pub fn validate(&self) -> OptimizerResult<()> {
        if !(self.target_frame_rate.is_finite() && self.target_frame_rate > 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "target_frame_rate must be positive, got {}",
                self.target_frame_rate
            )));
        }
        if self.monitor.interval_ms == 0 {
            return Err(OptimizerError::InvalidConfig(
                "monitor.interval_ms must be positive".to_string(),
            ));
        }
        if !(self.quality_floor > 0.0 && self.quality_floor <= 1.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "quality_floor must be in (0, 1], got {}",
                self.quality_floor
            )));
        }
        if self.base_resolution.0 == 0 || self.base_resolution.1 == 0 {
            return Err(OptimizerError::InvalidConfig(
                "base_resolution must be non-zero".to_string(),
            ));
        }
        if !(self.low_performance_view_distance.is_finite() && self.low_performance_view_distance >= 0.0) {
            return Err(OptimizerError::InvalidConfig(
                "low_performance_view_distance must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_error_names_the_monitor() {
        let spawn = std::io::Error::other("out of threads");
        let err = OptimizerError::Monitor(PlatformError::ThreadSpawn(spawn));
        assert_eq!(
            err.to_string(),
            "Failed to start performance monitor: Failed to spawn thread: out of threads"
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_resolution, (1920, 1080));
        assert_eq!(config.monitor.interval_ms, 1000);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = OptimizerConfig::default();
        config.target_frame_rate = 0.0;
        assert!(matches!(config.validate(), Err(OptimizerError::InvalidConfig(_))));

        let mut config = OptimizerConfig::default();
        config.quality_floor = 1.5;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.monitor.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{ "target_frame_rate": 30.0, "monitor": { "interval_ms": 500 } }"#).unwrap();
        assert_eq!(config.target_frame_rate, 30.0);
        assert_eq!(config.monitor.interval_ms, 500);
        assert_eq!(config.monitor.thermal_refresh_every, 5);
        assert_eq!(config.level_change_samples, 3);
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("tessera-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "quality_floor": 0.3 }"#).unwrap();

        let config = OptimizerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.quality_floor, 0.3);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            OptimizerConfig::from_json_file(&path),
            Err(OptimizerError::ConfigParse(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
