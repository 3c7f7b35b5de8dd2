//! Aggregate pipeline configuration.
//!
//! Every stage owns its parameter struct; [`SegmentConfig`] nests them so a
//! single JSON document (with any subset of fields) configures a run.

use std::path::Path;

use crate::enhance::ClaheConfig;
use crate::error::ConfigError;
use crate::morphology::CleanupConfig;
use crate::raster::ChannelConfig;
use crate::threshold::ThresholdConfig;
use crate::vesselness::VesselnessConfig;

/// Default cut value for binarizing a grayscale field-of-view raster.
pub const DEFAULT_FOV_THRESHOLD: u8 = 127;

/// Top-level configuration for the segmentation pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Channel selection for RGB inputs.
    pub channel: ChannelConfig,
    /// Contrast-limited adaptive histogram equalization.
    pub clahe: ClaheConfig,
    /// Multiscale Hessian vesselness.
    pub vesselness: VesselnessConfig,
    /// Automatic global threshold.
    pub threshold: ThresholdConfig,
    /// Closing + small-component removal.
    pub cleanup: CleanupConfig,
    /// Field-of-view pixels are those with `value > fov_threshold`.
    pub fov_threshold: u8,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            clahe: ClaheConfig::default(),
            vesselness: VesselnessConfig::default(),
            threshold: ThresholdConfig::default(),
            cleanup: CleanupConfig::default(),
            fov_threshold: DEFAULT_FOV_THRESHOLD,
        }
    }
}

impl SegmentConfig {
    /// Check every stage's parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clahe.validate()?;
        self.vesselness.validate()?;
        self.threshold.validate()?;
        Ok(())
    }

    /// Parse a (possibly partial) JSON configuration. Missing fields take
    /// their defaults. The result is validated.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// `Ok` when `value` is finite and strictly positive.
pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}
