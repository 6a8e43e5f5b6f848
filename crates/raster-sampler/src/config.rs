//! Configuration for raster sampling.

use serde::{Deserialize, Serialize};

/// Tunables shared by the point, transect and polygon samplers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Pixel value treated as "no data" regardless of the raster's own tag.
    pub nodata_sentinel: f64,

    /// Nominal distance between consecutive transect samples.
    pub transect_spacing: f64,

    /// Edge length of the origin window checked before polygon masking.
    pub sample_window: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            nodata_sentinel: -9999.0,
            transect_spacing: 0.3,
            sample_window: 256,
        }
    }
}

impl SamplerConfig {
    /// Load overrides from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("NODATA_SENTINEL") {
            if let Ok(v) = val.parse() {
                config.nodata_sentinel = v;
            }
        }

        if let Ok(val) = std::env::var("TRANSECT_SPACING") {
            if let Ok(v) = val.parse() {
                config.transect_spacing = v;
            }
        }

        if let Ok(val) = std::env::var("SAMPLE_WINDOW") {
            if let Ok(v) = val.parse() {
                config.sample_window = v;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.nodata_sentinel.is_finite() {
            return Err("nodata_sentinel must be finite".to_string());
        }
        if !(self.transect_spacing.is_finite() && self.transect_spacing > 0.0) {
            return Err("transect_spacing must be positive".to_string());
        }
        if self.sample_window == 0 {
            return Err("sample_window must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.nodata_sentinel, -9999.0);
        assert_eq!(config.transect_spacing, 0.3);
        assert_eq!(config.sample_window, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_spacing() {
        let config = SamplerConfig {
            transect_spacing: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: SamplerConfig = serde_json::from_str(r#"{"transect_spacing": 1.5}"#).unwrap();
        assert_eq!(config.transect_spacing, 1.5);
        assert_eq!(config.sample_window, 256);
    }
}
