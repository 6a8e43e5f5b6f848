//! Service configuration loading.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use raster_sampler::SamplerConfig;

use crate::url_template::DEFAULT_URL_TEMPLATE;

/// Configuration loaded from an optional YAML file.
///
/// Every field has a default, so a partial file only overrides what it
/// names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Template mapping (date, variable) to a raster URL.
    pub url_template: String,

    /// Longest date range accepted by the time series endpoint.
    pub max_timeseries_days: usize,

    /// Maximum concurrent raster reads per time series request.
    pub timeseries_concurrency: usize,

    /// HTTP client timeout for raster and in-situ fetches.
    pub request_timeout_secs: u64,

    /// Sampling tunables (`nodata_sentinel`, `transect_spacing`, `sample_window`).
    #[serde(flatten)]
    pub sampler: SamplerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            max_timeseries_days: 366,
            timeseries_concurrency: 8,
            request_timeout_secs: 120,
            sampler: SamplerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path`. Without a file, sampler tunables come from the
    /// environment and everything else takes its default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::from_env();
        };

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file does not exist, using defaults"
            );
            return Self::from_env();
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;

        tracing::info!(path = %path.display(), "Loaded service config");
        Ok(config)
    }

    fn from_env() -> Result<Self> {
        let config = Self {
            sampler: SamplerConfig::from_env(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.sampler.validate().map_err(anyhow::Error::msg)?;
        anyhow::ensure!(
            self.max_timeseries_days > 0,
            "max_timeseries_days must be at least 1"
        );
        anyhow::ensure!(
            self.timeseries_concurrency > 0,
            "timeseries_concurrency must be at least 1"
        );
        anyhow::ensure!(
            self.url_template.contains("{variable}"),
            "url_template must contain {{variable}}"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_timeseries_days, 366);
        assert_eq!(config.sampler.nodata_sentinel, -9999.0);
        assert_eq!(config.sampler.transect_spacing, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config = ServiceConfig::from_yaml(
            "transect_spacing: 0.5\nmax_timeseries_days: 31\nurl_template: \"file:///data/{date}_{variable}.tif\"\n",
        )
        .unwrap();
        assert_eq!(config.sampler.transect_spacing, 0.5);
        assert_eq!(config.sampler.sample_window, 256);
        assert_eq!(config.max_timeseries_days, 31);
        assert_eq!(config.url_template, "file:///data/{date}_{variable}.tif");
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(ServiceConfig::from_yaml("transect_spacing: -1\n").is_err());
        assert!(ServiceConfig::from_yaml("url_template: \"https://x/{date}.tif\"\n").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServiceConfig::load(Some(Path::new("/nonexistent/raster-api.yaml"))).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"nodata_sentinel: -32768\n").unwrap();
        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.sampler.nodata_sentinel, -32768.0);
    }
}
