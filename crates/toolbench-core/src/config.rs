use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default cap on the combined size of a job's inputs (150 MB)
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 150 * 1024 * 1024;

/// Rasterization resolution bounds and default, in DPI
pub const MIN_RASTER_DPI: u32 = 100;
pub const MAX_RASTER_DPI: u32 = 300;
pub const DEFAULT_RASTER_DPI: u32 = 150;

/// JPEG quality bounds and default, as a 0-1 fraction
pub const MIN_RASTER_QUALITY: f32 = 0.40;
pub const MAX_RASTER_QUALITY: f32 = 0.95;
pub const DEFAULT_RASTER_QUALITY: f32 = 0.75;

/// Prefix for environment overrides, e.g. `TOOLBENCH_RASTER__DPI=200`
pub const ENV_PREFIX: &str = "TOOLBENCH";

/// Input size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum combined input size in bytes
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
}

const fn default_max_total_bytes() -> u64 {
    DEFAULT_MAX_TOTAL_BYTES
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

/// Rasterize-mode compression settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Render resolution
    #[serde(default = "default_raster_dpi")]
    pub dpi: u32,

    /// JPEG quality (0.40-0.95)
    #[serde(default = "default_raster_quality")]
    pub quality: f32,
}

const fn default_raster_dpi() -> u32 {
    DEFAULT_RASTER_DPI
}

const fn default_raster_quality() -> f32 {
    DEFAULT_RASTER_QUALITY
}

impl RasterConfig {
    pub fn new(dpi: u32, quality: f32) -> Self {
        Self { dpi, quality }.clamped()
    }

    /// Pull both values into their supported ranges.
    #[must_use]
    pub fn clamped(self) -> Self {
        let quality = if self.quality.is_nan() {
            DEFAULT_RASTER_QUALITY
        } else {
            self.quality.clamp(MIN_RASTER_QUALITY, MAX_RASTER_QUALITY)
        };

        Self {
            dpi: self.dpi.clamp(MIN_RASTER_DPI, MAX_RASTER_DPI),
            quality,
        }
    }

    /// Scale factor from PDF points (1/72 inch) to pixels
    #[allow(clippy::cast_precision_loss)]
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }

    /// JPEG encoder quality on the 1-100 scale
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn jpeg_quality(&self) -> u8 {
        // Clamped to 0.40-0.95 above, so the product fits in a u8
        (self.clamped().quality * 100.0).round() as u8
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: default_raster_dpi(),
            quality: default_raster_quality(),
        }
    }
}

/// Where finished files go (CLI only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (defaults to the first input's directory)
    pub directory: Option<PathBuf>,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Rasterization defaults
    #[serde(default)]
    pub raster: RasterConfig,

    /// Output placement
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations and the environment.
    ///
    /// Layers, lowest priority first: `~/.config/toolbench/config.toml`,
    /// `./config.toml`, then `TOOLBENCH_*` variables. Falls back to defaults
    /// if the merged result does not load or validate.
    pub fn load() -> Self {
        let mut candidates = Vec::new();
        if let Some(config_dir) = crate::util::config_dir() {
            candidates.push(config_dir.join("toolbench").join("config.toml"));
        }
        candidates.push(PathBuf::from("config.toml"));

        match Self::layered(&candidates) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Merge the given files (missing ones are skipped) with the environment.
    pub fn layered(files: &[PathBuf]) -> Result<Self> {
        let mut builder = config::Config::builder();
        for path in files {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
            }
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }

        let merged: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        merged.validate()?;
        Ok(merged)
    }

    /// Reject values outside the supported ranges.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_total_bytes == 0 {
            return Err(Error::ConfigInvalid {
                field: "limits.max_total_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if !(MIN_RASTER_DPI..=MAX_RASTER_DPI).contains(&self.raster.dpi) {
            return Err(Error::ConfigInvalid {
                field: "raster.dpi".to_string(),
                reason: format!("must be between {MIN_RASTER_DPI} and {MAX_RASTER_DPI}"),
            });
        }

        if !(MIN_RASTER_QUALITY..=MAX_RASTER_QUALITY).contains(&self.raster.quality) {
            return Err(Error::ConfigInvalid {
                field: "raster.quality".to_string(),
                reason: format!("must be between {MIN_RASTER_QUALITY} and {MAX_RASTER_QUALITY}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.limits.max_total_bytes, 150 * 1024 * 1024);
        assert_eq!(config.raster.dpi, 150);
        assert!((config.raster.quality - 0.75).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_raster_clamping() {
        let raster = RasterConfig::new(50, 1.5);
        assert_eq!(raster.dpi, 100);
        assert!((raster.quality - 0.95).abs() < f32::EPSILON);

        let raster = RasterConfig::new(900, 0.1);
        assert_eq!(raster.dpi, 300);
        assert_eq!(raster.jpeg_quality(), 40);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[raster]\ndpi = 200").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.raster.dpi, 200);
        assert!((config.raster.quality - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn test_from_file_rejects_out_of_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[raster]\ndpi = 20").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_layered_skips_missing_files() {
        let config = AppConfig::layered(&[PathBuf::from("/nonexistent/toolbench.toml")]).unwrap();
        assert_eq!(config.raster.dpi, DEFAULT_RASTER_DPI);
    }
}
