//! Configuration module.
//!
//! Handles loading, validating, and merging `renditions.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top of it,
//! so a config file only needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [renditions]
//! quality = 85              # JPEG quality (1-100); PNG is lossless
//! filter = "lanczos3"       # nearest | triangle | catmull_rom | gaussian | lanczos3
//! tiers = [                 # Output order = declaration order
//!     { name = "large", factor = 1.0 },
//!     { name = "medium", factor = 0.5 },
//!     { name = "small", factor = 0.25 },
//!     { name = "thumb", long_edge = 160 },
//! ]
//!
//! [processing]
//! parallel_tiers = true     # Render the tiers of one image in parallel
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [storage]
//! root = "storage"          # Directory holding one subdirectory per bucket
//! bucket = "media"          # Default bucket for uploads
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only lower the JPEG quality
//! [renditions]
//! quality = 70
//! ```
//!
//! Tables merge key by key; arrays such as `tiers` replace the default list
//! wholesale. Unknown keys are rejected to catch typos early.

use crate::imaging::{ResizeFilter, ScaleTier, default_tiers, validate_tiers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILENAME: &str = "renditions.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `renditions.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tier list and encoding settings.
    pub renditions: RenditionsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Local object store settings.
    pub storage: StorageConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let renditions = &self.renditions;
        if !(1..=100).contains(&renditions.quality) {
            return Err(ConfigError::Validation(
                "renditions.quality must be 1-100".into(),
            ));
        }
        validate_tiers(&renditions.tiers)
            .map_err(|e| ConfigError::Validation(format!("renditions.tiers: {e}")))?;

        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if !is_single_component(&self.storage.bucket) {
            return Err(ConfigError::Validation(format!(
                "storage.bucket '{}' must be a single path component",
                self.storage.bucket
            )));
        }
        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Rendition tiers and encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionsConfig {
    /// Tiers in output order.
    pub tiers: Vec<ScaleTier>,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Resampling filter for every tier.
    pub filter: ResizeFilter,
}

impl Default for RenditionsConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            quality: 85,
            filter: ResizeFilter::default(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Render the tiers of a single image on the worker pool.
    pub parallel_tiers: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            parallel_tiers: true,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Local object store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per bucket.
    pub root: PathBuf,
    /// Bucket used when the CLI is not given one.
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            bucket: "media".to_string(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `renditions.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_toml(&config_path).map(Some)
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `renditions.toml` in the given directory, falling back
/// to stock defaults when the file is absent.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Load config from an explicit file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let overlay = read_toml(path)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Returns a fully-commented stock `renditions.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Renditions Configuration
# ========================
# All options are optional - remove or comment out any you don't need.
# Values shown below are the defaults.

[renditions]
# JPEG encoding quality (1 = worst, 100 = best).
# PNG renditions are lossless and ignore this setting.
quality = 85

# Resampling filter used for every tier:
# nearest, triangle, catmull_rom, gaussian, lanczos3
filter = "lanczos3"

# Renditions produced for every upload, in output order.
# Each tier has a name (a-z, 0-9, '-', '_') and exactly one size:
#   factor    = scale relative to the original, in (0, 1]
#   long_edge = target pixels on the longer edge (never upscales)
# A custom list replaces this one entirely.
tiers = [
    { name = "large", factor = 1.0 },
    { name = "medium", factor = 0.5 },
    { name = "small", factor = 0.25 },
    { name = "thumb", long_edge = 160 },
]

[processing]
# Render the tiers of one image in parallel.
parallel_tiers = true

# Maximum parallel workers. Omit for auto (number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4

[storage]
# Directory holding one subdirectory per bucket.
root = "storage"

# Bucket used when the command line does not name one.
bucket = "media"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_stock_tiers() {
        let config = Config::default();
        let names: Vec<&str> = config
            .renditions
            .tiers
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, ["large", "medium", "small", "thumb"]);
        assert_eq!(config.renditions.quality, 85);
        assert_eq!(config.renditions.filter, ResizeFilter::Lanczos3);
    }

    #[test]
    fn default_storage_settings() {
        let config = Config::default();
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.storage.bucket, "media");
    }

    #[test]
    fn parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
[renditions]
quality = 70
"#,
        )
        .unwrap();
        assert_eq!(config.renditions.quality, 70);
        // Defaults preserved
        assert_eq!(config.renditions.tiers.len(), 4);
        assert!(config.processing.parallel_tiers);
    }

    #[test]
    fn parse_custom_tiers() {
        let config: Config = toml::from_str(
            r#"
[renditions]
tiers = [
    { name = "hero", factor = 0.8 },
    { name = "icon", long_edge = 48 },
]
"#,
        )
        .unwrap();
        assert_eq!(
            config.renditions.tiers,
            vec![ScaleTier::factor("hero", 0.8), ScaleTier::long_edge("icon", 48)]
        );
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[storage]
bucket = "avatars"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.storage.bucket, "avatars");
        // Unspecified values should be defaults
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.renditions.quality, 85);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_missing_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn load_config_file_reads_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[processing]\nparallel_tiers = false\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert!(!config.processing.parallel_tiers);
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[renditions]\nquality = 0\n",
        )
        .unwrap();

        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Processing tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
            ..ProcessingConfig::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
            ..ProcessingConfig::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[renditions]
quality = 85
filter = "lanczos3"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[renditions]\nquality = 60\n").unwrap();

        let merged = merge_toml(base, overlay);
        let renditions = merged.get("renditions").unwrap();
        assert_eq!(renditions.get("quality").unwrap().as_integer(), Some(60));
        assert_eq!(renditions.get("filter").unwrap().as_str(), Some("lanczos3"));
    }

    #[test]
    fn merge_toml_replaces_tier_list() {
        let overlay: toml::Value =
            toml::from_str("[renditions]\ntiers = [{ name = \"only\", factor = 0.5 }]\n").unwrap();

        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.renditions.tiers, vec![ScaleTier::factor("only", 0.5)]);
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    fn with_tiers(tiers: Vec<ScaleTier>) -> Config {
        let mut config = Config::default();
        config.renditions.tiers = tiers;
        config
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = Config::default();
        config.renditions.quality = 100;
        assert!(config.validate().is_ok());
        config.renditions.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_tiers_empty() {
        assert!(with_tiers(vec![]).validate().is_err());
    }

    #[test]
    fn validate_duplicate_tier_names() {
        let config = with_tiers(vec![
            ScaleTier::factor("a", 1.0),
            ScaleTier::long_edge("a", 100),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate tier name 'a'"));
    }

    #[test]
    fn validate_tier_name_characters() {
        for bad in ["", "Large", "a/b", "..", "x y"] {
            let config = with_tiers(vec![ScaleTier::factor(bad, 0.5)]);
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
        assert!(with_tiers(vec![ScaleTier::factor("w-640_x2", 0.5)]).validate().is_ok());
    }

    #[test]
    fn validate_factor_range() {
        for bad in [0.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            let config = with_tiers(vec![ScaleTier::factor("t", bad)]);
            assert!(config.validate().is_err(), "factor {bad} should be rejected");
        }
    }

    #[test]
    fn validate_long_edge_zero() {
        assert!(with_tiers(vec![ScaleTier::long_edge("t", 0)]).validate().is_err());
    }

    #[test]
    fn validate_max_processes_zero() {
        let mut config = Config::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bucket_is_single_component() {
        for bad in ["", "..", "a/b", "a\\b"] {
            let mut config = Config::default();
            config.storage.bucket = bad.to_string();
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<Config, _> = toml::from_str("[renditions]\nqualty = 70\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<Config, _> = toml::from_str("[bogus]\nkey = 1\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value = toml::from_str(stock_config_toml()).unwrap();
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["renditions", "processing", "storage"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
    }
}
