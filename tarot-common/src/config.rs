//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. Every field has a
//! built-in default, so a missing or broken file never stops the tools from
//! starting.
//!
//! # Root folder priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`TAROT_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "TAROT_ROOT_FOLDER";

/// Application directory name used under the platform config/data dirs
pub const APP_DIR_NAME: &str = "tarot-vision";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding images, labels and task records (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Batch annotation settings (optional)
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Batch annotation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Vision model identifier passed to the recognition backend
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Pause between images (milliseconds)
    #[serde(default = "default_image_delay_ms")]
    pub image_delay_ms: u64,

    /// Pause between the two recognitions of one image (milliseconds)
    #[serde(default = "default_dual_delay_ms")]
    pub dual_delay_ms: u64,

    /// Retries per recognition call on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Skip images that already have an annotation record
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,

    /// Age after which finished task records are cleaned up (days)
    #[serde(default = "default_task_max_age_days")]
    pub task_max_age_days: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            image_delay_ms: default_image_delay_ms(),
            dual_delay_ms: default_dual_delay_ms(),
            max_retries: default_max_retries(),
            skip_existing: default_skip_existing(),
            task_max_age_days: default_task_max_age_days(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_id() -> String {
    "qwen/qwen3-vl-235b-a22b-thinking".to_string()
}

fn default_image_delay_ms() -> u64 {
    2000
}

fn default_dual_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    2
}

fn default_skip_existing() -> bool {
    true
}

fn default_task_max_age_days() -> u64 {
    7
}

/// Load and parse a TOML config file
///
/// Fails if the file cannot be read or does not parse.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Where the config returned by [`load_toml_config_or_default`] came from
#[derive(Debug)]
pub enum ConfigOrigin {
    File,
    /// No file at the path; expected on first run
    Missing,
    /// The file exists but could not be loaded; defaults were used
    Invalid(Error),
}

/// Load a TOML config file, falling back to defaults
///
/// Nothing is logged here so callers can report the origin once logging is
/// set up from the returned config.
pub fn load_toml_config_or_default(path: &Path) -> (TomlConfig, ConfigOrigin) {
    if !path.exists() {
        return (TomlConfig::default(), ConfigOrigin::Missing);
    }

    match load_toml_config(path) {
        Ok(config) => (config, ConfigOrigin::File),
        Err(e) => (TomlConfig::default(), ConfigOrigin::Invalid(e)),
    }
}

/// Write a TOML config file
///
/// Writes to a sibling temp file first and renames it into place so a
/// concurrent reader never sees a half-written file.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Default config file location for the platform
///
/// `~/.config/tarot-vision/config.toml` on Linux, the platform equivalent
/// elsewhere.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    let env_value = std::env::var(ROOT_FOLDER_ENV).ok();
    resolve_root_folder_from(cli_arg, env_value.as_deref(), config)
}

/// Root folder resolution with the environment value passed in explicitly
pub fn resolve_root_folder_from(
    cli_arg: Option<&Path>,
    env_value: Option<&str>,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(value);
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./tarot_data"))
}

/// Directory layout under the root folder
///
/// Annotation records, corrected labels and task records live in sibling
/// namespaces so a human correction never overwrites the machine record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Source photos awaiting annotation
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Machine annotation records (one JSON document per image)
    pub fn labels_dir(&self) -> PathBuf {
        self.root.join("labels")
    }

    /// Human-reviewed labels (one JSON document per image)
    pub fn corrections_dir(&self) -> PathBuf {
        self.root.join("correct_labels")
    }

    /// Batch task records (one JSON document per task id)
    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    /// Create every directory of the layout if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.images_dir(),
            self.labels_dir(),
            self.corrections_dir(),
            self.tasks_dir(),
        ] {
            if !dir.exists() {
                info!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: TomlConfig = toml::from_str("root_folder = \"/data/tarot\"").unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/data/tarot")));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.annotation.max_retries, 2);
        assert_eq!(config.annotation.task_max_age_days, 7);
        assert!(config.annotation.skip_existing);
    }

    #[test]
    fn test_partial_annotation_section() {
        let config: TomlConfig = toml::from_str(
            "[annotation]\nmodel_id = \"local/vl\"\ndual_delay_ms = 0\n",
        )
        .unwrap();

        assert_eq!(config.annotation.model_id, "local/vl");
        assert_eq!(config.annotation.dual_delay_ms, 0);
        assert_eq!(config.annotation.image_delay_ms, 2000);
    }

    #[test]
    fn test_layout_namespaces_are_siblings() {
        let layout = DataLayout::new("/srv/tarot");
        assert_eq!(layout.labels_dir(), PathBuf::from("/srv/tarot/labels"));
        assert_eq!(layout.corrections_dir(), PathBuf::from("/srv/tarot/correct_labels"));
        assert_eq!(layout.tasks_dir(), PathBuf::from("/srv/tarot/tasks"));
        assert_eq!(layout.images_dir(), PathBuf::from("/srv/tarot/images"));
    }
}
