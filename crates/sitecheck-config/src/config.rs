// crates/sitecheck-config/src/config.rs
// ============================================================================
// Module: sitecheck Configuration
// Description: Configuration loading and validation for sitecheck.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: sitecheck-manifest, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The installer root and the rule directory are required; every other
//! setting has a default. Relative `installer.root`, `mapping.dir` and log
//! file paths are anchored at the directory holding the config file.
//! Invariants:
//! - Installer sub-directories are relative to the installer root.
//! - At least one document extension is configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use sitecheck_manifest::CollisionPolicy;
use sitecheck_manifest::DiagnosticLevel;
use sitecheck_manifest::EngineOptions;
use sitecheck_manifest::InstallerLayout;
use sitecheck_manifest::ReadOptions;
use sitecheck_manifest::SearchMode;
use sitecheck_manifest::document::DEFAULT_DOCUMENT_EXTENSION;
use sitecheck_manifest::document::DEFAULT_MAX_DOCUMENT_BYTES;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "sitecheck.toml";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "SITECHECK_CONFIG";
/// Maximum configuration file size, in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a whole path.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `installer.max_file_bytes`.
pub(crate) const MAX_DOCUMENT_FILE_BYTES: usize = 64 * 1024 * 1024;
/// Maximum number of configured document extensions.
pub(crate) const MAX_EXTENSIONS: usize = 16;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root sitecheck configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteCheckConfig {
    /// Installer tree location and reading limits.
    pub installer: InstallerConfig,
    /// Mapping rule configuration.
    pub mapping: MappingConfig,
    /// Search behavior.
    #[serde(default)]
    pub search: SearchConfig,
    /// Diagnostic output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SiteCheckConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path comes from `path`, then `SITECHECK_CONFIG`, then
    /// `sitecheck.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let base_dir = resolved.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(content, base_dir)
    }

    /// Parses and validates TOML content, anchoring relative paths at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        config.installer.root = anchor(base_dir, &config.installer.root);
        config.mapping.dir = anchor(base_dir, &config.mapping.dir);
        if let LogOutput::File(path) = &mut config.logging.output {
            *path = anchor(base_dir, path);
        }
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.installer.validate()?;
        self.mapping.validate()?;
        self.logging.validate()
    }

    /// Returns the installer layout for the engine.
    #[must_use]
    pub fn installer_layout(&self) -> InstallerLayout {
        InstallerLayout {
            root: self.installer.root.clone(),
            baremetal_dir: self.installer.baremetal_dir.clone(),
            hardware_dir: self.installer.hardware_dir.clone(),
            host_dir: self.installer.host_dir.clone(),
            network_dir: self.installer.network_dir.clone(),
        }
    }

    /// Returns the engine options.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            read: ReadOptions {
                extensions: self.installer.extensions.clone(),
                max_file_bytes: self.installer.max_file_bytes,
            },
            search_mode: self.search.mode,
            collisions: self.mapping.collisions,
        }
    }
}

/// Installer tree configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallerConfig {
    /// Installer site root.
    pub root: PathBuf,
    /// Baremetal node directory, relative to the root.
    #[serde(default = "default_baremetal_dir")]
    pub baremetal_dir: PathBuf,
    /// Hardware profile directory, relative to the root.
    #[serde(default = "default_hardware_dir")]
    pub hardware_dir: PathBuf,
    /// Host profile directory, relative to the root.
    #[serde(default = "default_host_dir")]
    pub host_dir: PathBuf,
    /// Physical network directory, relative to the root.
    #[serde(default = "default_network_dir")]
    pub network_dir: PathBuf,
    /// Recognized document extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Maximum bytes accepted for a single document file.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl InstallerConfig {
    /// Validates installer configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("installer.root", &self.root.to_string_lossy())?;
        for (field, dir) in [
            ("installer.baremetal_dir", &self.baremetal_dir),
            ("installer.hardware_dir", &self.hardware_dir),
            ("installer.host_dir", &self.host_dir),
            ("installer.network_dir", &self.network_dir),
        ] {
            validate_relative_dir(field, dir)?;
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "installer.extensions must list at least one extension".to_string(),
            ));
        }
        if self.extensions.len() > MAX_EXTENSIONS {
            return Err(ConfigError::Invalid(
                "installer.extensions has too many entries".to_string(),
            ));
        }
        for extension in &self.extensions {
            if extension.is_empty()
                || extension.starts_with('.')
                || !extension.chars().all(|ch| ch.is_ascii_alphanumeric())
            {
                return Err(ConfigError::Invalid(format!(
                    "installer.extensions entry {extension:?} must be alphanumeric without a dot"
                )));
            }
        }
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_DOCUMENT_FILE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "installer.max_file_bytes must be between 1 and {MAX_DOCUMENT_FILE_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Mapping rule configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Directory holding the five rule files.
    pub dir: PathBuf,
    /// Treatment of conflicting mapping entries.
    #[serde(default)]
    pub collisions: CollisionPolicy,
}

impl MappingConfig {
    /// Validates mapping configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("mapping.dir", &self.dir.to_string_lossy())
    }
}

/// Search configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Recursive search policy.
    #[serde(default)]
    pub mode: SearchMode,
}

/// Diagnostic output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level written.
    #[serde(default)]
    pub level: DiagnosticLevel,
    /// Destination for diagnostic lines.
    #[serde(default)]
    pub output: LogOutput,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match &self.output {
            LogOutput::File(path) => {
                validate_path_string("logging.output.file", &path.to_string_lossy())
            }
            LogOutput::Stderr | LogOutput::Disabled => Ok(()),
        }
    }
}

/// Destination for diagnostic lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// JSON lines on standard error.
    #[default]
    Stderr,
    /// Diagnostics are discarded.
    #[serde(rename = "none")]
    Disabled,
    /// JSON lines appended to a file.
    File(PathBuf),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an installer sub-directory: non-empty, relative, no `..`.
fn validate_relative_dir(field: &str, dir: &Path) -> Result<(), ConfigError> {
    validate_path_string(field, &dir.to_string_lossy())?;
    let escapes = dir
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::Invalid(format!(
            "{field} must be a relative path inside installer.root"
        )));
    }
    Ok(())
}

/// Joins a relative path onto the config directory.
fn anchor(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base_dir.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Default baremetal directory.
fn default_baremetal_dir() -> PathBuf {
    PathBuf::from("baremetal")
}

/// Default hardware profile directory.
fn default_hardware_dir() -> PathBuf {
    Path::new("profiles").join("hardware")
}

/// Default host profile directory.
fn default_host_dir() -> PathBuf {
    Path::new("profiles").join("host")
}

/// Default physical network directory.
fn default_network_dir() -> PathBuf {
    Path::new("networks").join("physical")
}

/// Default document extensions.
fn default_extensions() -> Vec<String> {
    vec![DEFAULT_DOCUMENT_EXTENSION.to_string()]
}

/// Default document size limit.
const fn default_max_file_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    const MINIMAL: &str = "[installer]\nroot = \"site\"\n\n[mapping]\ndir = \"mapping\"\n";

    #[test]
    fn minimal_config_applies_defaults() {
        let config = SiteCheckConfig::parse(MINIMAL, Path::new("/etc/sitecheck")).unwrap();
        assert_eq!(config.installer.root, Path::new("/etc/sitecheck/site"));
        assert_eq!(config.mapping.dir, Path::new("/etc/sitecheck/mapping"));
        assert_eq!(config.installer.extensions, ["yaml"]);
        assert_eq!(config.installer.max_file_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
        assert_eq!(config.search.mode, SearchMode::FirstMatch);
        assert_eq!(config.mapping.collisions, CollisionPolicy::Overwrite);
        assert_eq!(config.logging.level, DiagnosticLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stderr);
    }

    #[test]
    fn absolute_paths_are_not_anchored() {
        let content = "[installer]\nroot = \"/srv/site\"\n\n[mapping]\ndir = \"/srv/mapping\"\n";
        let config = SiteCheckConfig::parse(content, Path::new("/etc/sitecheck")).unwrap();
        assert_eq!(config.installer.root, Path::new("/srv/site"));
        assert_eq!(config.mapping.dir, Path::new("/srv/mapping"));
    }

    #[test]
    fn empty_base_dir_keeps_relative_paths() {
        let config = SiteCheckConfig::parse(MINIMAL, Path::new("")).unwrap();
        assert_eq!(config.installer.root, Path::new("site"));
    }

    #[test]
    fn layout_and_options_follow_config() {
        let content = "[installer]\nroot = \"/srv/site\"\nhost_dir = \"hosts\"\nextensions = \
                       [\"yaml\", \"yml\"]\nmax_file_bytes = 2048\n\n[mapping]\ndir = \
                       \"/srv/mapping\"\ncollisions = \"reject\"\n\n[search]\nmode = \
                       \"exhaustive\"\n";
        let config = SiteCheckConfig::parse(content, Path::new("")).unwrap();
        let layout = config.installer_layout();
        assert_eq!(layout.host_path(), Path::new("/srv/site/hosts"));
        assert_eq!(layout.hardware_path(), Path::new("/srv/site/profiles/hardware"));
        let options = config.engine_options();
        assert_eq!(options.read.extensions, ["yaml", "yml"]);
        assert_eq!(options.read.max_file_bytes, 2048);
        assert_eq!(options.search_mode, SearchMode::Exhaustive);
        assert_eq!(options.collisions, CollisionPolicy::Reject);
    }

    #[test]
    fn log_output_spellings_parse() {
        let none = format!("{MINIMAL}\n[logging]\nlevel = \"debug\"\noutput = \"none\"\n");
        let config = SiteCheckConfig::parse(&none, Path::new("")).unwrap();
        assert_eq!(config.logging.output, LogOutput::Disabled);
        assert_eq!(config.logging.level, DiagnosticLevel::Debug);

        let file = format!("{MINIMAL}\n[logging]\noutput = {{ file = \"sitecheck.log\" }}\n");
        let config = SiteCheckConfig::parse(&file, Path::new("")).unwrap();
        assert_eq!(config.logging.output, LogOutput::File(PathBuf::from("sitecheck.log")));
    }

    #[test]
    fn validate_relative_dir_rejects_escapes() {
        assert!(validate_relative_dir("installer.host_dir", Path::new("profiles/host")).is_ok());
        let err = validate_relative_dir("installer.host_dir", Path::new("../host")).unwrap_err();
        assert!(err.to_string().contains("installer.host_dir must be a relative path"));
        assert!(validate_relative_dir("installer.host_dir", Path::new("/abs")).is_err());
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = validate_path_string("mapping.dir", &long).unwrap_err();
        assert!(err.to_string().contains("path component too long"));
    }
}
