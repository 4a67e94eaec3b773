//! # Config Loader
//!
//! Loads the engine's [`EngineConfig`] from TOML text, from an explicit file, or
//! from the per-application default location, then applies `ARGOT_*`
//! environment overrides.
//!
//! Resolution order, later wins:
//!
//! 1. `EngineConfig::default()`
//! 2. the TOML file (`<config_dir>/<app_name>/argot.toml` unless a path is given)
//! 3. environment variables (`ARGOT_NO_COLOR`, `ARGOT_UNMATCHED_AS_ERROR`,
//!    `ARGOT_STORE_PREFIX`)

use crate::constants::{CONFIG_FILENAME, ENV_PREFIX};
use crate::core::coerce;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The system has no configuration directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The path could not be expanded (`~`, `$VAR`).
    #[error("Could not expand path '{path}': {message}")]
    PathExpansion {
        /// The path as written.
        path: String,
        /// What went wrong.
        message: String,
    },
    /// The file could not be read.
    #[error("Could not read config file '{path}': {source}")]
    Read {
        /// The file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML was malformed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shown in usage lines and version output.
    pub app_name: String,
    pub version: String,
    pub description: String,
    /// Unknown words and flags abort instead of becoming positional.
    pub unmatched_as_error: bool,
    /// Prepended to every store key.
    pub store_prefix: String,
    /// Disables ANSI colors in printers.
    pub no_color: bool,
    /// Inject the built-in flags and commands (`--help`, `version`, ...).
    pub builtins: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            unmatched_as_error: false,
            store_prefix: String::new(),
            no_color: false,
            builtins: true,
        }
    }
}

/// The one key whose absence must not fall back to the crate default.
#[derive(Deserialize)]
struct DeclaredName {
    app_name: Option<String>,
}

impl EngineConfig {
    /// Parses a config from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a config file. `path` may use `~` and `$VAR`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = read_config(&expand_path(path)?)?;
        Self::from_toml_str(&content)
    }

    /// Loads `<config_dir>/<app_name>/argot.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load_default(app_name: &str) -> Result<Self, ConfigError> {
        Self::load_for_app(&default_config_path(app_name)?, app_name)
    }

    /// Loads the config of `app_name` from `path`. The file's own `app_name`
    /// wins; otherwise the given one is used, never the crate default.
    pub fn load_for_app(path: &Path, app_name: &str) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at '{}', using defaults.", path.display());
            return Ok(Self {
                app_name: app_name.to_string(),
                ..Self::default()
            });
        }
        let content = read_config(path)?;
        let mut config = Self::from_toml_str(&content)?;
        let declared: DeclaredName = toml::from_str(&content)?;
        config.app_name = declared.app_name.unwrap_or_else(|| app_name.to_string());
        Ok(config)
    }

    /// Applies `ARGOT_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        if let Some(v) = var("NO_COLOR") {
            self.no_color = coerce::parse_bool(&v, true);
        }
        if let Some(v) = var("UNMATCHED_AS_ERROR") {
            self.unmatched_as_error = coerce::parse_bool(&v, true);
        }
        if let Some(v) = var("STORE_PREFIX") {
            self.store_prefix = v;
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }
}

/// `<config_dir>/<app_name>/argot.toml`.
pub fn default_config_path(app_name: &str) -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(app_name)
        .join(CONFIG_FILENAME))
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("Loaded config from '{}'.", path.display());
    Ok(content)
}

fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(path).map_err(|e| ConfigError::PathExpansion {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(Path::new(expanded.as_ref()).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_from_toml_keeps_defaults_for_missing_keys() {
        let config = EngineConfig::from_toml_str("app_name = \"demo\"\nno_color = true\n").unwrap();
        assert_eq!(config.app_name, "demo");
        assert!(config.no_color);
        assert!(config.builtins);
        assert!(!config.unmatched_as_error);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("app_name = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unmatched_as_error = true\nstore_prefix = \"cfg\"").unwrap();
        let config = EngineConfig::load(&file.path().to_string_lossy()).unwrap();
        assert!(config.unmatched_as_error);
        assert_eq!(config.store_prefix, "cfg");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = EngineConfig::load(&missing.to_string_lossy()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_for_app_names_the_app_unless_the_file_does() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let config = EngineConfig::load_for_app(&path, "myapp").unwrap();
        assert_eq!(config.app_name, "myapp");

        fs::write(&path, "no_color = true\n").unwrap();
        let config = EngineConfig::load_for_app(&path, "myapp").unwrap();
        assert_eq!(config.app_name, "myapp");
        assert!(config.no_color);

        fs::write(&path, "app_name = \"renamed\"\n").unwrap();
        let config = EngineConfig::load_for_app(&path, "myapp").unwrap();
        assert_eq!(config.app_name, "renamed");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ARGOT_NO_COLOR", "yes"),
            ("ARGOT_STORE_PREFIX", "env"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        config.apply_env_with(|k| env.get(k).map(|v| (*v).to_string()));
        assert!(config.no_color);
        assert_eq!(config.store_prefix, "env");
        assert!(!config.unmatched_as_error);
    }
}
