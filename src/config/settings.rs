//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field is optional; an empty object yields the stock plugin setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::import::{
    ImportSettings, DEFAULT_CACHE_FILE, DEFAULT_COMMIT_MESSAGE, DEFAULT_LIBRARY_NAME,
    DEFAULT_PACKAGE_3D_NAME,
};
use crate::process::{self, CLIENT_IMAGE_NAME};

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Directory holding the plugin's files (cache, log, client).
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,

    /// Target library settings.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Catalog client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Host bridge settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("library.name", &self.library.name),
            ("library.package_3d_name", &self.library.package_3d_name),
            ("library.cache_file", &self.library.cache_file),
            ("logging.file", &self.logging.file),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{field} must not be empty"),
                });
            }
        }

        if self.host.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "host.timeout_secs must be greater than zero".to_string(),
            });
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }
        Ok(())
    }

    /// Session settings rooted at `plugin_dir`.
    #[must_use]
    pub fn import_settings(&self, plugin_dir: &Path) -> ImportSettings {
        ImportSettings {
            plugin_dir: plugin_dir.to_path_buf(),
            library_name: self.library.name.clone(),
            package_3d_name: self.library.package_3d_name.clone(),
            commit_message: self.library.commit_message.clone(),
            cache_file: self.library.cache_file.clone(),
        }
    }

    /// Catalog client executable, relative paths resolved against `plugin_dir`.
    #[must_use]
    pub fn client_executable(&self, plugin_dir: &Path) -> PathBuf {
        self.client.executable.as_ref().map_or_else(
            || process::default_client_executable(plugin_dir),
            |exe| plugin_dir.join(exe),
        )
    }
}

/// Target library configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Display name of the reusable library document.
    #[serde(default = "default_library_name")]
    pub name: String,

    /// Display name of saved 3D package shells.
    #[serde(default = "default_package_3d_name")]
    pub package_3d_name: String,

    /// Commit message for new library documents.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Identity cache file name inside the plugin directory.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: default_library_name(),
            package_3d_name: default_package_3d_name(),
            commit_message: default_commit_message(),
            cache_file: default_cache_file(),
        }
    }
}

fn default_library_name() -> String {
    DEFAULT_LIBRARY_NAME.to_string()
}

fn default_package_3d_name() -> String {
    DEFAULT_PACKAGE_3D_NAME.to_string()
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

fn default_cache_file() -> String {
    DEFAULT_CACHE_FILE.to_string()
}

/// Catalog client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Executable path, relative to the plugin directory.
    /// Default: the platform's bundled client.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Image name force-killed on Windows at shutdown.
    #[serde(default = "default_image_name")]
    pub image_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            executable: None,
            image_name: default_image_name(),
        }
    }
}

#[allow(clippy::unnecessary_wraps)] // serde default must match the field type
fn default_image_name() -> Option<String> {
    Some(CLIENT_IMAGE_NAME.to_string())
}

/// Host bridge configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Seconds to wait for one host call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HostConfig {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file name inside the plugin directory, truncated at start-up.
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "snapeda.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.library.name, "SnapEDA Library");
        assert_eq!(config.host.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "plugin_dir": "/opt/snapeda",
            "library": {
                "name": "Team Parts",
                "package_3d_name": "Team 3D Package",
                "commit_message": "Imported",
                "cache_file": "urn.txt"
            },
            "client": {
                "executable": "bin/client",
                "image_name": null
            },
            "host": {
                "timeout_secs": 30
            },
            "logging": {
                "level": "debug",
                "file": "importer.log"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.plugin_dir, Some(PathBuf::from("/opt/snapeda")));
        assert_eq!(config.client.image_name, None);
        assert_eq!(config.host.timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "importer.log");

        let settings = config.import_settings(Path::new("/opt/snapeda"));
        assert_eq!(settings.library_name, "Team Parts");
        assert_eq!(settings.package_3d_name, "Team 3D Package");
        assert_eq!(settings.cache_path(), PathBuf::from("/opt/snapeda/urn.txt"));
        assert_eq!(
            config.client_executable(Path::new("/opt/snapeda")),
            PathBuf::from("/opt/snapeda/bin/client")
        );
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::default();
        assert!(config.executable.is_none());
        assert_eq!(config.image_name.as_deref(), Some(CLIENT_IMAGE_NAME));
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file, "snapeda.log");
    }

    #[test]
    fn reject_empty_library_name() {
        let json = r#"{ "library": { "name": "  " } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_timeout() {
        let json = r#"{ "host": { "timeout_secs": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
