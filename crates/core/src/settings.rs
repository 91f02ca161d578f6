//! Generator settings
//!
//! The generated script reads a couple of environment variables at its own
//! runtime (force reinstall, CLI location override, ...). Their names share a
//! prefix which, together with the helper CLI name and its download location,
//! is carried by [`GeneratorSettings`]. The generator never reads these from
//! the process environment; callers construct the settings explicitly or load
//! them from a TOML file.
//!
//! ```
//! use dcontainer_core::settings::GeneratorSettings;
//!
//! let settings = GeneratorSettings::default();
//! assert_eq!(settings.cli_location_env(), "DCONTAINER_CLI_LOCATION");
//! assert_eq!(
//!     settings.force_cli_installation_env(),
//!     "DCONTAINER_FORCE_CLI_INSTALLATION"
//! );
//! ```

use crate::errors::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// Placeholder substituted with the release version in the download URL
pub const RELEASE_VERSION_PLACEHOLDER: &str = "{release_version}";

const DEFAULT_ENV_PREFIX: &str = "DCONTAINER_";
const DEFAULT_CLI_NAME: &str = "dcontainer";
const DEFAULT_LOCATION_VARIABLE: &str = "dcontainer_location";
const DEFAULT_DOWNLOAD_URL_TEMPLATE: &str = "https://github.com/devcontainers-contrib/cli/releases/download/{release_version}/dcontainer-x86_64-unknown-linux-gnu";

/// Settings consumed by the dependency script generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Prefix shared by every environment variable the generated script reads
    pub env_prefix: String,
    /// Executable name of the helper CLI, also its Python package name
    pub cli_name: String,
    /// Shell variable holding the resolved helper CLI location
    pub location_variable: String,
    /// Prebuilt binary URL; `{release_version}` is replaced by the release version
    pub download_url_template: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            cli_name: DEFAULT_CLI_NAME.to_string(),
            location_variable: DEFAULT_LOCATION_VARIABLE.to_string(),
            download_url_template: DEFAULT_DOWNLOAD_URL_TEMPLATE.to_string(),
        }
    }
}

impl GeneratorSettings {
    /// Environment variable overriding the helper CLI location
    pub fn cli_location_env(&self) -> String {
        format!("{}CLI_LOCATION", self.env_prefix)
    }

    /// Environment variable forcing a fresh helper CLI installation
    pub fn force_cli_installation_env(&self) -> String {
        format!("{}FORCE_CLI_INSTALLATION", self.env_prefix)
    }

    /// Environment variable controlling whether the resolved location is
    /// exported to nested installations
    pub fn propagate_cli_location_env(&self) -> String {
        format!("{}PROPAGATE_CLI_LOCATION", self.env_prefix)
    }

    /// Download URL for the given release
    pub fn download_url(&self, release_version: &str) -> String {
        self.download_url_template
            .replace(RELEASE_VERSION_PLACEHOLDER, release_version)
    }

    /// Parse settings from TOML text; omitted keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: GeneratorSettings =
            toml::from_str(content).map_err(|e| ConfigError::Parsing {
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a TOML file
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading generator settings from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Check that every value can be embedded in the generated script
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.env_prefix.is_empty() && !is_shell_identifier(&self.env_prefix) {
            return Err(ConfigError::Validation {
                message: format!(
                    "env_prefix '{}' must contain only letters, digits and underscores and must not start with a digit",
                    self.env_prefix
                ),
            });
        }

        if !is_shell_identifier(&self.location_variable) {
            return Err(ConfigError::Validation {
                message: format!(
                    "location_variable '{}' is not a valid shell variable name",
                    self.location_variable
                ),
            });
        }

        let valid_cli_name = !self.cli_name.is_empty()
            && self
                .cli_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid_cli_name {
            return Err(ConfigError::Validation {
                message: format!(
                    "cli_name '{}' must be a non-empty executable name",
                    self.cli_name
                ),
            });
        }

        if !self
            .download_url_template
            .contains(RELEASE_VERSION_PLACEHOLDER)
        {
            return Err(ConfigError::Validation {
                message: format!(
                    "download_url_template must contain the {} placeholder",
                    RELEASE_VERSION_PLACEHOLDER
                ),
            });
        }

        if self
            .download_url_template
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '$' | ';' | '\\'))
        {
            return Err(ConfigError::Validation {
                message: "download_url_template contains characters unsafe for a shell script"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn is_shell_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
