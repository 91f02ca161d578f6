//! Error types and handling
//!
//! Each domain (settings, feature definitions, script generation) has its own
//! error enum. They are wrapped by [`DcontainerError`] so callers can handle
//! every failure through a single type.

use thiserror::Error;

/// Settings-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file parsing error
    #[error("Failed to parse settings file: {message}")]
    Parsing { message: String },

    /// Settings validation error
    #[error("Settings validation error: {message}")]
    Validation { message: String },

    /// Settings file I/O error
    #[error("Failed to read settings file")]
    Io(#[from] std::io::Error),

    /// Settings file not found
    #[error("Settings file not found: {path}")]
    NotFound { path: String },
}

/// Feature definition errors
#[derive(Error, Debug)]
pub enum FeatureError {
    /// Feature definition parsing error
    #[error("Failed to parse feature definition: {message}")]
    Parsing { message: String },

    /// Feature definition validation error
    #[error("Feature validation error: {message}")]
    Validation { message: String },

    /// Feature definition file I/O error
    #[error("Failed to read feature definition file")]
    Io(#[from] std::io::Error),

    /// Feature definition file not found
    #[error("Feature definition file not found: {path}")]
    NotFound { path: String },
}

/// Dependency script generation errors
#[derive(Error, Debug)]
pub enum ScriptError {
    /// No release version was supplied and the version source failed
    #[error(
        "Could not resolve release version ({message}), please set the release version explicitly"
    )]
    VersionResolution { message: String },

    /// A dependency option references an option the feature does not declare
    #[error("{message}")]
    UnresolvedOptionReference { reference: String, message: String },

    /// Release version with characters that cannot be embedded in the script
    #[error("Invalid release version '{version}': only letters, digits, '.', '+', '_' and '-' are allowed")]
    InvalidReleaseVersion { version: String },

    /// Dependency option name that cannot be embedded in the script
    #[error("Invalid option name '{name}' for dependency '{feature}': only letters, digits, '_' and '-' are allowed")]
    InvalidOptionName { feature: String, name: String },

    /// Dependency feature reference that cannot be embedded in the script
    #[error("Invalid feature reference '{feature}': whitespace, quotes, '$', '`' and '\\' are not allowed")]
    InvalidFeatureReference { feature: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum DcontainerError {
    /// Settings-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Feature definition errors
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Script generation errors
    #[error("Script generation error: {0}")]
    Script(#[from] ScriptError),
}

/// Convenience type alias for Results with DcontainerError
pub type Result<T> = std::result::Result<T, DcontainerError>;
