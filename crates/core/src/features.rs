//! Feature definition data model
//!
//! A feature definition (`feature-definition.json`) declares the options a
//! feature accepts and the other features it depends on. Dependency option
//! values are either literals or references to the consuming feature's own
//! options, written as `$options.<name>`.
//!
//! ```
//! use dcontainer_core::features::{DependencyValue, FeatureDefinition, OptionValue};
//!
//! let definition = FeatureDefinition::from_json_str(
//!     r#"{
//!         "id": "bat",
//!         "options": { "version": { "type": "string", "default": "latest" } },
//!         "dependencies": [
//!             { "feature": "ghcr.io/devcontainers-contrib/features/gh-release:1",
//!               "options": { "repo": "sharkdp/bat", "version": "$options.version" } }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let options = &definition.dependencies[0].options;
//! assert_eq!(
//!     options["repo"],
//!     DependencyValue::Literal(OptionValue::String("sharkdp/bat".to_string()))
//! );
//! assert_eq!(
//!     options["version"],
//!     DependencyValue::OptionReference("version".to_string())
//! );
//! ```

use crate::errors::{FeatureError, Result};
use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

/// Marker that turns a dependency option value into a reference to one of the
/// consuming feature's options.
pub const OPTION_REFERENCE_PREFIX: &str = "$options.";

/// Concrete option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    String(String),
}

impl OptionValue {
    /// Get as boolean if it's a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string if it's a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Boolean(b) => write!(f, "{}", b),
            OptionValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Feature option definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureOption {
    #[serde(rename = "boolean")]
    Boolean {
        #[serde(default)]
        default: Option<bool>,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "string")]
    String {
        #[serde(default)]
        default: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        r#enum: Option<Vec<String>>,
        #[serde(default)]
        proposals: Option<Vec<String>>,
    },
}

impl FeatureOption {
    /// Get the default value for this option
    pub fn default_value(&self) -> Option<OptionValue> {
        match self {
            FeatureOption::Boolean { default, .. } => default.map(OptionValue::Boolean),
            FeatureOption::String { default, .. } => {
                default.as_ref().map(|s| OptionValue::String(s.clone()))
            }
        }
    }

    /// Validate a value against this option definition
    pub fn validate_value(&self, value: &OptionValue) -> std::result::Result<(), String> {
        match (self, value) {
            (FeatureOption::Boolean { .. }, OptionValue::Boolean(_)) => Ok(()),
            (FeatureOption::String { r#enum, .. }, OptionValue::String(s)) => match r#enum {
                Some(allowed_values) if !allowed_values.contains(s) => Err(format!(
                    "Value '{}' is not one of the allowed values: {:?}",
                    s, allowed_values
                )),
                _ => Ok(()),
            },
            _ => Err("Type mismatch between option definition and provided value".to_string()),
        }
    }
}

/// Option value of a dependency declaration
///
/// Reference detection happens once, when the declaration is parsed, so the
/// script generator only ever matches on these two variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyValue {
    /// Value passed through unchanged
    Literal(OptionValue),
    /// Name of a consuming-feature option, without the `$options.` prefix
    OptionReference(String),
}

impl DependencyValue {
    /// Classify a raw string value
    ///
    /// ```
    /// use dcontainer_core::features::{DependencyValue, OptionValue};
    ///
    /// assert_eq!(
    ///     DependencyValue::parse("$options.version"),
    ///     DependencyValue::OptionReference("version".to_string())
    /// );
    /// assert_eq!(
    ///     DependencyValue::parse("$HOME"),
    ///     DependencyValue::Literal(OptionValue::String("$HOME".to_string()))
    /// );
    /// ```
    pub fn parse(value: &str) -> Self {
        match value.strip_prefix(OPTION_REFERENCE_PREFIX) {
            Some(name) => DependencyValue::OptionReference(name.to_string()),
            None => DependencyValue::Literal(OptionValue::String(value.to_string())),
        }
    }

    /// The value as it was written in the declaration
    pub fn raw(&self) -> String {
        match self {
            DependencyValue::Literal(value) => value.to_string(),
            DependencyValue::OptionReference(name) => {
                format!("{}{}", OPTION_REFERENCE_PREFIX, name)
            }
        }
    }

    /// Whether the value defers to a consuming-feature option
    pub fn is_reference(&self) -> bool {
        matches!(self, DependencyValue::OptionReference(_))
    }
}

impl From<bool> for DependencyValue {
    fn from(value: bool) -> Self {
        DependencyValue::Literal(OptionValue::Boolean(value))
    }
}

impl From<&str> for DependencyValue {
    fn from(value: &str) -> Self {
        DependencyValue::parse(value)
    }
}

impl From<String> for DependencyValue {
    fn from(value: String) -> Self {
        DependencyValue::parse(&value)
    }
}

impl Serialize for DependencyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DependencyValue::Literal(value) => value.serialize(serializer),
            DependencyValue::OptionReference(_) => serializer.serialize_str(&self.raw()),
        }
    }
}

impl<'de> Deserialize<'de> for DependencyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DependencyValueVisitor;

        impl<'de> Visitor<'de> for DependencyValueVisitor {
            type Value = DependencyValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or boolean option value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
                Ok(DependencyValue::from(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(DependencyValue::parse(v))
            }
        }

        deserializer.deserialize_any(DependencyValueVisitor)
    }
}

/// Requirement that another feature be installed with the given options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// Feature reference, usually an OCI artifact address
    pub feature: String,

    /// Option values in declaration order
    #[serde(default, deserialize_with = "deserialize_unique_options")]
    pub options: IndexMap<String, DependencyValue>,
}

impl DependencyDeclaration {
    /// Declaration without options
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            options: IndexMap::new(),
        }
    }

    /// Append an option value
    pub fn with_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<DependencyValue>,
    ) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Whether `name` can be emitted unquoted as `--option NAME="VALUE"`
///
/// ```
/// use dcontainer_core::features::is_valid_option_name;
///
/// assert!(is_valid_option_name("releaseTagRegex"));
/// assert!(is_valid_option_name("binary_name-2"));
/// assert!(!is_valid_option_name("a\"b"));
/// assert!(!is_valid_option_name("a; b"));
/// assert!(!is_valid_option_name(""));
/// ```
pub fn is_valid_option_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// Whether a feature reference can sit inside a double-quoted shell word
/// without being expanded or ending the quoting
pub fn is_safe_feature_reference(feature: &str) -> bool {
    !feature.is_empty()
        && !feature.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '$' | '`' | '\\')
        })
}

/// Reject repeated and non shell-safe option names instead of letting them
/// reach the generated script
fn deserialize_unique_options<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, DependencyValue>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueOptionsVisitor;

    impl<'de> Visitor<'de> for UniqueOptionsVisitor {
        type Value = IndexMap<String, DependencyValue>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of option names to string or boolean values")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut options = IndexMap::new();
            while let Some((name, value)) = access.next_entry::<String, DependencyValue>()? {
                if !is_valid_option_name(&name) {
                    return Err(de::Error::custom(format!(
                        "invalid option name '{}' in dependency options, only letters, digits, '_' and '-' are allowed",
                        name
                    )));
                }
                if options.contains_key(&name) {
                    return Err(de::Error::custom(format!(
                        "duplicate option '{}' in dependency options",
                        name
                    )));
                }
                options.insert(name, value);
            }
            Ok(options)
        }
    }

    deserializer.deserialize_map(UniqueOptionsVisitor)
}

/// Feature definition structure representing feature-definition.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDefinition {
    /// Feature identifier (required)
    #[serde(default)]
    pub id: String,

    /// Feature version
    #[serde(default)]
    pub version: Option<String>,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Feature description
    #[serde(default)]
    pub description: Option<String>,

    /// Feature options
    #[serde(default)]
    pub options: IndexMap<String, FeatureOption>,

    /// Features to install before this one, in order
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
}

impl FeatureDefinition {
    /// Parse a feature definition from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            FeatureError::Parsing {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Options mapping, or `None` when the feature declares no options
    pub fn declared_options(&self) -> Option<&IndexMap<String, FeatureOption>> {
        if self.options.is_empty() {
            None
        } else {
            Some(&self.options)
        }
    }

    /// Validate the feature definition
    pub fn validate(&self) -> std::result::Result<(), FeatureError> {
        if self.id.trim().is_empty() {
            return Err(FeatureError::Validation {
                message: "Feature id is required and cannot be empty".to_string(),
            });
        }

        for (option_name, option_def) in &self.options {
            if let Some(default_value) = option_def.default_value() {
                if let Err(err) = option_def.validate_value(&default_value) {
                    return Err(FeatureError::Validation {
                        message: format!(
                            "Default value for option '{}' is invalid: {}",
                            option_name, err
                        ),
                    });
                }
            }
        }

        for (index, dependency) in self.dependencies.iter().enumerate() {
            if dependency.feature.trim().is_empty() {
                return Err(FeatureError::Validation {
                    message: format!("Dependency #{} has an empty feature reference", index + 1),
                });
            }
            if !is_safe_feature_reference(&dependency.feature) {
                return Err(FeatureError::Validation {
                    message: format!(
                        "Dependency #{} has a feature reference with whitespace, quotes, '$', '`' or '\\': {}",
                        index + 1,
                        dependency.feature
                    ),
                });
            }
            if let Some(name) = dependency
                .options
                .keys()
                .find(|name| !is_valid_option_name(name))
            {
                return Err(FeatureError::Validation {
                    message: format!(
                        "Dependency #{} has an invalid option name '{}', only letters, digits, '_' and '-' are allowed",
                        index + 1,
                        name
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Parse a feature definition from a feature-definition.json file
///
/// Callers are responsible for calling [`FeatureDefinition::validate()`] on
/// the result.
#[instrument(level = "debug")]
pub fn parse_feature_definition(path: &Path) -> Result<FeatureDefinition> {
    debug!("Parsing feature definition from: {}", path.display());

    if !path.exists() {
        return Err(FeatureError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(FeatureError::Io)?;
    let definition = FeatureDefinition::from_json_str(&content)?;

    debug!(
        "Parsed feature: id={:?}, options={}, dependencies={}",
        definition.id,
        definition.options.len(),
        definition.dependencies.len()
    );

    Ok(definition)
}
