//! Dependency installation script generation
//!
//! Produces the script a feature runs to install the features it depends on.
//! The script starts with a bootstrap preamble that locates (or downloads) the
//! helper CLI, followed by one `install devcontainer-feature` invocation per
//! dependency, in declaration order.
//!
//! Option values of a dependency are either literals, emitted as-is, or
//! references to an option of the consuming feature. A reference to option
//! `myopt` becomes the shell variable `$MYOPT`, which the feature's own install
//! environment provides when the script runs.
//!
//! ```
//! use dcontainer_core::dependencies_script::generate;
//! use dcontainer_core::features::DependencyDeclaration;
//! use dcontainer_core::settings::GeneratorSettings;
//!
//! let settings = GeneratorSettings::default();
//! let dependencies =
//!     vec![DependencyDeclaration::new("ghcr.io/x/y").with_option("version", "1.2.3")];
//!
//! let script = generate(Some(&dependencies), None, Some("9.9.9"), &settings).unwrap();
//! assert!(script.contains(r#"--option version="1.2.3""#));
//!
//! assert_eq!(generate(Some(&[]), None, Some("9.9.9"), &settings).unwrap(), "");
//! ```

use crate::errors::{Result, ScriptError};
use crate::features::{
    is_safe_feature_reference, is_valid_option_name, DependencyDeclaration, DependencyValue,
    FeatureOption, OptionValue,
};
use crate::settings::GeneratorSettings;
use crate::version::resolve_own_release_version;
use indexmap::IndexMap;
use tracing::{debug, instrument};

/// Option values of one dependency after reference resolution
pub type ResolvedParameters = IndexMap<String, OptionValue>;

const BOOTSTRAP_TEMPLATE: &str = r#"#!/usr/bin/env bash
# This code was generated by the __CLI_NAME__ cli
# For more information: https://github.com/devcontainers-contrib/cli

set -e

ensure_jq() {
    # Ensure jq available
    if ! type jq >/dev/null 2>&1; then
        apt-get update -y && apt-get -y install --no-install-recommends jq
    fi
}

ensure_pipx() {
    # Ensure the existence of a minimal python3 and pipx
    if ! type python3 >/dev/null 2>&1; then
        echo "installing python3-minimal"
        apt-get update -y
        apt-get -y install python3-minimal
    fi

    if ! type pip3 >/dev/null 2>&1; then
        echo "installing python3-pip"
        apt-get update -y
        apt-get -y install libffi-dev python3-pip
    fi

    if ! python3 -Im ensurepip --version >/dev/null 2>&1; then
        echo "installing python3-venv"
        apt-get update -y
        apt-get -y install python3-venv
    fi

    if ! type pipx >/dev/null 2>&1; then
        echo "installing pipx"
        pip3 install pipx
    fi
}

ensure_curl() {
    # Ensure curl available
    if ! type curl >/dev/null 2>&1; then
        apt-get update -y && apt-get -y install --no-install-recommends curl ca-certificates
    fi
}

ensure_cli() {
    # Resolve the location of the __CLI_NAME__ cli program
    local variable_name=$1
    local resolved_location=""

    if [[ -z "${__FORCE_ENV__}" ]]; then
        if [[ -n "${__LOCATION_ENV__}" ]] && [ -f "${__LOCATION_ENV__}" ] && [ -x "${__LOCATION_ENV__}" ]; then
            echo "Using the __CLI_NAME__ given in __LOCATION_ENV__"
            resolved_location=${__LOCATION_ENV__}
        elif type __CLI_NAME__ >/dev/null 2>&1; then
            echo "Using a pre-existing __CLI_NAME__"
            resolved_location=__CLI_NAME__
        fi
    fi

    # Without a usable installation, fetch one for the duration of this script
    if [[ -z "${resolved_location}" ]]; then
        if [ "$(uname -sm)" != "Linux x86_64" ]; then
            echo "No prebuilt __CLI_NAME__ binary for $(uname -sm), falling back to a python based installation"

            ensure_pipx
            ensure_jq
            pipx install __CLI_NAME__==__RELEASE_VERSION__
            resolved_location=$(pipx list --json | jq -r ".venvs[\"__CLI_NAME__\"].metadata.main_package.app_paths[0].__Path__")
        else
            tmp_dir=$(mktemp -d -t __CLI_NAME__-XXXXXXXXXX)

            clean_up() {
                local exit_code=$?
                rm -rf "${tmp_dir}"
                exit $exit_code
            }
            trap clean_up EXIT

            curl -sSL -o "${tmp_dir}/__CLI_NAME__" "__DOWNLOAD_URL__"
            chmod a+x "${tmp_dir}/__CLI_NAME__"
            resolved_location=${tmp_dir}/__CLI_NAME__
        fi
    fi

    # Let nested installations reuse the same binary
    if [[ "${__PROPAGATE_ENV__:-1}" == "1" ]] && [ -f "${resolved_location}" ]; then
        export __LOCATION_ENV__="${resolved_location}"
    fi

    declare -g "${variable_name}=${resolved_location}"
}

ensure_curl

ensure_cli __LOCATION_VARIABLE__

"#;

/// Generator for a feature's dependency installation script
#[derive(Debug)]
pub struct DependenciesScript<'a> {
    dependencies: Option<&'a [DependencyDeclaration]>,
    options: Option<&'a IndexMap<String, FeatureOption>>,
    release_version: String,
    settings: &'a GeneratorSettings,
}

impl<'a> DependenciesScript<'a> {
    /// Create a generator, falling back to this build's release version when
    /// none is given
    pub fn new(
        dependencies: Option<&'a [DependencyDeclaration]>,
        options: Option<&'a IndexMap<String, FeatureOption>>,
        release_version: Option<&str>,
        settings: &'a GeneratorSettings,
    ) -> Result<Self> {
        Self::with_version_source(
            dependencies,
            options,
            release_version,
            settings,
            resolve_own_release_version,
        )
    }

    /// Create a generator with a custom release version source
    ///
    /// `source` is only called when `release_version` is `None`. Either way
    /// the version must consist of `[A-Za-z0-9.+_-]`, since it lands unquoted
    /// in the preamble.
    pub fn with_version_source<F>(
        dependencies: Option<&'a [DependencyDeclaration]>,
        options: Option<&'a IndexMap<String, FeatureOption>>,
        release_version: Option<&str>,
        settings: &'a GeneratorSettings,
        source: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> anyhow::Result<String>,
    {
        let release_version = match release_version {
            Some(version) => version.to_string(),
            None => source().map_err(|e| ScriptError::VersionResolution {
                message: format!("{:#}", e),
            })?,
        };
        if !is_valid_release_version(&release_version) {
            return Err(ScriptError::InvalidReleaseVersion {
                version: release_version,
            }
            .into());
        }

        Ok(Self {
            dependencies,
            options,
            release_version,
            settings,
        })
    }

    /// Release version the bootstrap preamble pins the helper CLI to
    pub fn release_version(&self) -> &str {
        &self.release_version
    }

    /// Render the script; empty when there are no dependencies
    #[instrument(skip(self), fields(release_version = %self.release_version))]
    pub fn render(&self) -> Result<String> {
        let dependencies = match self.dependencies {
            Some(dependencies) if !dependencies.is_empty() => dependencies,
            _ => {
                debug!("No dependencies declared, nothing to generate");
                return Ok(String::new());
            }
        };

        let mut blocks = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if !is_safe_feature_reference(&dependency.feature) {
                return Err(ScriptError::InvalidFeatureReference {
                    feature: dependency.feature.clone(),
                }
                .into());
            }
            let parameters = resolve_parameters(dependency, self.options)?;
            debug!(
                feature = %dependency.feature,
                options = parameters.len(),
                "Adding dependency install command"
            );
            blocks.push(install_command(
                &self.settings.location_variable,
                &dependency.feature,
                &parameters,
            ));
        }

        let mut script = bootstrap_preamble(&self.release_version, self.settings);
        script.push_str(&blocks.join("\n\n"));
        script.push('\n');

        debug!(
            dependencies = blocks.len(),
            bytes = script.len(),
            "Generated dependencies script"
        );
        Ok(script)
    }
}

/// Generate the dependency installation script in one step
pub fn generate(
    dependencies: Option<&[DependencyDeclaration]>,
    options: Option<&IndexMap<String, FeatureOption>>,
    release_version: Option<&str>,
    settings: &GeneratorSettings,
) -> Result<String> {
    DependenciesScript::new(dependencies, options, release_version, settings)?.render()
}

/// Resolve every option reference of a dependency against the consuming
/// feature's options
pub fn resolve_parameters(
    dependency: &DependencyDeclaration,
    options: Option<&IndexMap<String, FeatureOption>>,
) -> Result<ResolvedParameters> {
    let mut parameters = ResolvedParameters::with_capacity(dependency.options.len());
    for (name, value) in &dependency.options {
        if !is_valid_option_name(name) {
            return Err(ScriptError::InvalidOptionName {
                feature: dependency.feature.clone(),
                name: name.clone(),
            }
            .into());
        }
        let resolved = match value {
            DependencyValue::Literal(literal) => literal.clone(),
            DependencyValue::OptionReference(option_name) => {
                OptionValue::String(resolve_option_reference(option_name, options)?)
            }
        };
        parameters.insert(name.clone(), resolved);
    }
    Ok(parameters)
}

/// Map a referenced option name to the shell variable carrying its value
fn resolve_option_reference(
    option_name: &str,
    options: Option<&IndexMap<String, FeatureOption>>,
) -> std::result::Result<String, ScriptError> {
    let reference = DependencyValue::OptionReference(option_name.to_string()).raw();

    let options = options.ok_or_else(|| ScriptError::UnresolvedOptionReference {
        message: format!(
            "option reference was given: '{}' but no options exist",
            reference
        ),
        reference: reference.clone(),
    })?;

    if !options.contains_key(option_name) {
        let available: Vec<&str> = options.keys().map(String::as_str).collect();
        return Err(ScriptError::UnresolvedOptionReference {
            message: format!(
                "could not resolve option reference: '{}', please ensure the option name is spelled right (available options: {})",
                reference,
                available.join(", ")
            ),
            reference,
        });
    }

    Ok(format!("${}", option_name).to_uppercase())
}

fn is_valid_release_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '_' | '-'))
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Render one `install devcontainer-feature` invocation
///
/// The option line, and the continuation leading to it, is left out when the
/// dependency has no options.
fn install_command(
    location_variable: &str,
    feature: &str,
    parameters: &ResolvedParameters,
) -> String {
    let mut command = format!(
        "${} \\\n    install \\\n    devcontainer-feature \\\n    \"{}\"",
        location_variable,
        escape_quotes(feature)
    );

    if !parameters.is_empty() {
        let option_args = parameters
            .iter()
            .map(|(name, value)| {
                format!(
                    "--option {}=\"{}\"",
                    name,
                    escape_quotes(&value.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        command.push_str(" \\\n    ");
        command.push_str(&option_args);
    }

    command
}

/// Bootstrap preamble that makes the helper CLI available
fn bootstrap_preamble(release_version: &str, settings: &GeneratorSettings) -> String {
    BOOTSTRAP_TEMPLATE
        .replace("__FORCE_ENV__", &settings.force_cli_installation_env())
        .replace("__LOCATION_ENV__", &settings.cli_location_env())
        .replace("__PROPAGATE_ENV__", &settings.propagate_cli_location_env())
        .replace("__LOCATION_VARIABLE__", &settings.location_variable)
        .replace("__DOWNLOAD_URL__", &settings.download_url(release_version))
        .replace("__RELEASE_VERSION__", release_version)
        .replace("__CLI_NAME__", &settings.cli_name)
}
