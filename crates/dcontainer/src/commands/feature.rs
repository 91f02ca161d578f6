//! Feature subcommand implementations
//!
//! `dcontainer feature generate-dependencies` turns a feature definition into
//! the script installing the feature's dependencies.

use anyhow::{Context, Result};
use dcontainer_core::dependencies_script::DependenciesScript;
use dcontainer_core::features::parse_feature_definition;
use dcontainer_core::settings::GeneratorSettings;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Arguments of `feature generate-dependencies`
#[derive(Debug, Clone)]
pub struct GenerateDependenciesArgs {
    pub path: PathBuf,
    pub release_version: Option<String>,
    pub settings: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// Summary printed with `--json`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDependenciesResult {
    pub feature_id: String,
    pub dependencies: usize,
    pub release_version: String,
    pub output: String,
    pub bytes: usize,
}

/// Execute `feature generate-dependencies`
pub fn execute_generate_dependencies(args: GenerateDependenciesArgs) -> Result<()> {
    let definition = parse_feature_definition(&args.path).with_context(|| {
        format!("Failed to load feature definition from {}", args.path.display())
    })?;
    definition
        .validate()
        .with_context(|| format!("Invalid feature definition in {}", args.path.display()))?;

    let settings = match &args.settings {
        Some(path) => GeneratorSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => GeneratorSettings::default(),
    };
    debug!(?settings, "Using generator settings");

    let generator = DependenciesScript::new(
        Some(&definition.dependencies),
        definition.declared_options(),
        args.release_version.as_deref(),
        &settings,
    )?;
    let script = generator.render().with_context(|| {
        format!(
            "Failed to generate dependencies script for feature '{}'",
            definition.id
        )
    })?;

    match &args.output {
        Some(output) => {
            write_script(output, &script)?;
            info!(
                feature_id = %definition.id,
                dependencies = definition.dependencies.len(),
                "Wrote dependencies script to {}",
                output.display()
            );

            if args.json {
                let result = GenerateDependenciesResult {
                    feature_id: definition.id.clone(),
                    dependencies: definition.dependencies.len(),
                    release_version: generator.release_version().to_string(),
                    output: output.display().to_string(),
                    bytes: script.len(),
                };
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(script.as_bytes())
                .context("Failed to write dependencies script to stdout")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Write the script and mark it executable
fn write_script(path: &Path, script: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, script)
        .with_context(|| format!("Failed to write dependencies script to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_script_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dependencies.sh");

        write_script(&path, "#!/usr/bin/env bash\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/usr/bin/env bash\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_execute_reports_missing_definition() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("dependencies.sh");
        let err = execute_generate_dependencies(GenerateDependenciesArgs {
            path: temp_dir.path().join("missing.json"),
            release_version: Some("1.0.0".to_string()),
            settings: None,
            output: Some(output.clone()),
            json: false,
        })
        .unwrap_err();

        assert!(format!("{:#}", err).contains("Feature definition file not found"));
        assert!(!output.exists());
    }

    #[test]
    fn test_execute_writes_empty_file_without_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let definition = temp_dir.path().join("feature-definition.json");
        fs::write(&definition, r#"{"id": "plain"}"#).unwrap();
        let output = temp_dir.path().join("dependencies.sh");

        execute_generate_dependencies(GenerateDependenciesArgs {
            path: definition,
            release_version: Some("1.0.0".to_string()),
            settings: None,
            output: Some(output.clone()),
            json: false,
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }
}
