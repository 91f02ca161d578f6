//! Integration tests for `dcontainer feature generate-dependencies`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const DEFINITION: &str = r#"{
    "id": "bat",
    "version": "1.0.2",
    "options": {
        "version": {"type": "string", "default": "latest", "proposals": ["latest"]}
    },
    "dependencies": [
        {
            "feature": "ghcr.io/devcontainers-contrib/features/gh-release:1",
            "options": {"repo": "sharkdp/bat", "version": "$options.version"}
        }
    ]
}"#;

fn write_definition(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("feature-definition.json");
    fs::write(&path, content).unwrap();
    path
}

fn generate_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.args(["--log-level", "warn", "feature", "generate-dependencies"]);
    cmd
}

#[test]
fn test_generate_dependencies_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);

    let assert = generate_cmd()
        .arg(&path)
        .args(["--release-version", "0.3.0"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("#!/"), "missing shebang:\n{}", stdout);
    assert!(stdout.contains("pipx install dcontainer==0.3.0"));
    assert!(stdout.ends_with(concat!(
        "$dcontainer_location \\\n",
        "    install \\\n",
        "    devcontainer-feature \\\n",
        "    \"ghcr.io/devcontainers-contrib/features/gh-release:1\" \\\n",
        "    --option repo=\"sharkdp/bat\" --option version=\"$VERSION\"\n",
    )));
}

#[test]
fn test_generate_dependencies_without_dependencies_prints_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, r#"{"id": "plain"}"#);

    generate_cmd()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_generate_dependencies_unresolved_reference_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"id": "x", "dependencies": [{"feature": "f", "options": {"target": "$options.myopt"}}]}"#,
    );

    generate_cmd()
        .arg(&path)
        .args(["--release-version", "1.0.0"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("$options.myopt"));
}

#[test]
fn test_generate_dependencies_writes_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);
    let output = temp_dir.path().join("out").join("install_dependencies.sh");

    generate_cmd()
        .arg(&path)
        .args(["--release-version", "0.3.0", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let script = fs::read_to_string(&output).unwrap();
    assert!(script.contains("ensure_cli dcontainer_location\n"));
    assert!(script.contains("--option version=\"$VERSION\""));
}

#[test]
fn test_generate_dependencies_json_summary() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);
    let output = temp_dir.path().join("install_dependencies.sh");

    let assert = generate_cmd()
        .arg(&path)
        .args(["--release-version", "0.3.0", "--json", "-o"])
        .arg(&output)
        .assert()
        .success();

    let summary: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(summary["featureId"], "bat");
    assert_eq!(summary["dependencies"], 1);
    assert_eq!(summary["releaseVersion"], "0.3.0");
    assert_eq!(
        summary["bytes"].as_u64().unwrap() as usize,
        fs::read_to_string(&output).unwrap().len()
    );
}

#[test]
fn test_generate_dependencies_with_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);
    let settings = temp_dir.path().join("generator.toml");
    fs::write(
        &settings,
        r#"
env_prefix = "NANOLAYER_"
cli_name = "nanolayer"
location_variable = "nanolayer_location"
download_url_template = "https://github.com/devcontainers-contrib/nanolayer/releases/download/v{release_version}/nanolayer-x86_64-unknown-linux-gnu"
"#,
    )
    .unwrap();

    generate_cmd()
        .arg(&path)
        .args(["--release-version", "0.4.29", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("NANOLAYER_CLI_LOCATION"))
        .stdout(predicate::str::contains("pipx install nanolayer==0.4.29"))
        .stdout(predicate::str::contains("$nanolayer_location \\\n    install"));
}

#[test]
fn test_generate_dependencies_invalid_settings_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);
    let settings = temp_dir.path().join("generator.toml");
    fs::write(&settings, "download_url_template = \"https://example.com/cli\"\n").unwrap();

    generate_cmd()
        .arg(&path)
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));
}

#[test]
fn test_generate_dependencies_missing_definition_fails() {
    let temp_dir = TempDir::new().unwrap();

    generate_cmd()
        .arg(temp_dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Feature definition file not found"));
}

#[test]
fn test_generate_dependencies_rejects_unsafe_release_version() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(&temp_dir, DEFINITION);

    generate_cmd()
        .arg(&path)
        .args(["--release-version", "1.0.0$(id)"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid release version '1.0.0$(id)'"));
}

#[test]
fn test_generate_dependencies_rejects_unsafe_option_name() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"id": "x", "dependencies": [{"feature": "f", "options": {"a; id; b": "1"}}]}"#,
    );

    generate_cmd()
        .arg(&path)
        .args(["--release-version", "1.0.0"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid option name 'a; id; b'"));
}
