// tests/integration/config_errors.rs

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;
use wavebuild::cli::CliArgs;
use wavebuild::config::load_and_validate;
use wavebuild::errors::WavebuildError;

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_group_cycle_returns_structured_error() {
    let file = plan_file(
        r#"
[group.a]
variants = ["amd64"]
from = "b"

[group.b]
variants = ["amd64"]
from = "a"
"#,
    );

    match load_and_validate(file.path()) {
        Err(WavebuildError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('a') || msg.contains('b'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_parent_returns_config_error() {
    let file = plan_file(
        r#"
[group.a]
variants = ["amd64"]
from = "NonExistent"
"#,
    );

    match load_and_validate(file.path()) {
        Err(WavebuildError::ConfigError(msg)) => {
            assert!(msg.contains("unknown parent"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_and_duplicate_variants_are_rejected() {
    let empty = plan_file("[group.a]\nvariants = []\n");
    assert!(matches!(
        load_and_validate(empty.path()),
        Err(WavebuildError::ConfigError(msg)) if msg.contains("at least one variant")
    ));

    let duplicate = plan_file("[group.a]\nvariants = [\"amd64\", \"amd64\"]\n");
    assert!(matches!(
        load_and_validate(duplicate.path()),
        Err(WavebuildError::ConfigError(msg)) if msg.contains("more than once")
    ));
}

#[test]
fn test_zero_parallelism_and_empty_plan_are_rejected() {
    let zero = plan_file("[config]\nmax_parallelism = 0\n\n[group.a]\nvariants = [\"amd64\"]\n");
    assert!(matches!(
        load_and_validate(zero.path()),
        Err(WavebuildError::ConfigError(_))
    ));

    let empty = plan_file("[config]\nmax_parallelism = 2\n");
    assert!(matches!(
        load_and_validate(empty.path()),
        Err(WavebuildError::ConfigError(msg)) if msg.contains("at least one")
    ));
}

#[test]
fn test_malformed_toml_returns_toml_error() {
    let file = plan_file("[group.a\nvariants = [\"amd64\"]\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(WavebuildError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_reported_with_path() {
    let err = load_and_validate("/definitely/not/here/Wavebuild.toml").unwrap_err();
    assert!(format!("{err:#}").contains("Wavebuild.toml"), "{err:#}");
}

#[test]
fn test_valid_plan_applies_defaults() {
    let file = plan_file(
        r#"
[config]
registry = "registry.example.org/ci-"

[group.base]
variants = ["amd64", "arm64v8"]
dockerfile = "FROM {variant}/debian:stable\n"

[group.builder]
from = "base"
variants = ["amd64"]
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();
    assert_eq!(plan.config().max_parallelism, 1);
    assert!(plan.config().publish);
    assert!(!plan.config().no_cache);
    assert_eq!(plan.config().registry, "registry.example.org/ci-");
    assert_eq!(plan.group("builder").unwrap().from.as_deref(), Some("base"));
    assert_eq!(plan.group("builder").unwrap().dockerfile, "");
}

#[tokio::test]
async fn test_dry_run_validates_without_building() {
    let file = plan_file(
        r#"
[group.base]
variants = ["amd64", "arm64v8"]

[group.builder]
from = "base"
variants = ["amd64", "arm64v8"]
"#,
    );
    let path = file.path().to_string_lossy().to_string();

    let args = CliArgs::try_parse_from([
        "wavebuild",
        "--config",
        path.as_str(),
        "--only",
        "base/amd64",
        "--dry-run",
    ])
    .unwrap();
    let report = wavebuild::run(args).await.unwrap();
    assert_eq!(report.completed, 0);
    assert!(report.published.is_empty());

    let args = CliArgs::try_parse_from([
        "wavebuild",
        "--config",
        path.as_str(),
        "--only",
        "nope",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        wavebuild::run(args).await,
        Err(WavebuildError::GroupNotFound(name)) if name == "nope"
    ));
}
