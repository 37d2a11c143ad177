//! Configuration loading: file, legacy variables and prefixed overrides.

use std::io::Write;

use brandscore::domain::models::ProfileKind;
use brandscore::ConfigLoader;
use tempfile::NamedTempFile;

const BASE_YAML: &str = "queue:
  max_concurrent: 2
  max_queue_size: 20
fallback:
  score: 30
delivery:
  endpoints:
    - https://queue.internal
";

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Every variable these tests touch, cleared unless a test sets it.
fn clean_env<'a>(overrides: &[(&'a str, &'a str)]) -> Vec<(&'a str, Option<&'a str>)> {
    let mut vars: Vec<(&str, Option<&str>)> = [
        "QUEUE_MAX_CONCURRENT",
        "QUEUE_MAX_SIZE",
        "BRANDSCORE_QUEUE__MAX_CONCURRENT",
        "BRANDSCORE_FALLBACK__CONFIDENCE",
        "BRANDSCORE_ORCHESTRATION__PROFILE",
        "BRANDSCORE_DELIVERY__IN_PROCESS",
        "BRANDSCORE_CONFIG",
    ]
    .into_iter()
    .filter(|var| !overrides.iter().any(|(k, _)| k == var))
    .map(|var| (var, None))
    .collect();
    vars.extend(overrides.iter().map(|(k, v)| (*k, Some(*v))));
    vars
}

#[test]
fn test_file_values_over_defaults() {
    let file = config_file(BASE_YAML);
    temp_env::with_vars(clean_env(&[]), || {
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.queue.max_concurrent, 2);
        assert_eq!(config.queue.max_queue_size, 20);
        assert_eq!(config.queue.retention_secs, 3_600);
        assert!((config.fallback.score - 30.0).abs() < f64::EPSILON);
        assert!((config.fallback.confidence - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.delivery.endpoints, vec!["https://queue.internal".to_string()]);
    });
}

#[test]
fn test_prefixed_env_overrides_file() {
    let file = config_file(BASE_YAML);
    let env = clean_env(&[
        ("BRANDSCORE_QUEUE__MAX_CONCURRENT", "7"),
        ("BRANDSCORE_ORCHESTRATION__PROFILE", "performance"),
        ("BRANDSCORE_DELIVERY__IN_PROCESS", "false"),
    ]);
    temp_env::with_vars(env, || {
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.queue.max_concurrent, 7);
        assert_eq!(config.queue.max_queue_size, 20, "untouched file value persists");
        assert_eq!(config.orchestration.profile, ProfileKind::Performance);
        assert!(!config.delivery.in_process);
    });
}

#[test]
fn test_legacy_variables_are_honoured() {
    let file = config_file(BASE_YAML);
    let env = clean_env(&[("QUEUE_MAX_CONCURRENT", "4"), ("QUEUE_MAX_SIZE", "80")]);
    temp_env::with_vars(env, || {
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.queue.max_concurrent, 4);
        assert_eq!(config.queue.max_queue_size, 80);
    });
}

#[test]
fn test_prefixed_variable_beats_legacy() {
    let file = config_file(BASE_YAML);
    let env = clean_env(&[
        ("QUEUE_MAX_CONCURRENT", "4"),
        ("BRANDSCORE_QUEUE__MAX_CONCURRENT", "9"),
    ]);
    temp_env::with_vars(env, || {
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.queue.max_concurrent, 9);
    });
}

#[test]
fn test_config_path_variable_is_not_a_setting() {
    let file = config_file(BASE_YAML);
    let path = file.path().display().to_string();
    let env = clean_env(&[("BRANDSCORE_CONFIG", path.as_str())]);
    temp_env::with_vars(env, || {
        assert!(ConfigLoader::load_from_file(file.path()).is_ok());
    });
}

#[test]
fn test_env_override_is_validated() {
    let file = config_file(BASE_YAML);
    let env = clean_env(&[("BRANDSCORE_FALLBACK__CONFIDENCE", "0.5")]);
    temp_env::with_vars(env, || {
        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Invalid fallback.confidence: 0.5"), "{message}");
    });
}

#[test]
fn test_unknown_keys_are_rejected() {
    let file = config_file("queue:\n  workers: 3\n");
    temp_env::with_vars(clean_env(&[]), || {
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    });
}
