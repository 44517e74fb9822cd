use std::path::PathBuf;
use std::sync::Mutex;

use jem_config::{
    discover_config_path, load_for_dir, AnalysisConfig, ConfigError, JemConfig, LoggingConfig,
    CACHE_DIR_ENV_VAR,
};
use pretty_assertions::assert_eq;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn empty_config_uses_defaults() {
    let config = JemConfig::load_from_str("").unwrap();
    assert_eq!(config, JemConfig::default());
    assert_eq!(config.analysis, AnalysisConfig::default());
    assert!(config.analysis.follow_invocations);
    assert_eq!(config.logging.level, "warn");
    assert!(config.logging.stderr);
}

#[test]
fn full_config_round_trips() {
    let text = r#"
        [cache]
        root = "/var/cache/jem"

        [analysis]
        thrown = false

        [logging]
        level = "jem.analysis=debug"
        json = true
        stderr = false
        file = "/tmp/jem.log"
    "#;
    let config = JemConfig::load_from_str(text).unwrap();

    assert_eq!(config.cache.root, Some(PathBuf::from("/var/cache/jem")));
    assert_eq!(
        config.analysis,
        AnalysisConfig {
            declared: true,
            thrown: false,
            follow_invocations: true,
        }
    );
    assert_eq!(
        config.logging,
        LoggingConfig {
            level: "jem.analysis=debug".to_string(),
            json: true,
            stderr: false,
            file: Some(PathBuf::from("/tmp/jem.log")),
        }
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = JemConfig::load_from_str("[analysis]\nfollow_calls = true\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");

    let err = JemConfig::load_from_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = JemConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err}");
}

#[test]
fn config_files_are_discovered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(discover_config_path(dir.path()), None);
    let (config, path) = load_for_dir(dir.path()).unwrap();
    assert_eq!(config, JemConfig::default());
    assert_eq!(path, None);

    std::fs::write(dir.path().join(".jem.toml"), "[analysis]\ndeclared = false\n").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(dir.path().join(".jem.toml"))
    );

    std::fs::write(dir.path().join("jem.toml"), "[analysis]\nthrown = false\n").unwrap();
    let (config, path) = load_for_dir(dir.path()).unwrap();
    assert_eq!(path, Some(dir.path().join("jem.toml")));
    assert!(!config.analysis.thrown);
    assert!(config.analysis.declared);
}

#[test]
fn cache_dir_env_overrides_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    let config = JemConfig::load_from_str("[cache]\nroot = \"/from/config\"\n").unwrap();

    std::env::remove_var(CACHE_DIR_ENV_VAR);
    assert_eq!(config.cache_root(), Some(PathBuf::from("/from/config")));
    assert_eq!(JemConfig::default().cache_root(), None);

    std::env::set_var(CACHE_DIR_ENV_VAR, "/from/env");
    assert_eq!(config.cache_root(), Some(PathBuf::from("/from/env")));
    std::env::remove_var(CACHE_DIR_ENV_VAR);
}
