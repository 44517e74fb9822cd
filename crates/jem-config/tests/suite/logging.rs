use jem_config::{init_tracing, LoggingConfig};

#[test]
fn file_sink_receives_events_and_reinit_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("jem.log");
    let config = LoggingConfig {
        level: "info".to_string(),
        json: true,
        stderr: false,
        file: Some(log.clone()),
    };

    init_tracing(&config);
    init_tracing(&LoggingConfig::default());
    tracing::warn!(target: "jem.config", marker = "file-sink-check", "logging works");

    let written = std::fs::read_to_string(&log).unwrap();
    let line = written
        .lines()
        .find(|line| line.contains("file-sink-check"))
        .expect("event written to the log file");
    assert!(line.trim_start().starts_with('{'), "{line}");
}

#[test]
fn env_filter_accepts_directive_strings() {
    let config = LoggingConfig {
        level: "jem.cache=debug,warn".to_string(),
        ..LoggingConfig::default()
    };
    let rendered = config.env_filter().to_string();
    assert!(rendered.contains("jem.cache=debug"), "{rendered}");
}
