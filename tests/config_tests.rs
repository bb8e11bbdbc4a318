use std::io::Write;

use hostwatch::config::Config;
use hostwatch::error::{ConfigError, Error};

fn write_temp_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn config_loads_from_file() {
    let file = write_temp_config(
        r#"
[monitor]
service_name = "gateway"
gc_interval_secs = 120

[server]
bind = "127.0.0.1:0"
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.monitor.service_name, "gateway");
    assert_eq!(config.monitor.gc_interval_secs, 120);
    assert_eq!(config.server.sweep_interval_secs, 30);
}

#[test]
fn config_rejects_zero_sweep_interval() {
    let file = write_temp_config("[server]\nsweep_interval_secs = 0\n");

    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "sweep_interval_secs",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid sweep interval error, got {err}"),
        Ok(config) => panic!(
            "Expected zero sweep interval to be rejected, got {}",
            config.server.sweep_interval_secs
        ),
    }
}

#[test]
fn config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load(&path),
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}

#[test]
fn config_rejects_wrong_types() {
    let file = write_temp_config("[monitor]\ngc_interval_secs = \"soon\"\n");
    let result = Config::load(file.path());

    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn config_rejects_report_interval_too_far_out() {
    let file = write_temp_config("[server]\nreport_interval_secs = 9223372036854775807\n");

    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "report_interval_secs",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid report interval error, got {err}"),
        Ok(config) => panic!(
            "Expected oversized report interval to be rejected, got {}",
            config.server.report_interval_secs
        ),
    }
}

#[test]
fn config_rejects_request_timeout_over_an_hour() {
    let file = write_temp_config("[server]\nrequest_timeout_ms = 3600001\n");

    assert!(matches!(
        Config::load(file.path()),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "request_timeout_ms",
            ..
        }))
    ));
}
