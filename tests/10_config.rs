use std::io::Write;

use innoserver::config::{AppConfig, ConfigError};

#[test]
fn config_file_is_layered_over_the_preset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "server": {{ "request_timeout_secs": 7 }},
            "security": {{ "jwt_secret": "from-file" }},
            "media": {{ "max_video_size": 1024, "video_path": "/media/videos/" }}
        }}"#
    )
    .unwrap();

    let config = AppConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.server.request_timeout_secs, 7);
    assert_eq!(config.media.max_video_size, 1024);
    assert_eq!(config.media.video_path, "/media/videos/");
    // Untouched sections keep their preset values
    assert_eq!(config.security.jwt_expiry_hours, 5);
    assert!(!config.cors.allow_methods.is_empty());
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");

    let err = AppConfig::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn broken_json_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    let err = AppConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
