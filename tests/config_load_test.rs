//! Configuration loading integration tests
//!
//! Exercises `Config::load` against real files on disk, including the
//! missing-file fallback and CLI overrides.

use jellycord::cli::Cli;
use jellycord::config::Config;

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("jellycord.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[test]
fn load_reads_yaml_file() {
    let (_dir, path) = temp_config_file(
        r#"
media_server:
  type: jellyfin
  url: http://media.local:8096
  api_key: secret
discord:
  bot_token: token
  server_id: "42"
"#,
    );

    let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();
    assert_eq!(config.media_server.kind, "jellyfin");
    assert_eq!(config.discord.server_id, "42");
    assert!(config.validate().is_ok());
}

#[test]
fn load_falls_back_to_defaults_when_file_missing() {
    let config = Config::load("/nonexistent/jellycord.yaml", &Cli::default()).unwrap();
    assert_eq!(config.media_server.kind, "emby");
    // Defaults are not startup-ready: secrets are empty.
    assert!(config.validate().is_err());
}

#[test]
fn cli_override_wins_over_file() {
    let (_dir, path) = temp_config_file(
        r#"
media_server:
  type: emby
  url: http://media.local:8096
  api_key: secret
discord:
  bot_token: token
  server_id: "42"
"#,
    );

    let cli = Cli {
        media_server: Some("jellyfin".to_string()),
        ..Cli::default()
    };
    let config = Config::load(path.to_str().unwrap(), &cli).unwrap();
    assert_eq!(config.media_server.kind, "jellyfin");
}

#[test]
fn invalid_yaml_is_a_config_error() {
    let (_dir, path) = temp_config_file("media_server: [not, a, mapping]");
    let result = Config::load(path.to_str().unwrap(), &Cli::default());
    assert!(result.is_err());
}
