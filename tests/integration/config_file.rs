use lavacard::config::{Config, ConfigError};
use pretty_assertions::assert_eq;
use std::time::Duration;

use crate::common::fixtures_path;
use crate::test_utils;

fn fixture_config() -> Config {
    Config::from_file(fixtures_path().join("config.json")).unwrap()
}

#[test]
fn test_fixture_config_is_valid() {
    test_utils::init();
    let config = fixture_config();

    assert!(config.validate().is_ok());
    assert!(config.excess_commands.lavalink);
    assert_eq!(config.lavalink.address(), "lavalink.internal:2333");
    assert_eq!(config.spotify.timeout, Duration::from_secs(3));
    assert_eq!(config.music_card.background_images.len(), 2);
    assert_eq!(config.icons.beats_icon, "https://cdn.example.com/icons/beats.gif");
}

#[test]
fn test_environment_wins_over_file() {
    let mut config = fixture_config();
    config
        .apply_env_overrides(|key| match key {
            "LAVALINK_ENABLED" => Some("false".to_string()),
            "LAVALINK_HOST" => Some("10.0.0.5".to_string()),
            "SPOTIFY_CLIENT_ID" => Some("from-env".to_string()),
            _ => None,
        })
        .unwrap();

    assert!(!config.excess_commands.lavalink);
    assert_eq!(config.lavalink.address(), "10.0.0.5:2333");
    assert_eq!(config.spotify_client_id, "from-env");
    assert_eq!(config.spotify_client_secret, "fixture-secret");
}

#[test]
fn test_malformed_file_is_a_json_error() {
    let dir = std::env::temp_dir().join(format!("lavacard-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, "{ \"excessCommands\": ").unwrap();

    let result = Config::from_file(&path);
    std::fs::remove_dir_all(&dir).ok();

    assert!(matches!(result, Err(ConfigError::Json(_))));
}
