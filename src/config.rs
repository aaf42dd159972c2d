//! Bot configuration: a JSON file with environment overrides.
//! Secrets are usually supplied through `.env` rather than the file.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Errors that can occur while loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to parse configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing Discord token (set DISCORD_TOKEN)")]
    MissingToken,

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub discord_token: String,
    pub excess_commands: ExcessCommands,
    pub lavalink: LavalinkNode,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify: SpotifySettings,
    pub music_card: MusicCardSettings,
    pub icons: Icons,
    pub support_url: String,
}

/// Optional subsystems that can be switched off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExcessCommands {
    pub lavalink: bool,
}

/// Connection details of the single Lavalink node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LavalinkNode {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub secure: bool,
}

impl Default for LavalinkNode {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2333,
            password: "youshallnotpass".to_string(),
            secure: false,
        }
    }
}

impl LavalinkNode {
    /// `host:port`, used to identify the node in logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Spotify endpoints and request timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpotifySettings {
    pub accounts_url: String,
    pub api_url: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Look of the generated "now playing" card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicCardSettings {
    pub background_images: Vec<String>,
    pub author_color: String,
    pub progress_color: String,
    pub progress_bar_color: String,
    /// Percentage the background is darkened by
    pub image_darkness: u8,
    /// Percentage of the progress bar that is filled
    pub progress: u8,
}

impl Default for MusicCardSettings {
    fn default() -> Self {
        Self {
            background_images: Vec::new(),
            author_color: "#FF7A00".to_string(),
            progress_color: "#FF7A00".to_string(),
            progress_bar_color: "#5F2D00".to_string(),
            image_darkness: 60,
            progress: 50,
        }
    }
}

/// Icons shown in embed authors and footers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Icons {
    pub player_icon: String,
    pub footer_icon: String,
    pub beats_icon: String,
}

impl Config {
    /// Load the configuration from `LAVACARD_CONFIG` (or `config.json`),
    /// apply environment overrides and validate the result.
    pub fn load() -> ConfigResult<Self> {
        let path = env::var("LAVACARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overwrite fields from the environment. `lookup` is `std::env::var`
    /// in production and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord_token = token;
        }
        if let Some(id) = lookup("SPOTIFY_CLIENT_ID") {
            self.spotify_client_id = id;
        }
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET") {
            self.spotify_client_secret = secret;
        }
        if let Some(host) = lookup("LAVALINK_HOST") {
            self.lavalink.host = host;
        }
        if let Some(port) = lookup("LAVALINK_PORT") {
            self.lavalink.port = port.parse().map_err(|_| ConfigError::Invalid {
                field: "LAVALINK_PORT",
                reason: format!("`{}` is not a port number", port),
            })?;
        }
        if let Some(password) = lookup("LAVALINK_PASSWORD") {
            self.lavalink.password = password;
        }
        if let Some(secure) = lookup("LAVALINK_SECURE") {
            self.lavalink.secure = parse_flag("LAVALINK_SECURE", &secure)?;
        }
        if let Some(enabled) = lookup("LAVALINK_ENABLED") {
            self.excess_commands.lavalink = parse_flag("LAVALINK_ENABLED", &enabled)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.discord_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        if self.excess_commands.lavalink && self.lavalink.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "lavalink.host",
                reason: "must not be empty when the music system is enabled".to_string(),
            });
        }

        let urls = [
            ("icons.playerIcon", &self.icons.player_icon),
            ("icons.footerIcon", &self.icons.footer_icon),
            ("icons.beatsIcon", &self.icons.beats_icon),
            ("supportUrl", &self.support_url),
        ];
        for (field, value) in urls {
            if !value.is_empty() {
                Url::parse(value).map_err(|e| ConfigError::Invalid {
                    field,
                    reason: e.to_string(),
                })?;
            }
        }

        let card = &self.music_card;
        let colors = [
            ("musicCard.authorColor", &card.author_color),
            ("musicCard.progressColor", &card.progress_color),
            ("musicCard.progressBarColor", &card.progress_bar_color),
        ];
        for (field, value) in colors {
            parse_hex_color(value).ok_or_else(|| ConfigError::Invalid {
                field,
                reason: format!("`{}` is not a #RRGGBB color", value),
            })?;
        }

        if card.image_darkness > 100 {
            return Err(ConfigError::Invalid {
                field: "musicCard.imageDarkness",
                reason: "must be a percentage".to_string(),
            });
        }
        if card.progress > 100 {
            return Err(ConfigError::Invalid {
                field: "musicCard.progress",
                reason: "must be a percentage".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("`{}` is not a boolean", value),
        }),
    }
}

/// Parse a `#RRGGBB` color into its components.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let config = Config::from_json("{}").unwrap();

        assert!(!config.excess_commands.lavalink);
        assert_eq!(config.lavalink.address(), "127.0.0.1:2333");
        assert_eq!(config.spotify.timeout, Duration::from_secs(5));
        assert_eq!(config.music_card.image_darkness, 60);
        assert_eq!(config.music_card.progress, 50);
        assert_eq!(config.music_card.author_color, "#FF7A00");
    }

    #[test]
    fn test_parses_camel_case_file() {
        let raw = r##"{
            "discordToken": "abc",
            "excessCommands": { "lavalink": true },
            "lavalink": { "host": "lava.local", "port": 443, "password": "pw", "secure": true },
            "spotifyClientId": "id",
            "spotifyClientSecret": "secret",
            "spotify": { "timeout": "2s 500ms" },
            "musicCard": { "backgroundImages": ["https://img.example/bg.png"], "progress": 75 },
            "supportUrl": "https://discord.gg/example"
        }"##;

        let config = Config::from_json(raw).unwrap();

        assert!(config.excess_commands.lavalink);
        assert_eq!(config.lavalink.host, "lava.local");
        assert_eq!(config.lavalink.port, 443);
        assert!(config.lavalink.secure);
        assert_eq!(config.spotify_client_id, "id");
        assert_eq!(config.spotify.timeout, Duration::from_millis(2500));
        assert_eq!(config.spotify.api_url, "https://api.spotify.com");
        assert_eq!(config.music_card.background_images.len(), 1);
        assert_eq!(config.music_card.progress, 75);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_json(r#"{ "discordToken": "file" }"#).unwrap();
        config
            .apply_env_overrides(env_from(&[
                ("DISCORD_TOKEN", "env"),
                ("LAVALINK_PORT", "2444"),
                ("LAVALINK_ENABLED", "yes"),
                ("SPOTIFY_CLIENT_SECRET", "s3cret"),
            ]))
            .unwrap();

        assert_eq!(config.discord_token, "env");
        assert_eq!(config.lavalink.port, 2444);
        assert!(config.excess_commands.lavalink);
        assert_eq!(config.spotify_client_secret, "s3cret");
    }

    #[test]
    fn test_env_override_rejects_bad_port() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(env_from(&[("LAVALINK_PORT", "lots")]));

        assert_matches!(
            result,
            Err(ConfigError::Invalid {
                field: "LAVALINK_PORT",
                ..
            })
        );
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let config = Config::default();
        assert_matches!(config.validate(), Err(ConfigError::MissingToken));
    }

    #[test]
    fn test_empty_host_rejected_only_when_enabled() {
        let mut config = Config {
            discord_token: "token".to_string(),
            ..Default::default()
        };
        config.lavalink.host = String::new();
        assert!(config.validate().is_ok());

        config.excess_commands.lavalink = true;
        assert_matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "lavalink.host",
                ..
            })
        );
    }

    #[test]
    fn test_invalid_icon_url_is_rejected() {
        let mut config = Config {
            discord_token: "token".to_string(),
            ..Default::default()
        };
        config.icons.footer_icon = "not a url".to_string();

        assert_matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "icons.footerIcon",
                ..
            })
        );
    }

    #[test]
    fn test_out_of_range_darkness_is_rejected() {
        let mut config = Config {
            discord_token: "token".to_string(),
            ..Default::default()
        };
        config.music_card.image_darkness = 101;

        assert_matches!(config.validate(), Err(ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::from_file("/definitely/not/here/config.json").unwrap();
        assert_eq!(config.lavalink.port, 2333);
    }

    // Kept apart from the `pretty_assertions::assert_eq` import: test_case's
    // generated modules glob-import the parent scope, making `assert_eq` ambiguous.
    mod parse_cases {
        use super::super::{parse_flag, parse_hex_color};
        use test_case::test_case;

        #[test_case("#FF7A00" => Some([0xFF, 0x7A, 0x00]); "orange")]
        #[test_case("#5f2d00" => Some([0x5F, 0x2D, 0x00]); "lowercase")]
        #[test_case("FF7A00" => None; "missing hash")]
        #[test_case("#FFF" => None; "short form")]
        #[test_case("#GG0000" => None; "not hex")]
        #[test_case("#+F+F+F" => None; "signed digits")]
        fn test_parse_hex_color(input: &str) -> Option<[u8; 3]> {
            parse_hex_color(input)
        }

        #[test_case("true" => true)]
        #[test_case("ON" => true)]
        #[test_case("0" => false)]
        #[test_case("no" => false)]
        fn test_parse_flag(input: &str) -> bool {
            parse_flag("FLAG", input).unwrap()
        }
    }
}
