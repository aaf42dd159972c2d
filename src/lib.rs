//! Lavalink-backed music playback for a Discord bot, with Spotify-powered
//! "now playing" cards.

use std::sync::LazyLock;
use std::time::Duration;

pub mod commands;
pub mod config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// Shared HTTP client for every outbound request (Spotify, card images)
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("lavacard/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});

/// User data, stored and accessible in all command invocations
pub struct Data {
    /// `None` when the Lavalink music system is disabled in the configuration
    #[cfg(feature = "music")]
    pub lavalink: Option<lavalink_rs::client::LavalinkClient>,
}
