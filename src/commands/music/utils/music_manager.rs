use lavalink_rs::{error::LavalinkError, model::events, prelude::*};
use poise::serenity_prelude as serenity;
use serenity::{ChannelId, Context, GuildId, Http, UserId};
use songbird::Songbird;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, Icons, MusicCardSettings};

use super::event_handlers;
use super::spotify_api::SpotifyApi;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Failed to leave voice channel: {0}")]
    LeaveError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Track ID not found for song: {0}")]
    TrackNotFound(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Failed to render music card: {0}")]
    CardError(String),

    #[error("Lavalink error: {0}")]
    Lavalink(#[from] LavalinkError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Data attached to the Lavalink client, shared by every event hook
pub struct MusicContext {
    pub http: Arc<Http>,
    pub songbird: Arc<Songbird>,
    pub spotify: SpotifyApi,
    pub card: MusicCardSettings,
    pub icons: Icons,
    pub support_url: String,
    /// `host:port` of the configured node
    pub node_label: String,
}

impl MusicContext {
    pub fn new(config: &Config, http: Arc<Http>, songbird: Arc<Songbird>) -> Self {
        Self {
            http,
            songbird,
            spotify: SpotifyApi::from_config(config),
            card: config.music_card.clone(),
            icons: config.icons.clone(),
            support_url: config.support_url.clone(),
            node_label: config.lavalink.address(),
        }
    }
}

/// Data attached to each guild's player
#[derive(Debug)]
pub struct PlayerData {
    /// Channel the player was started from; notices are sent here
    pub text_channel: ChannelId,
    /// Tracks waiting behind the current one, as of the last start or enqueue
    queued: AtomicUsize,
}

impl PlayerData {
    pub fn new(text_channel: ChannelId) -> Self {
        Self {
            text_channel,
            queued: AtomicUsize::new(0),
        }
    }

    pub fn set_queued(&self, count: usize) {
        self.queued.store(count, Ordering::SeqCst);
    }

    /// Account for a finished track, returning how many were waiting behind it
    pub fn take_queued(&self) -> usize {
        self.queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_else(|n| n)
    }
}

/// Did the track end on its own, leaving the player free to move on?
pub fn ended_naturally(reason: &events::TrackEndReason) -> bool {
    matches!(
        reason,
        events::TrackEndReason::Finished | events::TrackEndReason::LoadFailed
    )
}

/// The queue has run dry when nothing was waiting behind the finished track
/// and nothing has been queued since.
///
/// `waiting` comes from [`PlayerData::take_queued`], which is recorded before
/// the client pops its next track, so a pop in flight never reads as empty.
pub fn queue_exhausted(waiting: usize, remaining: usize) -> bool {
    waiting == 0 && remaining == 0
}

/// Thin facade over the voice manager and the Lavalink client
pub struct MusicManager;

impl MusicManager {
    /// Build the Lavalink client when the music system is enabled.
    ///
    /// Must be called once the gateway is ready, since the node handshake
    /// needs the bot's user id.
    pub async fn build_lavalink(
        config: &Config,
        user_id: UserId,
        http: Arc<Http>,
        songbird: Arc<Songbird>,
    ) -> Option<LavalinkClient> {
        if !config.excess_commands.lavalink {
            warn!("[ MUSIC 2 ] Lavalink Music System Disabled");
            return None;
        }

        let hooks = events::Events {
            raw: Some(event_handlers::raw_event),
            ready: Some(event_handlers::node_connected),
            websocket_closed: Some(event_handlers::node_error),
            track_start: Some(event_handlers::track_start),
            track_end: Some(event_handlers::track_end),
            ..Default::default()
        };

        let node = NodeBuilder {
            hostname: config.lavalink.address(),
            is_ssl: config.lavalink.secure,
            events: events::Events::default(),
            password: config.lavalink.password.clone(),
            user_id: user_id.into(),
            session_id: None,
        };

        let shared = MusicContext::new(config, http, songbird);

        let client = LavalinkClient::new_with_data(
            hooks,
            vec![node],
            NodeDistributionStrategy::round_robin(),
            Arc::new(shared),
        )
        .await;

        info!("[ MUSIC 2 ] Lavalink Music System Active");
        Some(client)
    }

    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
        songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }

    /// Drop the guild's player on the node and leave the voice channel
    pub async fn destroy_player(
        lavalink: &LavalinkClient,
        songbird: &Songbird,
        guild_id: GuildId,
    ) -> MusicResult<()> {
        lavalink.delete_player(guild_id).await?;

        if songbird.get(guild_id).is_some() {
            songbird
                .remove(guild_id)
                .await
                .map_err(|e| MusicError::LeaveError(e.to_string()))?;
        }

        info!("Destroyed player for guild {}", guild_id);
        Ok(())
    }
}
