//! Lavalink event hooks: node lifecycle logging, the "now playing" card on
//! track start, and cleanup once the queue runs dry.

use lavalink_rs::{hook, model::events, prelude::*};
use poise::serenity_prelude as serenity;
use serenity::all::{ChannelId, CreateMessage, GuildId};
use tracing::{debug, error, info, warn};

use super::{
    embedded_messages,
    music_card::{self, CardStyle},
    music_manager::{
        MusicContext, MusicError, MusicManager, MusicResult, PlayerData, ended_naturally,
        queue_exhausted,
    },
};

/// Node errors containing this are noise from the handshake and are dropped
pub const IGNORED_NODE_ERROR: &str = "Unexpected op \"ready\"";

pub fn node_connected_line(identifier: &str) -> String {
    format!("[ LAVALINK CONNECTION ] Node connected: {}", identifier)
}

/// `None` when the error should not be reported
pub fn node_error_line(identifier: &str, message: &str) -> Option<String> {
    if message.contains(IGNORED_NODE_ERROR) {
        return None;
    }
    Some(format!(
        "[ERROR] Node {} had an error: {}",
        identifier, message
    ))
}

fn node_identifier(client: &LavalinkClient, session_id: &str) -> String {
    match client.data::<MusicContext>() {
        Ok(shared) => format!("{} ({})", shared.node_label, session_id),
        Err(_) => session_id.to_string(),
    }
}

#[hook]
pub async fn raw_event(_: LavalinkClient, session_id: String, event: &serde_json::Value) {
    if event["op"].as_str() == Some("event") || event["op"].as_str() == Some("playerUpdate") {
        debug!("{:?} -> {:?}", session_id, event);
    }
}

#[hook]
pub async fn node_connected(client: LavalinkClient, session_id: String, event: &events::Ready) {
    info!("{}", node_connected_line(&node_identifier(&client, &session_id)));

    // Players from a previous session are gone on a fresh one
    if !event.resumed {
        if let Err(e) = client.delete_all_player_contexts().await {
            warn!("Failed to clear stale players: {}", e);
        }
    }
}

#[hook]
pub async fn node_error(
    client: LavalinkClient,
    session_id: String,
    event: &events::WebSocketClosed,
) {
    let message = format!("{} (code {})", event.reason, event.code);
    if let Some(line) = node_error_line(&node_identifier(&client, &session_id), &message) {
        error!("{}", line);
    }
}

#[hook]
pub async fn track_start(client: LavalinkClient, _session_id: String, event: &events::TrackStart) {
    if let Err(e) = record_queue_depth(&client, event.guild_id).await {
        warn!("Failed to read queue depth: {}", e);
    }
    if let Err(e) = send_music_card(&client, event).await {
        error!("Error creating or sending music card: {}", e);
    }
}

#[hook]
pub async fn track_end(client: LavalinkClient, _session_id: String, event: &events::TrackEnd) {
    if let Err(e) = handle_track_end(&client, event).await {
        error!("Error handling end of queue: {}", e);
    }
}

/// The client pops a track before starting it, so the count now is exactly
/// what waits behind the new track
async fn record_queue_depth(
    client: &LavalinkClient,
    guild_id: lavalink_rs::model::GuildId,
) -> MusicResult<()> {
    let Some(player) = client.get_player_context(guild_id) else {
        return Ok(());
    };
    let count = player.get_queue().get_count().await?;
    player.data::<PlayerData>()?.set_queued(count);
    Ok(())
}

async fn send_music_card(client: &LavalinkClient, event: &events::TrackStart) -> MusicResult<()> {
    let shared = client.data::<MusicContext>()?;
    let player = client
        .get_player_context(event.guild_id)
        .ok_or(MusicError::NotConnected)?;
    let player_data = player.data::<PlayerData>()?;

    let track = &event.track.info;
    info!("Track started: {} by {}", track.title, track.author);

    let thumbnail_url = shared.spotify.now_playing_thumbnail(&track.title).await?;

    let timeout = shared.spotify.timeout();
    let thumbnail = music_card::fetch_image(&thumbnail_url, timeout).await;
    let background = match music_card::pick_background(&shared.card.background_images) {
        Some(url) => music_card::fetch_image(url, timeout).await,
        None => None,
    };

    let png =
        music_card::render_off_runtime(CardStyle::from_settings(&shared.card), thumbnail, background)
            .await?;

    let message = embedded_messages::now_playing_message(
        &track.title,
        &track.author,
        &shared.icons,
        &shared.support_url,
        png,
    );
    player_data
        .text_channel
        .send_message(&shared.http, message)
        .await?;

    Ok(())
}

async fn handle_track_end(client: &LavalinkClient, event: &events::TrackEnd) -> MusicResult<()> {
    if !ended_naturally(&event.reason) {
        return Ok(());
    }

    let Some(player) = client.get_player_context(event.guild_id) else {
        debug!("Track ended without a player, nothing to clean up");
        return Ok(());
    };

    // Read before any await so the next track's start cannot overwrite it
    let player_data = player.data::<PlayerData>()?;
    let waiting = player_data.take_queued();
    let remaining = player.get_queue().get_count().await?;

    let shared = client.data::<MusicContext>()?;
    let end = GuildQueueEnd {
        client,
        shared: &shared,
        text_channel: player_data.text_channel,
        guild_id: GuildId::new(event.guild_id.0),
    };
    end_if_exhausted(waiting, remaining, &end).await?;
    Ok(())
}

/// What happens to a guild once its queue runs dry
pub(crate) trait QueueEnd {
    async fn send_notice(&self) -> MusicResult<()>;
    async fn leave(&self) -> MusicResult<()>;
}

/// Send the queue-empty notice and leave when nothing is left to play.
/// A failed notice still leaves. Returns whether the queue had ended.
pub(crate) async fn end_if_exhausted(
    waiting: usize,
    remaining: usize,
    end: &impl QueueEnd,
) -> MusicResult<bool> {
    if !queue_exhausted(waiting, remaining) {
        return Ok(false);
    }

    if let Err(e) = end.send_notice().await {
        warn!("Failed to send queue end notice: {}", e);
    }
    end.leave().await?;
    Ok(true)
}

struct GuildQueueEnd<'a> {
    client: &'a LavalinkClient,
    shared: &'a MusicContext,
    text_channel: ChannelId,
    guild_id: GuildId,
}

impl QueueEnd for GuildQueueEnd<'_> {
    async fn send_notice(&self) -> MusicResult<()> {
        info!("Queue ended for guild {}", self.guild_id);
        let notice = CreateMessage::new().embed(embedded_messages::queue_empty(
            &self.shared.icons,
            &self.shared.support_url,
        ));
        self.text_channel
            .send_message(&self.shared.http, notice)
            .await?;
        Ok(())
    }

    async fn leave(&self) -> MusicResult<()> {
        MusicManager::destroy_player(self.client, &self.shared.songbird, self.guild_id).await
    }
}
