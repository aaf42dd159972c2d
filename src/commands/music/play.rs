use super::*;
use crate::commands::music::utils::{
    embedded_messages,
    music_manager::{MusicError, MusicManager, PlayerData},
};
use lavalink_rs::{model::track::TrackLoadData, player_context::TrackInQueue};
use std::sync::Arc;
use tracing::{debug, info};

/// Turn free text into a Lavalink search, leave URLs as they are
pub(crate) fn to_identifier(query: &str) -> String {
    let query = query.trim();
    if query.starts_with("http://") || query.starts_with("https://") {
        query.to_string()
    } else {
        format!("ytsearch:{}", query)
    }
}

/// Play a song from a URL or a search query
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;

    let Some(lavalink) = ctx.data().lavalink.clone() else {
        ctx.send(embedded_messages::music_disabled()).await?;
        return Ok(());
    };

    // A fresh player needs the caller's voice channel
    let join_channel = if lavalink.get_player_context(guild_id).is_none() {
        match MusicManager::get_user_voice_channel(
            ctx.serenity_context(),
            guild_id,
            ctx.author().id,
        ) {
            Ok(channel_id) => Some(channel_id),
            Err(err) => {
                ctx.send(embedded_messages::user_not_in_voice_channel(err))
                    .await?;
                return Ok(());
            }
        }
    } else {
        None
    };

    // The voice handshake can outlast the interaction window
    ctx.defer().await?;

    // Join the caller's channel and bind the player to this text channel
    if let Some(channel_id) = join_channel {
        let songbird = MusicManager::get_songbird(ctx.serenity_context()).await?;
        let connection_info = match songbird.join_gateway(guild_id, channel_id).await {
            Ok((connection_info, _)) => connection_info,
            Err(err) => {
                ctx.send(embedded_messages::failed_to_join_voice_channel(
                    MusicError::JoinError(err.to_string()),
                ))
                .await?;
                return Ok(());
            }
        };

        lavalink
            .create_player_context_with_data::<PlayerData>(
                guild_id,
                connection_info,
                Arc::new(PlayerData::new(ctx.channel_id())),
            )
            .await?;
        debug!("Created player for guild {} in {}", guild_id, channel_id);
    }

    let identifier = to_identifier(&query);
    let loaded = lavalink.load_tracks(guild_id, &identifier).await?;

    let tracks: Vec<TrackInQueue> = match loaded.data {
        Some(TrackLoadData::Track(track)) => vec![track.into()],
        Some(TrackLoadData::Search(results)) => {
            results.into_iter().take(1).map(Into::into).collect()
        }
        Some(TrackLoadData::Playlist(playlist)) => {
            playlist.tracks.into_iter().map(Into::into).collect()
        }
        _ => Vec::new(),
    };

    let Some(first) = tracks.first() else {
        ctx.send(embedded_messages::nothing_found(&query)).await?;
        return Ok(());
    };
    let title = first.track.info.title.clone();
    let count = tracks.len();

    let Some(player) = lavalink.get_player_context(guild_id) else {
        return Err(MusicError::NotConnected.into());
    };
    let queue = player.get_queue();
    queue.append(tracks.into())?;
    player.data::<PlayerData>()?.set_queued(queue.get_count().await?);

    // Kick off playback when the player is idle
    if let Ok(state) = player.get_player().await {
        if state.track.is_none() && queue.get_track(0).await.is_ok_and(|t| t.is_some()) {
            player.skip()?;
        }
    }

    ctx.send(embedded_messages::added_to_queue(&title, count))
        .await?;
    Ok(())
}
