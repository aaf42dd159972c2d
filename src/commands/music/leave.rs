use super::*;
use crate::commands::music::utils::{
    embedded_messages,
    music_manager::{MusicError, MusicManager},
};

/// Stop playback and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(MusicError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;

    let Some(lavalink) = ctx.data().lavalink.clone() else {
        ctx.send(embedded_messages::music_disabled()).await?;
        return Ok(());
    };

    if lavalink.get_player_context(guild_id).is_none() {
        ctx.send(embedded_messages::failed_to_leave_voice_channel(
            MusicError::NotConnected,
        ))
        .await?;
        return Ok(());
    }

    let songbird = MusicManager::get_songbird(ctx.serenity_context()).await?;
    match MusicManager::destroy_player(&lavalink, &songbird, guild_id).await {
        Ok(()) => {
            ctx.send(embedded_messages::left_voice_channel()).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::failed_to_leave_voice_channel(err))
                .await?;
        }
    }

    Ok(())
}
