use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{
    CreateAttachment, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage,
};

use crate::config::Icons;

use super::{music_card::CARD_FILE_NAME, music_manager::MusicError};

const FOOTER_TEXT: &str = "Lavalink Player";

/// Author line with optional icon and link
fn author(name: &str, icon_url: &str, support_url: &str) -> CreateEmbedAuthor {
    let mut author = CreateEmbedAuthor::new(name);
    if !icon_url.is_empty() {
        author = author.icon_url(icon_url);
    }
    if !support_url.is_empty() {
        author = author.url(support_url);
    }
    author
}

fn footer(icons: &Icons) -> CreateEmbedFooter {
    let footer = CreateEmbedFooter::new(FOOTER_TEXT);
    if icons.footer_icon.is_empty() {
        footer
    } else {
        footer.icon_url(&icons.footer_icon)
    }
}

/// Create an embed for when a song starts playing. The image points at the
/// card attachment.
pub fn now_playing(title: &str, track_author: &str, icons: &Icons, support_url: &str) -> CreateEmbed {
    CreateEmbed::new()
        .author(author("Now playing", &icons.player_icon, support_url))
        .description(format!(
            "- Song name :**{}**\n- Author :**{}**",
            title, track_author
        ))
        .image(format!("attachment://{}", CARD_FILE_NAME))
        .footer(footer(icons))
        .color(0xFF00FF)
}

/// The now playing embed together with the rendered card
pub fn now_playing_message(
    title: &str,
    track_author: &str,
    icons: &Icons,
    support_url: &str,
    card_png: Vec<u8>,
) -> CreateMessage {
    CreateMessage::new()
        .embed(now_playing(title, track_author, icons, support_url))
        .add_file(CreateAttachment::bytes(card_png, CARD_FILE_NAME))
}

/// Create an embed for when the queue has run out
pub fn queue_empty(icons: &Icons, support_url: &str) -> CreateEmbed {
    CreateEmbed::new()
        .author(author("Queue is Empty", &icons.beats_icon, support_url))
        .description("**Leaving voice channel!**")
        .footer(footer(icons))
        .color(0xFFFF00)
}

/// Create an embed for when tracks are added to the queue
pub fn added_to_queue(title: &str, count: usize) -> CreateReply {
    let description = if count > 1 {
        format!("Queued **{}** and {} more", title, count - 1)
    } else {
        format!("Queued **{}**", title)
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🎵 Added to Queue")
            .description(description)
            .color(0x00ff00),
    )
}

/// Create an embed for when a query matched nothing
pub fn nothing_found(query: &str) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(format!("Nothing found for `{}`", query))
            .color(0xff0000),
    )
}

/// Create an embed for when the music system is switched off
pub fn music_disabled() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description("The Lavalink music system is disabled")
                .color(0xff0000),
        )
        .ephemeral(true)
}

/// Create an embed for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel(err: MusicError) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(format!("You need to be in a voice channel: {}", err))
                .color(0xff0000),
        )
        .ephemeral(true)
}

/// Create an embed for when the bot fails to join a voice channel
pub fn failed_to_join_voice_channel(err: MusicError) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(format!("Failed to join voice channel: {}", err))
            .color(0xff0000),
    )
}

/// Create an embed for when the bot leaves a voice channel
pub fn left_voice_channel() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("👋 Left Voice Channel")
            .description("Successfully disconnected and cleared the queue")
            .color(0x00ff00),
    )
}

/// Create an embed for when the bot fails to leave a voice channel
pub fn failed_to_leave_voice_channel(err: MusicError) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(format!("Failed to leave voice channel: {}", err))
            .color(0xff0000),
    )
}
