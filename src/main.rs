use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lavacard::config::Config;
use lavacard::{CommandResult, Context, Data, Error};

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lavacard=debug,lavalink_rs=info,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Arc::new(Config::load()?);

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    #[allow(unused_mut)]
    let mut commands = vec![register(), help()];

    // Handle Music feature
    #[cfg(feature = "music")]
    {
        use lavacard::commands::music::{leave::*, play::*};

        commands.extend(vec![play(), leave()]);
    }

    let setup_config = Arc::clone(&config);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} is connected!", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                build_data(ctx, ready, &setup_config).await
            })
        });

    let client_builder =
        ClientBuilder::new(&config.discord_token, intents).framework(framework.build());

    // Create and run client
    build_and_start_client(client_builder).await
}

/// Runs once the gateway is ready, so the bot's user id is known
#[cfg(feature = "music")]
async fn build_data(
    ctx: &serenity::Context,
    ready: &serenity::Ready,
    config: &Config,
) -> Result<Data, Error> {
    use lavacard::commands::music::utils::music_manager::MusicManager;

    let songbird = MusicManager::get_songbird(ctx).await?;
    let lavalink =
        MusicManager::build_lavalink(config, ready.user.id, ctx.http.clone(), songbird).await;

    Ok(Data { lavalink })
}

#[cfg(not(feature = "music"))]
async fn build_data(
    _ctx: &serenity::Context,
    _ready: &serenity::Ready,
    _config: &Config,
) -> Result<Data, Error> {
    Ok(Data {})
}

async fn build_and_start_client(client_builder: ClientBuilder) -> Result<(), Error> {
    #[cfg(feature = "music")]
    {
        use songbird::SerenityInit;

        let mut client = client_builder.register_songbird().await?;
        client.start().await.map_err(Into::into)
    }

    #[cfg(not(feature = "music"))]
    {
        let mut client = client_builder.await?;
        client.start().await.map_err(Into::into)
    }
}
