use config::TrackerConfig;
use databases::Databases;
use modules::{
    system::events::ReadyHandler,
    voice::{handler::VoiceHandler, tracker::VoiceTracker, voice},
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use std::sync::Arc;
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod databases;
mod events;
mod modules;
mod utils;

use crate::events::EventManager;

#[derive(Clone, Debug)]
pub struct Data {
    pub tracker: Arc<VoiceTracker>,
    pub event_manager: Arc<EventManager>,
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "info,voicetime=debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.debug);
    info!("starting voicetime");

    let token = match config::discord_token() {
        Ok(token) => token,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            commands: vec![register(), voice()],
            pre_command: |ctx| {
                Box::pin(async move {
                    trace!(
                        "Command {} used by {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        ctx.guild_id()
                            .map_or_else(|| "DM".to_string(), |id| id.to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command {} completed for {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        ctx.guild_id()
                            .map_or_else(|| "DM".to_string(), |id| id.to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Command {} failed for {} in {}: {:?}",
                                ctx.command().qualified_name,
                                ctx.author().tag(),
                                ctx.guild_id()
                                    .map_or_else(|| "DM".to_string(), |id| id.to_string()),
                                error
                            );
                            if let Err(e) = ctx.say("❌ Something went wrong, try again later.").await {
                                error!("Failed to report command error: {}", e);
                            }
                        }
                        err => error!("Other framework error: {:?}", err),
                    }
                })
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("registering commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let dbs = Databases::open(&config).await?;
                let tracker = Arc::new(VoiceTracker::new(dbs.voice, config));
                let event_manager = Arc::new(EventManager::new());

                event_manager.add_handler(ReadyHandler).await;
                event_manager
                    .add_handler(VoiceHandler::new(tracker.clone()))
                    .await;

                Ok(Data {
                    tracker,
                    event_manager,
                })
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await;

    match client {
        Ok(mut client) => {
            if let Err(e) = client.start().await {
                error!("Client error: {}", e);
            }
        }
        Err(e) => error!("Failed to create client: {}", e),
    }
}
