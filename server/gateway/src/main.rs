mod config;
mod discord;
mod handler;

use anyhow::Result;
use clap::Parser;
use config::Config;
use serenity::all::{Client, GatewayIntents};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use vr_control::ResyncController;

use crate::discord::SerenityPlatform;
use crate::handler::Forwarder;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Config::parse().validate()?;
    info!(
        operator = %settings.resync.operator,
        pause_ms = settings.resync.pause.as_millis() as u64,
        cooldown_s = settings.resync.cooldown.as_secs_f64(),
        "starting"
    );

    // Voice-state updates are only delivered with the voice-states intent.
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let identity = Arc::new(OnceLock::new());
    let (tx, rx) = mpsc::channel(settings.queue_depth);

    let mut client = Client::builder(&settings.token, intents)
        .event_handler(Forwarder::new(tx, identity.clone()))
        .await?;

    let platform = Arc::new(SerenityPlatform::new(
        client.http.clone(),
        client.cache.clone(),
        identity,
    ));
    let controller = Arc::new(ResyncController::new(
        settings.resync,
        platform.clone(),
        platform,
    ));
    let events = tokio::spawn(controller.run(rx));

    let shards = client.shard_manager.clone();
    tokio::select! {
        r = client.start() => r?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown");
            shards.shutdown_all().await;
        }
    }

    events.abort();
    Ok(())
}
