//! Runnable farm agent: wires the socket session, the persisted profile and
//! the scheduler engine together, then farms until interrupted.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use common::logger::init_logger;
use game::services::GameContext;
use game::socket::SocketClient;
use game::travel::ArmyTravelCalculator;
use scheduler::{Engine, Settings};
use session::Profile;
use session::store::sqlite_store::SqliteStateStore;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("farmbot");

    let cli = Cli::parse();

    let store = Arc::new(SqliteStateStore::new(&cli.database_url).await?);
    let profile = Profile::new(store, cli.character_id);

    // The last-used settings win over command-line defaults.
    let settings = profile
        .load_settings::<Settings>()
        .await
        .unwrap_or_else(|| cli.settings());

    info!(server = %cli.server_url, character = cli.character_id, "connecting");
    let client = SocketClient::connect(&cli.server_url, cli.character_id).await?;

    let ctx = GameContext {
        player: client.clone(),
        groups: client.clone(),
        presets: client.clone(),
        commands: client.clone(),
        travel: Arc::new(ArmyTravelCalculator::new(cli.world_speed)),
        notifications: client.clone(),
    };

    let (engine, handle) = Engine::new(ctx, profile, settings);
    engine.spawn();

    // Surface the event stream in the log.
    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(?event, "farm event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });

    handle.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.pause().await?;

    Ok(())
}
