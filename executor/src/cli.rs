use std::time::Duration;

use clap::Parser;

use scheduler::Settings;

/// Command-line configuration of the farm agent.
#[derive(Debug, Parser)]
#[clap(name = "farmbot", version)]
pub struct Cli {
    /// WebSocket endpoint of the game server.
    #[clap(long)]
    pub server_url: String,

    /// Character id to farm with.
    #[clap(long)]
    pub character_id: u64,

    /// SQLite database holding per-player state.
    #[clap(long, default_value = "sqlite://farmbot.db?mode=rwc")]
    pub database_url: String,

    /// World speed used for travel-time estimates.
    #[clap(long, default_value = "1.0")]
    pub world_speed: f64,

    /// Preset name to dispatch with, used until a settings blob is
    /// persisted for this character.
    #[clap(long, default_value = "")]
    pub preset_name: String,

    /// Maximum target distance in fields.
    #[clap(long, default_value = "10.0")]
    pub max_distance: f64,

    /// Base seconds between commands (jittered ±50 %).
    #[clap(long, default_value = "3")]
    pub random_base: u64,
}

impl Cli {
    /// Settings used on first run, before any profile blob exists.
    pub fn settings(&self) -> Settings {
        Settings {
            preset_name: self.preset_name.clone(),
            max_distance: self.max_distance,
            random_base: Duration::from_secs(self.random_base),
            ..Default::default()
        }
    }
}
