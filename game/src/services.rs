//! Abstract contracts for every external collaborator the scheduler
//! consumes. The engine never talks to the game session directly; it is
//! handed a [`GameContext`] at construction and goes through these traits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::GameError;
use crate::notifications::GameNotification;
use crate::types::{
    AttackOrder, Command, Group, GroupId, MapRegion, MapVillage, OrderType, PlayerId, Preset,
    UnitCounts, Village, VillageId,
};

pub type GameResult<T> = Result<T, GameError>;

#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    fn player_id(&self) -> PlayerId;

    /// The player's villages, in the game's own order.
    async fn village_list(&self) -> GameResult<Vec<Village>>;
}

#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn groups(&self) -> GameResult<HashMap<GroupId, Group>>;

    async fn group_village_ids(&self, group: GroupId) -> GameResult<HashSet<VillageId>>;
}

#[async_trait]
pub trait PresetDirectory: Send + Sync {
    /// The full preset catalog, in registration order.
    async fn presets(&self) -> GameResult<Vec<Preset>>;
}

#[async_trait]
pub trait CommandService: Send + Sync {
    async fn locate_villages_in_region(&self, region: MapRegion) -> GameResult<Vec<MapVillage>>;

    /// Outstanding commands of a village. Implementations retry the known
    /// transient server exception transparently, bounded by a fixed ceiling.
    async fn outstanding_commands(&self, village: VillageId) -> GameResult<Vec<Command>>;

    async fn unit_inventory(&self, village: VillageId) -> GameResult<UnitCounts>;

    /// Fire-and-forget. The acknowledgment arrives later as
    /// [`GameNotification::CommandAcknowledged`] keyed by the target id.
    async fn dispatch_attack(&self, order: AttackOrder) -> GameResult<()>;

    /// Best-effort pre-attack chatter, mimicking manual play.
    async fn attacking_factor(&self, target: VillageId) -> GameResult<()>;

    /// Best-effort pre-attack chatter, mimicking manual play.
    async fn shop_offers(&self) -> GameResult<()>;
}

#[async_trait]
pub trait TravelCalculator: Send + Sync {
    /// Travel time in seconds for `preset` over `distance` fields. The
    /// numeric contract must match the game client exactly; the time-budget
    /// check depends on it.
    async fn travel_time(
        &self,
        preset: &Preset,
        distance: f64,
        order: OrderType,
    ) -> GameResult<f64>;
}

pub trait NotificationSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<GameNotification>;
}

/// Every external collaborator, bundled. Constructed once at startup and
/// handed to the engine.
#[derive(Clone)]
pub struct GameContext {
    pub player: Arc<dyn PlayerDirectory>,
    pub groups: Arc<dyn GroupDirectory>,
    pub presets: Arc<dyn PresetDirectory>,
    pub commands: Arc<dyn CommandService>,
    pub travel: Arc<dyn TravelCalculator>,
    pub notifications: Arc<dyn NotificationSource>,
}
