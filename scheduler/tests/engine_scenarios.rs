//! End-to-end scenarios for the engine, driven against a scripted fake of
//! the game session. The tokio clock is paused, so timer waits complete
//! deterministically and instantly.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use common::time::now_secs;
use game::error::GameError;
use game::notifications::GameNotification;
use game::services::{
    CommandService, GameContext, GameResult, GroupDirectory, NotificationSource, PlayerDirectory,
    PresetDirectory, TravelCalculator,
};
use game::types::{
    AttackOrder, Command, CommandType, Direction, Group, GroupId, MapRegion, MapVillage,
    OrderType, PlayerId, Preset, UnitAvailability, UnitCounts, UnitKind, Village, VillageId,
};
use scheduler::engine::{Engine, FarmHandle};
use scheduler::events::FarmEvent;
use scheduler::settings::{Settings, SettingsUpdate};
use session::Profile;
use session::store::memory::MemoryStateStore;

const PLAYER: PlayerId = 77;

struct FakeGame {
    villages: Vec<Village>,
    map: Vec<MapVillage>,
    presets: Vec<Preset>,
    commands: HashMap<VillageId, Vec<Command>>,
    units: HashMap<VillageId, UnitCounts>,
    /// Acknowledge dispatches with a push, like the real server.
    auto_ack: bool,
    pushes: broadcast::Sender<GameNotification>,
    dispatched: Mutex<Vec<AttackOrder>>,
    locate_calls: AtomicUsize,
    unit_calls: AtomicUsize,
}

impl FakeGame {
    fn new() -> Self {
        let (pushes, _) = broadcast::channel(256);

        Self {
            villages: Vec::new(),
            map: Vec::new(),
            presets: Vec::new(),
            commands: HashMap::new(),
            units: HashMap::new(),
            auto_ack: true,
            pushes,
            dispatched: Mutex::new(Vec::new()),
            locate_calls: AtomicUsize::new(0),
            unit_calls: AtomicUsize::new(0),
        }
    }

    fn dispatched(&self) -> Vec<AttackOrder> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl PlayerDirectory for FakeGame {
    fn player_id(&self) -> PlayerId {
        PLAYER
    }

    async fn village_list(&self) -> GameResult<Vec<Village>> {
        Ok(self.villages.clone())
    }
}

#[async_trait]
impl GroupDirectory for FakeGame {
    async fn groups(&self) -> GameResult<HashMap<GroupId, Group>> {
        Ok(HashMap::new())
    }

    async fn group_village_ids(&self, _group: GroupId) -> GameResult<HashSet<VillageId>> {
        Ok(HashSet::new())
    }
}

#[async_trait]
impl PresetDirectory for FakeGame {
    async fn presets(&self) -> GameResult<Vec<Preset>> {
        Ok(self.presets.clone())
    }
}

#[async_trait]
impl CommandService for FakeGame {
    async fn locate_villages_in_region(&self, _region: MapRegion) -> GameResult<Vec<MapVillage>> {
        self.locate_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.map.clone())
    }

    async fn outstanding_commands(&self, village: VillageId) -> GameResult<Vec<Command>> {
        Ok(self.commands.get(&village).cloned().unwrap_or_default())
    }

    async fn unit_inventory(&self, village: VillageId) -> GameResult<UnitCounts> {
        self.unit_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.units.get(&village).cloned().unwrap_or_default())
    }

    async fn dispatch_attack(&self, order: AttackOrder) -> GameResult<()> {
        let target_id = order.target_village;
        self.dispatched.lock().push(order);

        if self.auto_ack {
            let _ = self
                .pushes
                .send(GameNotification::CommandAcknowledged { target_id });
        }

        Ok(())
    }

    async fn attacking_factor(&self, _target: VillageId) -> GameResult<()> {
        Ok(())
    }

    async fn shop_offers(&self) -> GameResult<()> {
        Ok(())
    }
}

impl NotificationSource for FakeGame {
    fn subscribe(&self) -> broadcast::Receiver<GameNotification> {
        self.pushes.subscribe()
    }
}

/// Constant travel time, independent of preset and distance.
struct FixedTravel(f64);

#[async_trait]
impl TravelCalculator for FixedTravel {
    async fn travel_time(
        &self,
        _preset: &Preset,
        _distance: f64,
        _order: OrderType,
    ) -> Result<f64, GameError> {
        Ok(self.0)
    }
}

fn context(fake: &Arc<FakeGame>, travel_secs: f64) -> GameContext {
    GameContext {
        player: fake.clone(),
        groups: fake.clone(),
        presets: fake.clone(),
        commands: fake.clone(),
        travel: Arc::new(FixedTravel(travel_secs)),
        notifications: fake.clone(),
    }
}

fn spawn_engine(fake: Arc<FakeGame>, settings: Settings, travel_secs: f64) -> FarmHandle {
    let profile = Profile::new(Arc::new(MemoryStateStore::new()), PLAYER);
    let (engine, handle) = Engine::new(context(&fake, travel_secs), profile, settings);
    engine.spawn();

    handle
}

fn village(id: VillageId, x: i32, y: i32) -> Village {
    Village {
        id,
        name: format!("Village {id}"),
        x,
        y,
    }
}

fn barbarian(id: VillageId, x: i32, y: i32) -> MapVillage {
    MapVillage {
        id,
        name: format!("Barbarian {id}"),
        x,
        y,
        character_id: None,
    }
}

fn raid_preset() -> Preset {
    Preset {
        id: 1,
        name: "raid".into(),
        units: HashMap::from([(UnitKind::LightCavalry, 10)]),
    }
}

fn cavalry(count: u32) -> UnitCounts {
    HashMap::from([(
        UnitKind::LightCavalry,
        UnitAvailability {
            in_town: count,
            support: 0,
        },
    )])
}

fn farm_settings() -> Settings {
    Settings {
        preset_name: "raid".into(),
        ..Default::default()
    }
}

fn returning_command(id: u64, completes_in_secs: f64) -> Command {
    let now = now_secs();

    Command {
        id,
        command_type: CommandType::Attack,
        direction: Direction::Back,
        time_start: now - 60.0,
        time_completed: now + completes_in_secs,
    }
}

/// A village pinned at the outstanding-command cap, nearest return in 10 s.
fn at_cap_commands() -> Vec<Command> {
    let mut commands = vec![returning_command(1, 10.0)];
    commands.extend((2..=50).map(|id| returning_command(id, 1_000.0)));

    commands
}

async fn wait_for(
    events: &mut broadcast::Receiver<FarmEvent>,
    pred: impl Fn(&FarmEvent) -> bool,
) -> FarmEvent {
    loop {
        match tokio::time::timeout(Duration::from_secs(600), events.recv()).await {
            Ok(Ok(event)) => {
                if pred(&event) {
                    return event;
                }
            }
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(e)) => panic!("event bus closed: {e}"),
            Err(_) => panic!("timed out waiting for event"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_a_single_dispatch_then_jittered_retick() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.map = vec![barbarian(2, 503, 500)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    let sent = wait_for(&mut events, |e| matches!(e, FarmEvent::SendCommand { .. })).await;
    let FarmEvent::SendCommand { origin, target } = sent else {
        unreachable!()
    };
    assert_eq!(origin.id, 1);
    assert_eq!(target.id, 2);

    let next = wait_for(&mut events, |e| matches!(e, FarmEvent::NextCommandIn(_))).await;
    let FarmEvent::NextCommandIn(interval) = next else {
        unreachable!()
    };
    assert!(
        (1..=5).contains(&interval.as_secs()),
        "interval {interval:?} outside random_base ± 50 %"
    );

    handle.pause().await.unwrap();

    let orders = fake.dispatched();
    assert!(!orders.is_empty());
    assert_eq!(orders[0].start_village, 1);
    assert_eq!(orders[0].target_village, 2);
    assert_eq!(orders[0].order_type, OrderType::Attack);
    assert_eq!(orders[0].catapult_target, "headquarter");
    assert_eq!(orders[0].units, raid_preset().units);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_command_cap_waits_without_rotating() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.map = vec![barbarian(2, 503, 500)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    fake.commands.insert(1, at_cap_commands());
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::CommandLimit { village: Some(v) } if v.id == 1)
    })
    .await;

    // One wait timer: the cooldown elapses, then the same village re-ticks.
    wait_for(&mut events, |e| matches!(e, FarmEvent::CommandReturn(1))).await;
    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::CommandLimit { village: Some(v) } if v.id == 1)
    })
    .await;

    handle.pause().await.unwrap();

    let rotated = handle
        .recent_events()
        .iter()
        .any(|e| matches!(e, FarmEvent::NextVillage(_) | FarmEvent::NoVillages));
    assert!(!rotated, "a unique village must never rotate");
    assert!(fake.dispatched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scenario_c_time_exceeded_advances_targets_with_no_delay() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.map = vec![barbarian(2, 503, 500), barbarian(3, 505, 500)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    let fake = Arc::new(fake);

    // Travel time far past the one-hour budget: every pairing is rejected.
    let handle = spawn_engine(fake.clone(), farm_settings(), 1_000_000.0);
    let started = tokio::time::Instant::now();
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::NextTarget(t) if t.id == 3)
    })
    .await;
    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::NextTarget(t) if t.id == 2)
    })
    .await;

    assert!(
        started.elapsed().is_zero(),
        "target advances must not wait on any timer"
    );

    handle.pause().await.unwrap();

    assert!(fake.dispatched().is_empty());
    assert!(
        !handle
            .recent_events()
            .iter()
            .any(|e| matches!(
                e,
                FarmEvent::NoUnits(_) | FarmEvent::CommandLimit { .. } | FarmEvent::CommandReturn(_)
            )),
        "time-exceeded must not enter cooldown"
    );
}

#[tokio::test(start_paused = true)]
async fn start_without_matching_preset_refuses() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.presets = vec![Preset {
        name: "defense".into(),
        ..raid_preset()
    }];
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| matches!(e, FarmEvent::NoPreset)).await;

    assert!(
        !handle
            .recent_events()
            .iter()
            .any(|e| matches!(e, FarmEvent::Start)),
        "the loop must not start without a preset"
    );
    assert!(fake.dispatched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_village_list_signals_no_selection() {
    let mut fake = FakeGame::new();
    fake.presets = vec![raid_preset()];
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| matches!(e, FarmEvent::NoVillageSelected)).await;
}

#[tokio::test(start_paused = true)]
async fn no_units_rotates_to_the_next_village() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500), village(10, 520, 520)];
    fake.map = vec![barbarian(2, 503, 500), barbarian(12, 523, 520)];
    fake.presets = vec![raid_preset()];
    // Village 1 is empty; village 10 has a full stable.
    fake.units.insert(10, cavalry(50));
    fake.commands.insert(1, vec![returning_command(1, 300.0)]);
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::NoUnits(v) if v.id == 1)
    })
    .await;
    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::NextVillage(v) if v.id == 10)
    })
    .await;
    let sent = wait_for(&mut events, |e| matches!(e, FarmEvent::SendCommand { .. })).await;

    handle.pause().await.unwrap();

    let FarmEvent::SendCommand { origin, .. } = sent else {
        unreachable!()
    };
    assert_eq!(origin.id, 10, "the cooling village must be skipped");
}

#[tokio::test(start_paused = true)]
async fn exhausted_fleet_waits_for_the_earliest_return() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500), village(10, 520, 520)];
    fake.map = vec![barbarian(2, 503, 500), barbarian(12, 523, 520)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    fake.units.insert(10, cavalry(50));
    fake.commands.insert(1, at_cap_commands());
    let mut far_cap = at_cap_commands();
    far_cap[0] = returning_command(1, 900.0);
    fake.commands.insert(10, far_cap);
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::CommandLimit { village: None })
    })
    .await;

    // Village 1 holds the nearest return; recovery jumps back to it.
    wait_for(&mut events, |e| matches!(e, FarmEvent::CommandReturn(1))).await;
    wait_for(&mut events, |e| {
        matches!(e, FarmEvent::CommandLimit { village: Some(v) } if v.id == 1)
    })
    .await;

    handle.pause().await.unwrap();
    assert!(fake.dispatched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keep_alive_recovers_a_lost_acknowledgment() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.map = vec![barbarian(2, 503, 500)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    fake.auto_ack = false;
    let fake = Arc::new(fake);

    let settings = Settings {
        keep_running_trys: 2,
        ..farm_settings()
    };
    let handle = spawn_engine(fake.clone(), settings, 60.0);
    handle.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fake.dispatched().len(), 1, "first dispatch goes out");

    // Two keep-alive checks later the pending acknowledgment is
    // force-cleared and the loop dispatches again.
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert!(
        fake.dispatched().len() >= 2,
        "stalled loop was never recovered"
    );

    handle.pause().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn distance_change_drops_cached_targets() {
    let mut fake = FakeGame::new();
    fake.villages = vec![village(1, 500, 500)];
    fake.map = vec![barbarian(2, 503, 500)];
    fake.presets = vec![raid_preset()];
    fake.units.insert(1, cavalry(50));
    let fake = Arc::new(fake);

    let handle = spawn_engine(fake.clone(), farm_settings(), 60.0);
    let mut events = handle.subscribe();
    handle.start().await.unwrap();

    wait_for(&mut events, |e| matches!(e, FarmEvent::SendCommand { .. })).await;
    handle.pause().await.unwrap();
    assert_eq!(fake.locate_calls.load(Ordering::Relaxed), 1);

    handle
        .update_settings(SettingsUpdate {
            min_distance: Some(1.0),
            ..Default::default()
        })
        .await
        .unwrap();

    handle.start().await.unwrap();
    wait_for(&mut events, |e| matches!(e, FarmEvent::SendCommand { .. })).await;
    handle.pause().await.unwrap();

    assert_eq!(
        fake.locate_calls.load(Ordering::Relaxed),
        2,
        "cleared directory must be refetched"
    );
}
