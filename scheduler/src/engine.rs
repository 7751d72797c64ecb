//! The command scheduling state machine.
//!
//! The engine runs as a single task: control messages, timer wakes and game
//! pushes all funnel into one queue and are handled strictly in sequence, so
//! scheduler state needs no locking. The tick decision procedure is an
//! iterative loop; target and village retries never grow the stack.
//!
//! Timer discipline: at most one dispatch-slot timer and one keep-alive
//! timer exist at a time, and arming a slot replaces (and aborts) whatever
//! was in it. Pausing clears both slots plus any pending simulate delay; a
//! wake that was already queued when the pause landed is discarded by the
//! `running` check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use common::time::{now_ms, now_secs};
use game::notifications::GameNotification;
use game::services::GameContext;
use game::types::{AttackOrder, Command, Group, GroupId, MapRegion, Preset, Village, VillageId};
use session::Profile;

use crate::cooldown::{CooldownMap, RETURN_MARGIN_MS, next_return_delay_ms};
use crate::events::{EventBus, FarmEvent};
use crate::presets::{PresetChoice, select_preset};
use crate::rotation::{RotationOutcome, VillageRotation};
use crate::settings::{Settings, SettingsUpdate};
use crate::targets::{Target, TargetDirectory};

/// Server-imposed cap on outstanding commands per village.
pub const COMMAND_LIMIT: usize = 50;

const CONTROL_BUFFER: usize = 16;
const WAKE_BUFFER: usize = 32;

/// Upper bound on re-entry steps within one tick. A configuration where
/// every target fails the travel-time budget would otherwise cycle the
/// target list forever without yielding to control messages; hitting the
/// budget defers the tick to a timer instead.
const TICK_STEP_BUDGET: usize = 256;

#[derive(Debug)]
enum Control {
    Start,
    Pause,
    UpdateSettings(SettingsUpdate),
}

/// What the dispatch-slot timer does when it fires.
#[derive(Debug, Clone, Copy)]
enum DispatchWake {
    Retick,
    /// Fleet-wide recovery: jump to this village first.
    Recover(VillageId),
}

#[derive(Debug)]
enum Wake {
    DispatchTimer(DispatchWake),
    SimulateReady {
        origin: Village,
        target: Target,
        preset: Preset,
    },
    KeepAlive,
    CooldownElapsed(VillageId),
}

/// A dispatch waiting for the server's acknowledgment.
struct PendingDispatch {
    origin: Village,
    target: Target,
}

/// Aborts the wrapped task when cleared or replaced.
struct TimerSlot(JoinHandle<()>);

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum FetchOutcome {
    Fetched,
    Exhausted,
}

/// Cloneable control surface over a running [`Engine`].
#[derive(Clone)]
pub struct FarmHandle {
    control: mpsc::Sender<Control>,
    bus: Arc<EventBus>,
}

impl FarmHandle {
    pub async fn start(&self) -> anyhow::Result<()> {
        self.send(Control::Start).await
    }

    pub async fn pause(&self) -> anyhow::Result<()> {
        self.send(Control::Pause).await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> anyhow::Result<()> {
        self.send(Control::UpdateSettings(update)).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FarmEvent> {
        self.bus.subscribe()
    }

    pub fn recent_events(&self) -> Vec<FarmEvent> {
        self.bus.recent()
    }

    async fn send(&self, control: Control) -> anyhow::Result<()> {
        self.control
            .send(control)
            .await
            .map_err(|_| anyhow::anyhow!("engine task is gone"))
    }
}

pub struct Engine {
    ctx: GameContext,
    profile: Profile,
    settings: Settings,
    bus: Arc<EventBus>,

    running: bool,
    rotation: VillageRotation,
    targets: TargetDirectory,
    cooldowns: CooldownMap,
    presets: Vec<Preset>,

    group_ignore: Option<Group>,
    group_include: Option<Group>,
    group_only: Option<Group>,
    ignored_villages: HashSet<VillageId>,
    included_villages: HashSet<VillageId>,

    /// Dispatches awaiting acknowledgment, keyed by target id. The tick
    /// procedure never starts a second dispatch while one is pending.
    pending_acks: HashMap<VillageId, PendingDispatch>,
    dispatch_timer: Option<TimerSlot>,
    simulate_timer: Option<TimerSlot>,
    keep_alive_timer: Option<TimerSlot>,
    keep_alive_misses: u32,

    control_rx: mpsc::Receiver<Control>,
    wake_tx: mpsc::Sender<Wake>,
    wake_rx: mpsc::Receiver<Wake>,
}

impl Engine {
    pub fn new(ctx: GameContext, profile: Profile, settings: Settings) -> (Self, FarmHandle) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
        let (wake_tx, wake_rx) = mpsc::channel(WAKE_BUFFER);
        let bus = Arc::new(EventBus::new(settings.events_limit));

        let handle = FarmHandle {
            control: control_tx,
            bus: bus.clone(),
        };

        let engine = Self {
            ctx,
            profile,
            settings,
            bus,
            running: false,
            rotation: VillageRotation::new(),
            targets: TargetDirectory::new(),
            cooldowns: CooldownMap::new(),
            presets: Vec::new(),
            group_ignore: None,
            group_include: None,
            group_only: None,
            ignored_villages: HashSet::new(),
            included_villages: HashSet::new(),
            pending_acks: HashMap::new(),
            dispatch_timer: None,
            simulate_timer: None,
            keep_alive_timer: None,
            keep_alive_misses: 0,
            control_rx,
            wake_tx,
            wake_rx,
        };

        (engine, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the engine until every control handle is dropped.
    pub async fn run(mut self) {
        if let Err(e) = self.bootstrap().await {
            warn!(error = %e, "engine bootstrap failed");
        }

        let mut pushes = self.ctx.notifications.subscribe();
        let mut pushes_open = true;

        loop {
            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(control) => self.handle_control(control).await,
                    None => break,
                },
                Some(wake) = self.wake_rx.recv() => self.handle_wake(wake).await,
                push = pushes.recv(), if pushes_open => match push {
                    Ok(push) => self.handle_push(push).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "notification stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("notification stream closed");
                        pushes_open = false;
                    }
                },
            }
        }
    }

    async fn bootstrap(&mut self) -> anyhow::Result<()> {
        let seeds = self.profile.load_cursors(self.settings.index_expire).await;
        self.targets.set_seeds(seeds);

        self.refresh_groups().await?;
        self.refresh_villages().await?;
        self.refresh_presets().await?;

        info!(
            villages = self.rotation.villages().len(),
            presets = self.presets.len(),
            "engine ready"
        );

        Ok(())
    }

    // ---- control ----

    async fn handle_control(&mut self, control: Control) {
        match control {
            Control::Start => self.start().await,
            Control::Pause => self.pause(),
            Control::UpdateSettings(update) => self.update_settings(update).await,
        }
    }

    async fn start(&mut self) {
        if self.running {
            return;
        }
        if self.presets.is_empty() {
            self.bus.emit(FarmEvent::NoPreset);
            return;
        }

        self.bus.emit(FarmEvent::Start);
        info!("farm loop started");

        self.resume().await;
    }

    async fn resume(&mut self) {
        self.running = true;
        self.tick().await;
        self.arm_keep_alive();
    }

    fn pause(&mut self) {
        self.running = false;
        self.bus.emit(FarmEvent::Pause);
        info!("farm loop paused");

        self.dispatch_timer = None;
        self.simulate_timer = None;
        self.keep_alive_timer = None;
        self.keep_alive_misses = 0;
    }

    async fn update_settings(&mut self, update: SettingsUpdate) {
        let invalidate = self.settings.apply(update);
        debug!(?invalidate, "settings updated");

        if invalidate.groups {
            if let Err(e) = self.refresh_groups().await {
                warn!(error = %e, "group refresh failed");
            }
        }
        if invalidate.villages {
            if let Err(e) = self.refresh_villages().await {
                warn!(error = %e, "village refresh failed");
            }
        }
        if invalidate.presets {
            if let Err(e) = self.refresh_presets().await {
                warn!(error = %e, "preset refresh failed");
            }
        }
        if invalidate.targets {
            self.targets.clear();
        }

        self.bus.set_limit(self.settings.events_limit);

        // Atomic pause+restart around the mutation so the next tick observes
        // the updated state. The start/pause noise is suppressed; events of
        // the restarted tick itself still reach observers.
        if self.running {
            self.bus.set_enabled(false);
            self.pause();
            self.bus.set_enabled(true);

            if self.presets.is_empty() {
                self.bus.emit(FarmEvent::NoPreset);
            } else {
                self.resume().await;
            }
        }

        if let Err(e) = self.profile.save_settings(&self.settings).await {
            warn!(error = %e, "settings persist failed");
        }
    }

    // ---- wakes and pushes ----

    async fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::DispatchTimer(wake) => {
                self.dispatch_timer = None;
                self.keep_alive_misses = 0;

                if let DispatchWake::Recover(village) = wake {
                    self.rotation.select_by_id(village);
                }

                self.tick().await;
            }
            Wake::SimulateReady {
                origin,
                target,
                preset,
            } => {
                self.simulate_timer = None;
                self.finish_dispatch(origin, target, preset).await;
            }
            Wake::KeepAlive => self.keep_alive_check().await,
            Wake::CooldownElapsed(village) => {
                self.cooldowns.remove(village);
                self.bus.emit(FarmEvent::CommandReturn(village));
            }
        }
    }

    async fn handle_push(&mut self, push: GameNotification) {
        match push {
            GameNotification::CommandAcknowledged { target_id } => {
                if let Some(pending) = self.pending_acks.remove(&target_id) {
                    self.on_command_acknowledged(pending).await;
                }
            }
            GameNotification::PresetCatalogChanged => {
                if let Err(e) = self.refresh_presets().await {
                    warn!(error = %e, "preset refresh failed");
                    return;
                }

                self.bus.emit(FarmEvent::PresetsChange);

                if self.presets.is_empty() {
                    self.bus.emit(FarmEvent::NoPreset);
                    if self.running {
                        self.pause();
                    }
                }
            }
            GameNotification::GroupMembershipChanged => {
                if let Err(e) = self.refresh_groups().await {
                    warn!(error = %e, "group refresh failed");
                    return;
                }

                self.bus.emit(FarmEvent::GroupsChanged);
            }
            GameNotification::VillageGroupLinked { group_id }
            | GameNotification::VillageGroupUnlinked { group_id } => {
                // New include-group membership must show up as targets.
                if self.group_include.as_ref().is_some_and(|g| g.id == group_id) {
                    self.targets.clear();
                }
            }
        }
    }

    async fn on_command_acknowledged(&mut self, pending: PendingDispatch) {
        debug!(
            origin = pending.origin.id,
            target = pending.target.id,
            "command acknowledged"
        );

        self.bus.emit(FarmEvent::SendCommand {
            origin: pending.origin.clone(),
            target: pending.target,
        });

        self.advance_target(pending.origin.id, false);
        self.persist_cursors().await;

        let interval = random_seconds(self.settings.random_base.as_secs(), None);
        self.arm_dispatch_timer(interval, DispatchWake::Retick);
        self.bus.emit(FarmEvent::NextCommandIn(interval));
    }

    // ---- the tick ----

    async fn tick(&mut self) {
        if let Err(e) = self.try_tick().await {
            warn!(error = %e, "tick failed, pausing");
            self.pause();
        }
    }

    /// One pass of the decision procedure. Every re-entry point is a
    /// `continue` with an explicit step budget, never recursion.
    async fn try_tick(&mut self) -> anyhow::Result<()> {
        for _ in 0..TICK_STEP_BUDGET {
            if !self.running {
                return Ok(());
            }

            let Some(village) = self.rotation.selected().cloned() else {
                self.bus.emit(FarmEvent::NoVillageSelected);
                return Ok(());
            };

            // Resolve the target list first; fetching rotates on its own
            // when a village has nothing in range.
            if !self.targets.contains(village.id) {
                match self.fetch_targets(village).await? {
                    FetchOutcome::Fetched => continue,
                    FetchOutcome::Exhausted => {
                        self.bus.emit(FarmEvent::NoTargets);
                        return Ok(());
                    }
                }
            }

            let Some(target) = self.advance_target(village.id, true) else {
                return Ok(());
            };

            if self.cooldowns.contains(village.id) {
                match self.rotate() {
                    RotationOutcome::Next(_) => continue,
                    RotationOutcome::Unique | RotationOutcome::Exhausted => {
                        self.bus.emit(FarmEvent::CommandLimit { village: None });
                        self.schedule_fleet_recovery();
                        return Ok(());
                    }
                }
            }

            // The village may have joined the ignore group mid-run; a benign
            // skip, no recovery needed.
            if self.ignored_villages.contains(&village.id) {
                match self.rotate() {
                    RotationOutcome::Next(_) => continue,
                    RotationOutcome::Unique | RotationOutcome::Exhausted => return Ok(()),
                }
            }

            let commands = self.ctx.commands.outstanding_commands(village.id).await?;

            if commands.len() == COMMAND_LIMIT {
                self.bus.emit(FarmEvent::CommandLimit {
                    village: Some(village.clone()),
                });
                let delay_ms = self.enter_cooldown(village.id, &commands);

                if self.rotation.is_unique() {
                    let wait = Duration::from_millis(delay_ms) + random_seconds(5, None);
                    self.arm_dispatch_timer(wait, DispatchWake::Retick);
                    return Ok(());
                }

                // Multi-village: the cooldown check above rotates on the
                // next pass.
                continue;
            }

            let units = self.ctx.commands.unit_inventory(village.id).await?;
            let choice = select_preset(
                &self.presets,
                &units,
                village.position(),
                target.position,
                self.settings.max_travel_time,
                self.ctx.travel.as_ref(),
            )
            .await?;

            match choice {
                PresetChoice::TimeExceeded => {
                    // This pairing can never work; next target, no delay.
                    self.advance_target(village.id, false);
                    self.persist_cursors().await;
                    continue;
                }
                PresetChoice::NoUnits => {
                    self.bus.emit(FarmEvent::NoUnits(village.clone()));

                    if self.rotation.is_unique() {
                        if commands.is_empty() {
                            self.bus.emit(FarmEvent::NoUnitsNoCommands);
                            return Ok(());
                        }

                        let delay_ms = self.enter_cooldown(village.id, &commands);
                        self.arm_dispatch_timer(
                            Duration::from_millis(delay_ms),
                            DispatchWake::Retick,
                        );
                        return Ok(());
                    }

                    self.enter_cooldown(village.id, &commands);
                    match self.rotate() {
                        RotationOutcome::Next(_) => continue,
                        RotationOutcome::Unique | RotationOutcome::Exhausted => {
                            self.schedule_fleet_recovery();
                            return Ok(());
                        }
                    }
                }
                PresetChoice::Selected(preset) => {
                    self.begin_dispatch(village, target, preset).await;
                    return Ok(());
                }
            }
        }

        warn!("tick step budget exhausted, deferring");
        let interval = random_seconds(self.settings.random_base.as_secs(), None);
        self.arm_dispatch_timer(interval, DispatchWake::Retick);

        Ok(())
    }

    /// Fetch and cache the target list for the selected village, rotating
    /// away from villages with nothing in range. Bounded by one pass over
    /// the rotation.
    async fn fetch_targets(&mut self, mut origin: Village) -> anyhow::Result<FetchOutcome> {
        let attempts = self.rotation.villages().len().max(1);

        for _ in 0..attempts {
            if self.targets.contains(origin.id) {
                return Ok(FetchOutcome::Fetched);
            }

            let half_width = self.settings.max_distance.ceil() as i32;
            let region = MapRegion::around(origin.position(), half_width);
            let snapshot = self.ctx.commands.locate_villages_in_region(region).await?;

            let built = self.targets.build(
                &origin,
                snapshot,
                self.settings.min_distance,
                self.settings.max_distance,
                &self.included_villages,
            );

            if built {
                debug!(
                    origin = origin.id,
                    targets = self.targets.get(origin.id).map_or(0, |l| l.len()),
                    "target list resolved"
                );
                return Ok(FetchOutcome::Fetched);
            }

            match self.rotate() {
                RotationOutcome::Next(next) => origin = next,
                RotationOutcome::Unique | RotationOutcome::Exhausted => {
                    return Ok(FetchOutcome::Exhausted);
                }
            }
        }

        Ok(FetchOutcome::Exhausted)
    }

    /// Advance the cursor for `origin`, emitting skip and selection events.
    /// `None` when the list is missing or fully ignored.
    fn advance_target(&mut self, origin: VillageId, initial: bool) -> Option<Target> {
        let advance = self
            .targets
            .advance(origin, &self.ignored_villages, initial)?;

        for skipped in &advance.skipped {
            self.bus.emit(FarmEvent::IgnoredTarget(skipped.clone()));
        }

        match advance.selected {
            Some(target) => {
                if !initial {
                    self.bus.emit(FarmEvent::NextTarget(target.clone()));
                }
                Some(target)
            }
            None => {
                self.bus.emit(FarmEvent::NoTargets);
                None
            }
        }
    }

    fn rotate(&mut self) -> RotationOutcome {
        let outcome = self
            .rotation
            .advance(&self.ignored_villages, &self.cooldowns.ids());

        match &outcome {
            RotationOutcome::Next(village) => {
                self.bus.emit(FarmEvent::NextVillage(village.clone()));
            }
            RotationOutcome::Exhausted => {
                self.bus.emit(FarmEvent::NoVillages);
            }
            RotationOutcome::Unique => {}
        }

        outcome
    }

    // ---- dispatch ----

    /// Pre-attack chatter plus a randomized pause before the real order, so
    /// the traffic pattern resembles manual play.
    async fn begin_dispatch(&mut self, origin: Village, target: Target, preset: Preset) {
        if let Err(e) = self.ctx.commands.attacking_factor(target.id).await {
            debug!(error = %e, "attacking-factor call failed");
        }
        if let Err(e) = self.ctx.commands.shop_offers().await {
            debug!(error = %e, "shop-offers call failed");
        }

        let delay = random_seconds(1, None);
        let wake_tx = self.wake_tx.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wake_tx
                .send(Wake::SimulateReady {
                    origin,
                    target,
                    preset,
                })
                .await;
        });
        self.simulate_timer = Some(TimerSlot(timer));
    }

    async fn finish_dispatch(&mut self, origin: Village, target: Target, preset: Preset) {
        if let Err(e) = self.ctx.commands.attacking_factor(target.id).await {
            debug!(error = %e, "attacking-factor call failed");
        }

        // The loop may have been paused while the chatter was in flight.
        if !self.running {
            return;
        }

        let order = AttackOrder::for_preset(origin.id, target.id, &preset);
        if let Err(e) = self.ctx.commands.dispatch_attack(order).await {
            warn!(error = %e, "attack dispatch failed");
            return;
        }

        debug!(
            origin = origin.id,
            target = target.id,
            "attack dispatched, awaiting acknowledgment"
        );
        self.pending_acks
            .insert(target.id, PendingDispatch { origin, target });
    }

    // ---- cooldowns and recovery ----

    /// Put the village on cooldown until its nearest command returns,
    /// returning the delay used. With no qualifying command the safety
    /// margin alone is used, so an exhausted village cannot spin the
    /// rotation.
    fn enter_cooldown(&mut self, village: VillageId, commands: &[Command]) -> u64 {
        let delay_ms = next_return_delay_ms(commands, now_secs()).unwrap_or(RETURN_MARGIN_MS);
        let deadline_ms = now_ms() + delay_ms;

        let wake_tx = self.wake_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = wake_tx.send(Wake::CooldownElapsed(village)).await;
        });

        self.cooldowns.insert(village, deadline_ms, timer);
        debug!(village, delay_ms, "village on cooldown");

        delay_ms
    }

    /// Every village is exhausted: wait for the entry with the smallest
    /// remaining time, then jump straight to that village.
    fn schedule_fleet_recovery(&mut self) {
        let Some((village, remaining_ms)) = self.cooldowns.earliest(now_ms()) else {
            warn!("fleet recovery requested with no cooldown entries");
            return;
        };

        debug!(village, remaining_ms, "waiting for earliest return");
        self.arm_dispatch_timer(
            Duration::from_millis(remaining_ms),
            DispatchWake::Recover(village),
        );
    }

    // ---- timers ----

    fn arm_dispatch_timer(&mut self, delay: Duration, wake: DispatchWake) {
        let wake_tx = self.wake_tx.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wake_tx.send(Wake::DispatchTimer(wake)).await;
        });

        // Replacing the slot aborts any previous timer.
        self.dispatch_timer = Some(TimerSlot(timer));
    }

    fn arm_keep_alive(&mut self) {
        let interval = self.settings.keep_running_interval;
        let wake_tx = self.wake_tx.clone();

        let timer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick is immediate

            loop {
                ticker.tick().await;
                if wake_tx.send(Wake::KeepAlive).await.is_err() {
                    break;
                }
            }
        });

        self.keep_alive_timer = Some(TimerSlot(timer));
        self.keep_alive_misses = 0;
    }

    /// While running there is supposed to be a wake on the way: a dispatch
    /// timer, a simulate delay or an owed acknowledgment. When there is
    /// none the loop silently stalled; when one survives too many checks
    /// the external service dropped it. Either way: force a fresh tick.
    async fn keep_alive_check(&mut self) {
        if !self.running {
            return;
        }

        let idle = self.dispatch_timer.is_none()
            && self.simulate_timer.is_none()
            && self.pending_acks.is_empty();

        if idle {
            warn!("farm loop stalled, forcing tick");
            self.keep_alive_misses = 0;
            self.tick().await;
            return;
        }

        self.keep_alive_misses += 1;
        if self.keep_alive_misses >= self.settings.keep_running_trys {
            warn!(
                checks = self.keep_alive_misses,
                "pending wake never fired, force-clearing"
            );
            self.keep_alive_misses = 0;
            self.dispatch_timer = None;
            self.simulate_timer = None;
            self.pending_acks.clear();
            self.tick().await;
        }
    }

    // ---- derived state ----

    async fn refresh_groups(&mut self) -> anyhow::Result<()> {
        let groups = self.ctx.groups.groups().await?;

        self.group_ignore = find_group(&groups, &self.settings.group_ignore);
        self.group_include = find_group(&groups, &self.settings.group_include);
        self.group_only = find_group(&groups, &self.settings.group_only);

        self.ignored_villages = match &self.group_ignore {
            Some(group) => self.ctx.groups.group_village_ids(group.id).await?,
            None => HashSet::new(),
        };
        self.included_villages = match &self.group_include {
            Some(group) => self.ctx.groups.group_village_ids(group.id).await?,
            None => HashSet::new(),
        };

        Ok(())
    }

    async fn refresh_villages(&mut self) -> anyhow::Result<()> {
        let all = self.ctx.player.village_list().await?;

        let filtered = match &self.group_only {
            Some(group) => {
                let members = self.ctx.groups.group_village_ids(group.id).await?;
                all.into_iter().filter(|v| members.contains(&v.id)).collect()
            }
            None => all,
        };

        self.rotation.set_villages(filtered);
        self.bus.emit(FarmEvent::PlayerVillagesUpdate);

        Ok(())
    }

    async fn refresh_presets(&mut self) -> anyhow::Result<()> {
        let catalog = self.ctx.presets.presets().await?;

        self.presets = catalog
            .into_iter()
            .filter(|preset| preset.name == self.settings.preset_name)
            .map(Preset::cleaned)
            .collect();

        debug!(presets = self.presets.len(), "preset list refreshed");

        Ok(())
    }

    async fn persist_cursors(&mut self) {
        if let Err(e) = self.profile.save_cursors(self.targets.cursors()).await {
            warn!(error = %e, "cursor persist failed");
        }
    }
}

fn find_group(groups: &HashMap<GroupId, Group>, name: &str) -> Option<Group> {
    if name.is_empty() {
        return None;
    }

    groups.values().find(|group| group.name == name).cloned()
}

/// A duration of roughly `base` seconds: uniform over base ± `range`
/// (default half the base), rounded to whole seconds.
fn random_seconds(base: u64, range: Option<u64>) -> Duration {
    let base = base as f64;
    let spread = range.map_or(base / 2.0, |r| r as f64);

    let min = base - spread;
    let max = base + spread;
    let secs = rand::rng().random_range(min..=max).round().max(0.0);

    Duration::from_secs(secs as u64)
}
