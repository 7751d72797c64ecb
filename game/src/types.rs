//! Game-facing data model shared across the workspace.
//!
//! Everything here mirrors what the server reports; the scheduler holds
//! references and ids but never mutates game-owned records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type VillageId = u64;
pub type PlayerId = u64;
pub type GroupId = u64;
pub type PresetId = u64;
pub type CommandId = u64;

/// Board position of a village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A village owned by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub id: VillageId,
    pub name: String,
    pub x: i32,
    pub y: i32,
}

impl Village {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A village as reported by the map locator. `character_id` is set when the
/// village has an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapVillage {
    pub id: VillageId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub character_id: Option<PlayerId>,
}

impl MapVillage {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A village group: id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// The game's unit roster, serde-mapped to the wire's snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Spear,
    Sword,
    Axe,
    Archer,
    LightCavalry,
    MountedArcher,
    HeavyCavalry,
    Ram,
    Catapult,
    Knight,
    Snob,
    Trebuchet,
    Doppelsoldner,
}

/// Per-unit availability inside a village.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAvailability {
    pub in_town: u32,
    #[serde(default)]
    pub support: u32,
}

/// In-town counts per unit kind, as returned by the unit inventory call.
pub type UnitCounts = HashMap<UnitKind, UnitAvailability>;

/// A named army template used as a dispatch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub units: HashMap<UnitKind, u32>,
}

impl Preset {
    /// Drop zero-valued entries so sufficiency checks only look at units
    /// the preset actually requires.
    pub fn cleaned(mut self) -> Self {
        self.units.retain(|_, count| *count > 0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Attack,
    Support,
    Relocate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Back,
}

/// An outstanding command of a village. Timestamps are server-side unix
/// seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub direction: Direction,
    pub time_start: f64,
    pub time_completed: f64,
}

/// Square map region used by the village locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl MapRegion {
    /// The square centered on `center` with the given half-width.
    pub fn around(center: Position, half_width: i32) -> Self {
        Self {
            x: center.x - half_width,
            y: center.y - half_width,
            width: half_width * 2,
            height: half_width * 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Attack,
    Support,
}

/// Wire payload of an attack order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOrder {
    pub start_village: VillageId,
    pub target_village: VillageId,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub units: HashMap<UnitKind, u32>,
    pub catapult_target: String,
    pub officers: HashMap<String, u64>,
    pub icon: u32,
}

impl AttackOrder {
    /// Standard raid order: the preset's cleaned unit map, catapults aimed
    /// at the headquarter, no officers.
    pub fn for_preset(origin: VillageId, target: VillageId, preset: &Preset) -> Self {
        Self {
            start_village: origin,
            target_village: target,
            order_type: OrderType::Attack,
            units: preset.units.clone(),
            catapult_target: "headquarter".to_string(),
            officers: HashMap::new(),
            icon: 0,
        }
    }
}
