//! Wire protocol of the game's socket channel.
//!
//! Requests are JSON envelopes `{type, id, data}`; the server echoes the id
//! on the matching response. Envelopes without an id are server-push
//! notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::notifications::GameNotification;
use crate::types::{Command, Group, MapVillage, Preset, PlayerId, UnitCounts, Village, VillageId, GroupId};

pub mod routes {
    pub const CHARACTER_INFO: &str = "Character/getInfo";
    pub const GROUP_LIST: &str = "Group/getGroups";
    pub const GROUP_VILLAGES: &str = "Group/getVillagesForGroup";
    pub const PRESET_LIST: &str = "ArmyPreset/getForCharacter";
    pub const MAP_VILLAGES: &str = "Map/getVillagesByArea";
    pub const OWN_COMMANDS: &str = "Command/getOwnCommands";
    pub const UNIT_INFO: &str = "Village/getUnitInfo";
    pub const SEND_CUSTOM_ARMY: &str = "Command/sendCustomArmy";
    pub const ATTACKING_FACTOR: &str = "Command/getAttackingFactor";
    pub const SHOP_OFFERS: &str = "Premium/listShopOffers";
}

pub mod pushes {
    pub const COMMAND_SENT: &str = "Command/sent";
    pub const PRESET_CHANGED: &str = "ArmyPreset/changed";
    pub const PRESET_DELETED: &str = "ArmyPreset/deleted";
    pub const GROUP_CHANGED: &str = "Group/changed";
    pub const GROUP_CREATED: &str = "Group/created";
    pub const GROUP_DESTROYED: &str = "Group/destroyed";
    pub const GROUP_VILLAGE_LINKED: &str = "Group/villageLinked";
    pub const GROUP_VILLAGE_UNLINKED: &str = "Group/villageUnlinked";
}

#[derive(Debug, Serialize)]
pub struct ClientEnvelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub route: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub data: Value,
}

impl ServerEnvelope {
    pub fn is_exception(&self) -> bool {
        self.kind.starts_with("Exception/")
    }
}

// ---- request bodies ----

#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
pub struct VillageIdRequest {
    pub village_id: VillageId,
}

#[derive(Debug, Serialize)]
pub struct GroupIdRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Serialize)]
pub struct TargetIdRequest {
    pub target_id: VillageId,
}

// ---- response bodies ----

#[derive(Debug, Deserialize)]
pub struct CharacterInfoResponse {
    pub character_id: PlayerId,
    pub villages: Vec<Village>,
}

#[derive(Debug, Deserialize)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
pub struct GroupVillagesResponse {
    pub village_ids: Vec<VillageId>,
}

#[derive(Debug, Deserialize)]
pub struct PresetListResponse {
    pub presets: Vec<Preset>,
}

#[derive(Debug, Deserialize)]
pub struct MapVillagesResponse {
    pub villages: Vec<MapVillage>,
}

#[derive(Debug, Deserialize)]
pub struct OwnCommandsResponse {
    pub commands: Vec<Command>,
}

#[derive(Debug, Deserialize)]
pub struct UnitInfoResponse {
    pub available_units: UnitCounts,
}

// ---- push bodies ----

#[derive(Debug, Deserialize)]
struct TargetRef {
    id: VillageId,
}

#[derive(Debug, Deserialize)]
struct CommandSentPush {
    target: TargetRef,
}

#[derive(Debug, Deserialize)]
struct GroupLinkPush {
    group_id: GroupId,
}

/// Decode a server-push envelope into a notification. Unknown kinds and
/// undecodable payloads yield `None`.
pub fn decode_push(envelope: &ServerEnvelope) -> Option<GameNotification> {
    match envelope.kind.as_str() {
        pushes::COMMAND_SENT => {
            let push: CommandSentPush = serde_json::from_value(envelope.data.clone()).ok()?;
            Some(GameNotification::CommandAcknowledged {
                target_id: push.target.id,
            })
        }
        pushes::PRESET_CHANGED | pushes::PRESET_DELETED => {
            Some(GameNotification::PresetCatalogChanged)
        }
        pushes::GROUP_CHANGED | pushes::GROUP_CREATED | pushes::GROUP_DESTROYED => {
            Some(GameNotification::GroupMembershipChanged)
        }
        pushes::GROUP_VILLAGE_LINKED => {
            let push: GroupLinkPush = serde_json::from_value(envelope.data.clone()).ok()?;
            Some(GameNotification::VillageGroupLinked {
                group_id: push.group_id,
            })
        }
        pushes::GROUP_VILLAGE_UNLINKED => {
            let push: GroupLinkPush = serde_json::from_value(envelope.data.clone()).ok()?;
            Some(GameNotification::VillageGroupUnlinked {
                group_id: push.group_id,
            })
        }
        _ => None,
    }
}
