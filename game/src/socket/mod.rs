//! WebSocket session with the game server.
//!
//! A single socket carries both directions of traffic: every outbound
//! request gets a UUID and a reader task resolves the matching response
//! through an id-keyed correlation map of oneshot channels; envelopes
//! without an id are decoded as server pushes and fanned out on a broadcast
//! channel. Every round-trip is bounded by a request timeout so a dropped
//! response surfaces as a typed error instead of a silent stall.

pub mod protocol;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::GameError;
use crate::notifications::GameNotification;
use crate::services::{
    CommandService, GameResult, GroupDirectory, PlayerDirectory, PresetDirectory,
    NotificationSource,
};
use crate::types::{
    AttackOrder, Command, Group, GroupId, MapRegion, MapVillage, PlayerId, Preset, UnitCounts,
    Village, VillageId,
};

use protocol::{
    CharacterInfoResponse, ClientEnvelope, Empty, GroupIdRequest, GroupListResponse,
    GroupVillagesResponse, MapVillagesResponse, OwnCommandsResponse, PresetListResponse,
    ServerEnvelope, TargetIdRequest, UnitInfoResponse, VillageIdRequest, routes,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSIENT_RETRY_LIMIT: u32 = 5;
const PUSH_BUFFER: usize = 64;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<ServerEnvelope>>>>;

pub struct SocketClient {
    character_id: PlayerId,
    write: Mutex<WsSink>,
    pending: PendingMap,
    pushes: broadcast::Sender<GameNotification>,
    reader: JoinHandle<()>,
}

impl SocketClient {
    pub async fn connect(url: &str, character_id: PlayerId) -> GameResult<Arc<Self>> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| GameError::Transport(e.to_string()))?;
        let (write, read) = ws.split();

        let pending: PendingMap = Arc::default();
        let (push_tx, _) = broadcast::channel(PUSH_BUFFER);

        let reader = tokio::spawn(read_loop(read, pending.clone(), push_tx.clone()));

        Ok(Arc::new(Self {
            character_id,
            write: Mutex::new(write),
            pending,
            pushes: push_tx,
            reader,
        }))
    }

    async fn request<T, R>(&self, route: &str, data: T) -> GameResult<R>
    where
        T: Serialize + Send,
        R: DeserializeOwned,
    {
        let envelope = self.round_trip(route, data).await?;

        if envelope.is_exception() {
            return Err(GameError::Server(envelope.kind));
        }

        Ok(serde_json::from_value(envelope.data)?)
    }

    async fn round_trip<T: Serialize + Send>(
        &self,
        route: &str,
        data: T,
    ) -> GameResult<ServerEnvelope> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.send(route, Some(id), data).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(_)) => Err(GameError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(GameError::Timeout(REQUEST_TIMEOUT))
            }
        }
    }

    /// Send with no response expected.
    async fn fire<T: Serialize + Send>(&self, route: &str, data: T) -> GameResult<()> {
        self.send(route, None, data).await
    }

    async fn send<T: Serialize + Send>(
        &self,
        route: &str,
        id: Option<Uuid>,
        data: T,
    ) -> GameResult<()> {
        let envelope = ClientEnvelope { route, id, data };
        let text = serde_json::to_string(&envelope)?;

        self.write
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| GameError::Transport(e.to_string()))
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut read: WsSource,
    pending: PendingMap,
    pushes: broadcast::Sender<GameNotification>,
) {
    while let Some(frame) = read.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "socket read failed");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let envelope: ServerEnvelope = match serde_json::from_str(text.as_str()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "undecodable frame");
                continue;
            }
        };

        match envelope.id {
            Some(id) => {
                if let Some(waiter) = pending.lock().await.remove(&id) {
                    let _ = waiter.send(envelope);
                } else {
                    debug!(%id, kind = %envelope.kind, "response with no waiter");
                }
            }
            None => {
                if let Some(push) = protocol::decode_push(&envelope) {
                    let _ = pushes.send(push);
                }
            }
        }
    }

    // Connection gone: dropping the senders wakes every waiter with an error.
    pending.lock().await.clear();
}

#[async_trait]
impl PlayerDirectory for SocketClient {
    fn player_id(&self) -> PlayerId {
        self.character_id
    }

    async fn village_list(&self) -> GameResult<Vec<Village>> {
        let info: CharacterInfoResponse = self.request(routes::CHARACTER_INFO, Empty {}).await?;

        Ok(info.villages)
    }
}

#[async_trait]
impl GroupDirectory for SocketClient {
    async fn groups(&self) -> GameResult<HashMap<GroupId, Group>> {
        let list: GroupListResponse = self.request(routes::GROUP_LIST, Empty {}).await?;

        Ok(list.groups.into_iter().map(|g| (g.id, g)).collect())
    }

    async fn group_village_ids(&self, group: GroupId) -> GameResult<HashSet<VillageId>> {
        let response: GroupVillagesResponse = self
            .request(routes::GROUP_VILLAGES, GroupIdRequest { group_id: group })
            .await?;

        Ok(response.village_ids.into_iter().collect())
    }
}

#[async_trait]
impl PresetDirectory for SocketClient {
    async fn presets(&self) -> GameResult<Vec<Preset>> {
        let list: PresetListResponse = self.request(routes::PRESET_LIST, Empty {}).await?;

        Ok(list.presets)
    }
}

#[async_trait]
impl CommandService for SocketClient {
    async fn locate_villages_in_region(&self, region: MapRegion) -> GameResult<Vec<MapVillage>> {
        let response: MapVillagesResponse = self.request(routes::MAP_VILLAGES, region).await?;

        Ok(response.villages)
    }

    async fn outstanding_commands(&self, village: VillageId) -> GameResult<Vec<Command>> {
        for attempt in 1..=TRANSIENT_RETRY_LIMIT {
            let result: GameResult<OwnCommandsResponse> = self
                .request(routes::OWN_COMMANDS, VillageIdRequest { village_id: village })
                .await;

            match result {
                Ok(response) => return Ok(response.commands),
                Err(e) if e.is_transient() => {
                    warn!(village, attempt, "transient server exception on command listing");
                }
                Err(e) => return Err(e),
            }
        }

        Err(GameError::TransientRetriesExhausted {
            attempts: TRANSIENT_RETRY_LIMIT,
        })
    }

    async fn unit_inventory(&self, village: VillageId) -> GameResult<UnitCounts> {
        let response: UnitInfoResponse = self
            .request(routes::UNIT_INFO, VillageIdRequest { village_id: village })
            .await?;

        Ok(response.available_units)
    }

    async fn dispatch_attack(&self, order: AttackOrder) -> GameResult<()> {
        self.fire(routes::SEND_CUSTOM_ARMY, order).await
    }

    async fn attacking_factor(&self, target: VillageId) -> GameResult<()> {
        self.fire(routes::ATTACKING_FACTOR, TargetIdRequest { target_id: target })
            .await
    }

    async fn shop_offers(&self) -> GameResult<()> {
        self.fire(routes::SHOP_OFFERS, Empty {}).await
    }
}

impl NotificationSource for SocketClient {
    fn subscribe(&self) -> broadcast::Receiver<GameNotification> {
        self.pushes.subscribe()
    }
}
