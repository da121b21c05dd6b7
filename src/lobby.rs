//! Lobby actor implementation
//!
//! The central actor that owns every client and room. All other tasks talk
//! to it through four channels (incoming messages, joins, leaves and room
//! expiry checks) and one event loop applies the resulting transitions one
//! at a time.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::command::Command;
use crate::config::{Config, CHANNEL_BUFFER_SIZE};
use crate::error::{AppError, UserError};
use crate::message::{
    notice_personal_create, notice_personal_rename, notice_room_rename, Message, HELP_LINES,
    MSG_CONNECT, MSG_FULL, ROOM_LIST_HEADER,
};
use crate::room::ChatRoom;
use crate::types::{ClientId, RoomId};

/// A scheduled request to check whether a room has expired
#[derive(Debug, Clone)]
pub struct ExpiryCheck {
    pub name: String,
    pub room_id: RoomId,
}

/// Sending side of the Lobby's coordination channels
#[derive(Debug, Clone)]
pub struct LobbyHandle {
    incoming: mpsc::Sender<Message>,
    joins: mpsc::Sender<Client>,
    leaves: mpsc::Sender<ClientId>,
    expiries: mpsc::Sender<ExpiryCheck>,
}

impl LobbyHandle {
    /// Hand a freshly connected client to the Lobby
    pub async fn join(&self, client: Client) -> Result<(), AppError> {
        self.joins
            .send(client)
            .await
            .map_err(|_| AppError::LobbyClosed)
    }

    /// Ask the Lobby to remove a client
    pub async fn leave(&self, client_id: ClientId) -> Result<(), AppError> {
        self.leaves
            .send(client_id)
            .await
            .map_err(|_| AppError::LobbyClosed)
    }

    /// Forward a client's message to the Lobby
    pub async fn send_message(&self, message: Message) -> Result<(), AppError> {
        self.incoming
            .send(message)
            .await
            .map_err(|_| AppError::LobbyClosed)
    }

    async fn check_expiry(&self, check: ExpiryCheck) -> Result<(), AppError> {
        self.expiries
            .send(check)
            .await
            .map_err(|_| AppError::LobbyClosed)
    }
}

/// The coordinating actor
///
/// Single writer of the client registry and the room registry.
pub struct Lobby {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All rooms: name -> ChatRoom
    rooms: HashMap<String, ChatRoom>,
    max_clients: usize,
    room_ttl: Duration,
    /// Used by relays and expiry timers spawned from the loop
    handle: LobbyHandle,
    incoming: mpsc::Receiver<Message>,
    joins: mpsc::Receiver<Client>,
    leaves: mpsc::Receiver<ClientId>,
    expiries: mpsc::Receiver<ExpiryCheck>,
}

impl Lobby {
    /// Create a Lobby and the handle used to reach it
    pub fn new(config: &Config) -> (Self, LobbyHandle) {
        let (incoming_tx, incoming) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (joins_tx, joins) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (leaves_tx, leaves) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (expiries_tx, expiries) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let handle = LobbyHandle {
            incoming: incoming_tx,
            joins: joins_tx,
            leaves: leaves_tx,
            expiries: expiries_tx,
        };

        let lobby = Self {
            clients: HashMap::with_capacity(config.max_clients),
            rooms: HashMap::new(),
            max_clients: config.max_clients,
            room_ttl: config.room_ttl,
            handle: handle.clone(),
            incoming,
            joins,
            leaves,
            expiries,
        };

        (lobby, handle)
    }

    /// Run the Lobby event loop
    ///
    /// Waits on all four channels and handles whichever event arrives
    /// first. Runs for the lifetime of the process.
    pub async fn run(mut self) {
        info!("Lobby started");

        loop {
            tokio::select! {
                Some(message) = self.incoming.recv() => {
                    self.handle_message(message).await;
                }
                Some(client) = self.joins.recv() => {
                    self.handle_join(client).await;
                }
                Some(client_id) = self.leaves.recv() => {
                    self.handle_leave(client_id).await;
                }
                Some(check) = self.expiries.recv() => {
                    self.handle_expiry_check(check).await;
                }
                else => break,
            }
        }

        info!("Lobby shutting down");
    }

    /// Register a new client, or turn it away when full
    async fn handle_join(&mut self, mut client: Client) {
        if self.clients.len() >= self.max_clients {
            warn!(
                "Lobby full ({} clients), rejecting {}",
                self.clients.len(),
                client.id
            );
            let _ = client.send(MSG_FULL).await;
            client.quit();
            return;
        }

        let client_id = client.id;
        let inbound = client.take_inbound();
        let _ = client.send(MSG_CONNECT).await;
        self.clients.insert(client_id, client);

        if let Some(inbound) = inbound {
            self.spawn_relay(client_id, inbound);
        }

        info!("Client {} joined the lobby", client_id);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Forward a client's messages into the Lobby until its stream ends,
    /// then request its Leave
    fn spawn_relay(&self, client_id: ClientId, mut inbound: mpsc::Receiver<Message>) {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                if handle.send_message(message).await.is_err() {
                    break;
                }
            }
            debug!("Relay ended for {}", client_id);
            let _ = handle.leave(client_id).await;
        });
    }

    /// Remove a client from its room and the registry
    ///
    /// Dropping the client closes its outbound queue, so the write pump
    /// exits once it has flushed what is left.
    async fn handle_leave(&mut self, client_id: ClientId) {
        // The relay only requests Leave after queueing the client's last
        // line; those lines must be handled while the client is registered.
        while let Ok(message) = self.incoming.try_recv() {
            self.handle_message(message).await;
        }

        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        if let Some(room_name) = client.room.clone() {
            match self.rooms.get_mut(&room_name) {
                Some(room) => room.leave(client).await,
                None => client.room = None,
            }
        }

        self.clients.remove(&client_id);

        info!("Client {} left the lobby", client_id);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Route one line of client input
    async fn handle_message(&mut self, message: Message) {
        let client_id = message.client_id;
        if !self.clients.contains_key(&client_id) {
            debug!("Ignoring message from unknown client {}", client_id);
            return;
        }

        match Command::parse(&message.text) {
            Command::CreateRoom(name) => self.handle_create_room(client_id, name).await,
            Command::ListRooms => self.handle_list_rooms(client_id).await,
            Command::JoinRoom(name) => self.handle_join_room(client_id, name).await,
            Command::LeaveRoom => self.handle_leave_room(client_id).await,
            Command::Rename(name) => self.handle_rename(client_id, name).await,
            Command::Help => self.handle_help(client_id).await,
            Command::Quit => self.handle_quit(client_id),
            Command::Content(_) => self.handle_send(message).await,
        }
    }

    /// Broadcast chat content to the sender's room
    async fn handle_send(&mut self, message: Message) {
        let Some(client) = self.clients.get(&message.client_id) else {
            return;
        };

        let room = match &client.room {
            Some(name) => self.rooms.get_mut(name),
            None => None,
        };
        let Some(room) = room else {
            let _ = client.send(UserError::NotInRoom).await;
            debug!("Client {} sent a message outside a room", client.id);
            return;
        };

        let line = message.format(client.display_name());
        room.broadcast(line).await;
        debug!("Client {} sent a message to {}", client.id, room.name);
    }

    /// Handle room creation
    ///
    /// The creator is not joined to the new room.
    async fn handle_create_room(&mut self, client_id: ClientId, name: String) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        if self.rooms.contains_key(&name) {
            let _ = client.send(UserError::RoomExists(name)).await;
            return;
        }

        let room = ChatRoom::new(name.clone(), self.room_ttl);
        self.schedule_expiry_check(
            ExpiryCheck {
                name: name.clone(),
                room_id: room.id,
            },
            self.room_ttl,
        );
        self.rooms.insert(name.clone(), room);

        info!("Client {} created room {}", client_id, name);

        let _ = client.send(notice_personal_create(&name)).await;
    }

    /// Handle room joining
    ///
    /// A client in another room leaves it first.
    async fn handle_join_room(&mut self, client_id: ClientId, name: String) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        if !self.rooms.contains_key(&name) {
            let _ = client.send(UserError::RoomNotFound(name)).await;
            return;
        }

        if let Some(current) = client.room.clone() {
            match self.rooms.get_mut(&current) {
                Some(room) => room.leave(client).await,
                None => client.room = None,
            }
        }

        if let Some(room) = self.rooms.get_mut(&name) {
            room.join(client).await;
            info!(
                "Client {} joined room {} ({} members)",
                client_id,
                name,
                room.member_count()
            );
        }
    }

    /// Handle voluntary room leaving
    async fn handle_leave_room(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        let room = match &client.room {
            Some(name) => self.rooms.get_mut(name),
            None => None,
        };
        let Some(room) = room else {
            client.room = None;
            let _ = client.send(UserError::CannotLeave).await;
            return;
        };

        room.leave(client).await;
        info!("Client {} left room {}", client_id, room.name);
    }

    /// Handle display name change
    async fn handle_rename(&mut self, client_id: ClientId, name: String) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };

        let room = match &client.room {
            Some(room_name) => self.rooms.get_mut(room_name),
            None => None,
        };
        match room {
            Some(room) => {
                room.broadcast(notice_room_rename(client.display_name(), &name))
                    .await;
            }
            None => {
                let _ = client.send(notice_personal_rename(&name)).await;
            }
        }

        info!("Client {} renamed '{}' -> '{}'", client_id, client.name, name);
        client.set_name(name);
    }

    /// Send the sorted room list to one client
    async fn handle_list_rooms(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        let mut names: Vec<&String> = self.rooms.keys().collect();
        names.sort();

        let _ = client.send("\n").await;
        let _ = client.send(ROOM_LIST_HEADER).await;
        for name in names {
            let _ = client.send(format!("{}\n", name)).await;
        }
        let _ = client.send("\n").await;
    }

    async fn handle_help(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        for line in HELP_LINES {
            let _ = client.send(*line).await;
        }
    }

    /// Close the client's connection; its Leave follows through the relay
    fn handle_quit(&mut self, client_id: ClientId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            debug!("Client {} asked to quit", client_id);
            client.quit();
        }
    }

    /// Delete a room if it has been idle for its whole TTL
    ///
    /// Recent activity means the expiry moved forward; in that case the
    /// check is rescheduled for the time still remaining.
    async fn handle_expiry_check(&mut self, check: ExpiryCheck) {
        let Some(room) = self.rooms.get(&check.name) else {
            debug!("Expiry check for missing room {}", check.name);
            return;
        };

        if room.id != check.room_id {
            debug!("Stale expiry check for room {}", check.name);
            return;
        }

        let now = Instant::now();
        if !room.is_expired(now) {
            let remaining = room.expiry() - now;
            debug!("Room {} still active, next check in {:?}", check.name, remaining);
            self.schedule_expiry_check(check, remaining);
            return;
        }

        let Some(mut room) = self.rooms.remove(&check.name) else {
            return;
        };

        for client_id in room.close().await {
            if let Some(client) = self.clients.get_mut(&client_id) {
                client.room = None;
            }
        }

        info!("Room {} deleted (inactive)", room.name);
    }

    fn schedule_expiry_check(&self, check: ExpiryCheck, delay: Duration) {
        let handle = self.handle.clone();
        let deadline = Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = handle.check_expiry(check).await;
        });
    }
}
