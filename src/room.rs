//! ChatRoom struct definition
//!
//! A named group of clients sharing a broadcast history and an expiry clock.
//! Only the Lobby touches rooms, so none of this needs locking.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::client::Client;
use crate::message::{notice_room_join, notice_room_leave, NOTICE_ROOM_DELETE};
use crate::types::{ClientId, RoomId};

/// A room member's outbound queue
#[derive(Debug)]
struct Member {
    id: ClientId,
    sender: mpsc::Sender<String>,
}

/// Multi-member chat room
#[derive(Debug)]
pub struct ChatRoom {
    /// Identifier of this incarnation of the room
    pub id: RoomId,
    /// Unique room name (key in the Lobby's registry)
    pub name: String,
    /// Members in join order
    members: Vec<Member>,
    /// Every line broadcast so far, in order
    history: Vec<String>,
    /// `now + ttl` at the most recent activity
    expiry: Instant,
    ttl: Duration,
}

impl ChatRoom {
    /// Create an empty room expiring `ttl` from now
    pub fn new(name: String, ttl: Duration) -> Self {
        Self {
            id: RoomId::new(),
            name,
            members: Vec::new(),
            history: Vec::new(),
            expiry: Instant::now() + ttl,
            ttl,
        }
    }

    /// Add a client to the room
    ///
    /// The full history is replayed to the client before it becomes a
    /// member, then everyone (the newcomer included) gets the join notice.
    pub async fn join(&mut self, client: &mut Client) {
        client.room = Some(self.name.clone());
        for line in &self.history {
            if client.send(line.as_str()).await.is_err() {
                debug!("Client {} closed during history replay", client.id);
                break;
            }
        }
        self.members.push(Member {
            id: client.id,
            sender: client.sender.clone(),
        });
        self.broadcast(notice_room_join(client.display_name())).await;
    }

    /// Remove a client from the room
    ///
    /// The departure notice goes out before removal, so the leaving
    /// client sees it too.
    pub async fn leave(&mut self, client: &mut Client) {
        self.broadcast(notice_room_leave(client.display_name())).await;
        if let Some(index) = self.members.iter().position(|m| m.id == client.id) {
            self.members.remove(index);
        }
        client.room = None;
    }

    /// Send a line to every member and record it
    ///
    /// Resets the expiry clock. Waits until every member's queue accepts
    /// the line; members whose write pump is gone are skipped.
    pub async fn broadcast(&mut self, line: String) {
        self.expiry = Instant::now() + self.ttl;
        self.history.push(line.clone());
        for member in &self.members {
            if member.sender.send(line.clone()).await.is_err() {
                debug!("Dropped line for closed client {} in {}", member.id, self.name);
            }
        }
    }

    /// Announce deletion and empty the room
    ///
    /// Returns the ids of the evicted members so the Lobby can clear their
    /// room reference.
    pub async fn close(&mut self) -> Vec<ClientId> {
        self.broadcast(NOTICE_ROOM_DELETE.to_string()).await;
        self.members.drain(..).map(|m| m.id).collect()
    }

    /// Check if a client is a member
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.iter().any(|m| m.id == client_id)
    }

    /// Member ids in join order
    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.iter().map(|m| m.id).collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    /// True once `now` has reached the expiry instant
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry <= now
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;
    use crate::message::Message;

    const TTL: Duration = Duration::from_secs(60);

    struct TestClient {
        client: Client,
        rx: mpsc::Receiver<String>,
        _inbound: mpsc::Sender<Message>,
        _quit: oneshot::Receiver<()>,
    }

    fn test_client(name: &str) -> TestClient {
        let (tx, rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(8);
        let (quit_tx, quit_rx) = oneshot::channel();
        let mut client = Client::new(ClientId::new(), tx, in_rx, quit_tx);
        client.set_name(name.to_string());
        TestClient {
            client,
            rx,
            _inbound: in_tx,
            _quit: quit_rx,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_room_creation() {
        let room = ChatRoom::new("geral".to_string(), TTL);

        assert_eq!(room.name, "geral");
        assert_eq!(room.member_count(), 0);
        assert!(room.history().is_empty());
        assert!(!room.is_expired(Instant::now()));
    }

    #[tokio::test]
    async fn test_join_sets_room_and_notifies() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let mut ana = test_client("Ana");

        room.join(&mut ana.client).await;

        assert!(room.contains(ana.client.id));
        assert_eq!(ana.client.room.as_deref(), Some("geral"));
        assert_eq!(drain(&mut ana.rx), vec![notice_room_join("Ana")]);
    }

    #[tokio::test]
    async fn test_join_replays_history_in_order() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        room.broadcast("m1\n".to_string()).await;
        room.broadcast("m2\n".to_string()).await;

        let mut bia = test_client("Bia");
        room.join(&mut bia.client).await;
        room.broadcast("m3\n".to_string()).await;

        assert_eq!(
            drain(&mut bia.rx),
            vec![
                "m1\n".to_string(),
                "m2\n".to_string(),
                notice_room_join("Bia"),
                "m3\n".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_broadcast_reaches_members_and_history() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let mut ana = test_client("Ana");
        let mut bia = test_client("Bia");
        room.join(&mut ana.client).await;
        room.join(&mut bia.client).await;
        drain(&mut ana.rx);
        drain(&mut bia.rx);

        room.broadcast("3:04PM - Ana: hi\n".to_string()).await;

        assert_eq!(drain(&mut ana.rx), vec!["3:04PM - Ana: hi\n".to_string()]);
        assert_eq!(drain(&mut bia.rx), vec!["3:04PM - Ana: hi\n".to_string()]);
        assert_eq!(room.history().last().map(String::as_str), Some("3:04PM - Ana: hi\n"));
    }

    #[tokio::test]
    async fn test_leave_notifies_leaver_and_clears_room() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let mut ana = test_client("Ana");
        let mut bia = test_client("Bia");
        room.join(&mut ana.client).await;
        room.join(&mut bia.client).await;
        drain(&mut ana.rx);
        drain(&mut bia.rx);

        room.leave(&mut ana.client).await;

        assert!(!room.contains(ana.client.id));
        assert!(ana.client.room.is_none());
        assert_eq!(room.member_ids(), vec![bia.client.id]);
        assert_eq!(drain(&mut ana.rx), vec![notice_room_leave("Ana")]);
        assert_eq!(drain(&mut bia.rx), vec![notice_room_leave("Ana")]);
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_member() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let mut ana = test_client("Ana");
        let mut bia = test_client("Bia");
        room.join(&mut ana.client).await;
        room.join(&mut bia.client).await;
        drain(&mut bia.rx);
        drop(ana.rx);

        room.broadcast("oi\n".to_string()).await;

        assert_eq!(drain(&mut bia.rx), vec!["oi\n".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_resets_expiry() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let created = room.expiry();

        tokio::time::advance(Duration::from_secs(30)).await;
        room.broadcast("oi\n".to_string()).await;

        assert_eq!(room.expiry(), created + Duration::from_secs(30));
        assert!(!room.is_expired(created));
        assert!(room.is_expired(room.expiry()));
    }

    #[tokio::test]
    async fn test_close_evicts_everyone() {
        let mut room = ChatRoom::new("geral".to_string(), TTL);
        let mut ana = test_client("Ana");
        room.join(&mut ana.client).await;
        drain(&mut ana.rx);

        let evicted = room.close().await;

        assert_eq!(evicted, vec![ana.client.id]);
        assert_eq!(room.member_count(), 0);
        assert_eq!(drain(&mut ana.rx), vec![NOTICE_ROOM_DELETE.to_string()]);
    }
}
