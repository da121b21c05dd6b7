//! Client struct definition
//!
//! Represents a connected client with their state and communication channels.

use tokio::sync::{mpsc, oneshot};

use crate::error::SendError;
use crate::message::{Message, CLIENT_NAME};
use crate::types::ClientId;

/// Connected client information
///
/// Holds all state related to a connected client: unique ID, display name,
/// current room, and the channels linking it to its I/O pumps.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Display name
    pub name: String,
    /// Name of the room this client is in, if any
    pub room: Option<String>,
    /// Server → Client line queue, drained by the write pump
    pub sender: mpsc::Sender<String>,
    /// Client → Server messages from the read pump, taken by the Lobby relay
    inbound: Option<mpsc::Receiver<Message>>,
    /// Stops the read pump, which closes the connection
    quit: Option<oneshot::Sender<()>>,
}

impl Client {
    /// Create a new client from its pump channels
    pub fn new(
        id: ClientId,
        sender: mpsc::Sender<String>,
        inbound: mpsc::Receiver<Message>,
        quit: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            name: CLIENT_NAME.to_string(),
            room: None,
            sender,
            inbound: Some(inbound),
            quit: Some(quit),
        }
    }

    /// Queue a line for this client
    ///
    /// Waits for room in the outbound queue. Returns an error if the
    /// write pump has stopped.
    pub async fn send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(line.into())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Get the display name for this client
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Set the client's display name
    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Take the inbound message stream (only once)
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<Message>> {
        self.inbound.take()
    }

    /// Close the connection
    ///
    /// The read pump stops and its inbound stream ends, which leads to the
    /// usual Leave. Calling it again does nothing.
    pub fn quit(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
    }
}
