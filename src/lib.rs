//! Multi-room line chat server library
//!
//! Clients connect over TCP, send one line at a time, and can create,
//! list, join and leave named rooms. Rooms keep their history for late
//! joiners and are deleted after a period without activity.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Lobby` is the central actor owning every client and room
//! - Each connection has a read pump, a write pump and a relay task
//!   forwarding its lines into the Lobby
//! - Room expiry runs on timer tasks that report back to the Lobby
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_lobby::{handle_connection, Config, Lobby};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     let (lobby, handle) = Lobby::new(&config);
//!
//!     tokio::spawn(lobby.run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, handle.clone()));
//!     }
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod lobby;
pub mod message;
pub mod room;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::Command;
pub use config::Config;
pub use error::{AppError, SendError, UserError};
pub use handler::{handle_connection, spawn_client};
pub use lobby::{Lobby, LobbyHandle};
pub use message::Message;
pub use room::ChatRoom;
pub use types::{ClientId, RoomId};
