//! Server configuration
//!
//! Fixed defaults; only the listen address can be overridden
//! (first command line argument).

use std::time::Duration;

/// Default server address
pub const DEFAULT_ADDR: &str = "0.0.0.0:3333";

/// Maximum number of concurrently connected clients
pub const MAX_CLIENTS: usize = 10;

/// Inactivity period after which a room is deleted
pub const ROOM_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Channel buffer size for the Lobby's coordination channels
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Channel buffer size for each client's inbound and outbound queues
pub const CLIENT_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to
    pub addr: String,
    /// Connections beyond this count are rejected
    pub max_clients: usize,
    /// Room time-to-live after the last activity
    pub room_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_clients: MAX_CLIENTS,
            room_ttl: ROOM_TTL,
        }
    }
}

impl Config {
    /// Build a config from command line arguments (program name excluded)
    pub fn from_args<I>(mut args: I) -> Self
    where
        I: Iterator<Item = String>,
    {
        let mut config = Self::default();
        if let Some(addr) = args.next() {
            config.addr = addr;
        }
        config
    }
}
