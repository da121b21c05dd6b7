//! Multi-room chat server - Entry Point
//!
//! Starts the TCP listener and the Lobby actor, accepting connections.

use std::env;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_lobby::{handle_connection, Config, Lobby};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_lobby=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_lobby=info")),
        )
        .init();

    let config = Config::from_args(env::args().skip(1));

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat server listening on {}", config.addr);

    let (lobby, handle) = Lobby::new(&config);
    tokio::spawn(lobby.run());

    info!(
        "Lobby started (max {} clients, room TTL {:?})",
        config.max_clients, config.room_ttl
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let handle = handle.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, handle).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
