//! TCP connection handler
//!
//! Turns a connection into a `Client`: a read pump feeding parsed lines
//! to the Lobby and a write pump draining the client's outbound queue.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::Client;
use crate::config::CLIENT_BUFFER_SIZE;
use crate::error::AppError;
use crate::lobby::LobbyHandle;
use crate::message::Message;
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Starts the I/O pumps and hands the client to the Lobby. The pumps keep
/// running on their own after this returns.
pub async fn handle_connection(stream: TcpStream, lobby: LobbyHandle) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (reader, writer) = stream.into_split();
    let client = spawn_client(reader, writer);

    info!("Client {} connected from {}", client.id, peer_addr);

    lobby.join(client).await
}

/// Start the read and write pumps for a connection
pub fn spawn_client<R, W>(reader: R, writer: W) -> Client
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client_id = ClientId::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(CLIENT_BUFFER_SIZE);
    let (outbound_tx, outbound_rx) = mpsc::channel(CLIENT_BUFFER_SIZE);
    let (quit_tx, quit_rx) = oneshot::channel();

    tokio::spawn(read_pump(client_id, reader, inbound_tx, quit_rx));
    tokio::spawn(write_pump(client_id, writer, outbound_rx));

    Client::new(client_id, outbound_tx, inbound_rx, quit_tx)
}

/// Read lines until EOF, a read error, or a quit request
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the
/// connection. A final line without a terminator is still delivered.
///
/// Dropping `inbound` on exit ends the client's message stream, which is
/// what eventually removes it from the Lobby.
async fn read_pump<R>(
    client_id: ClientId,
    reader: R,
    inbound: mpsc::Sender<Message>,
    mut quit: oneshot::Receiver<()>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    debug!("Client {} closed the connection", client_id);
                    break;
                }
                Ok(_) => {
                    let text = decode_line(&buf);
                    buf.clear();
                    if inbound.send(Message::new(client_id, text)).await.is_err() {
                        debug!("Inbound stream closed for {}", client_id);
                        break;
                    }
                }
                Err(e) => {
                    debug!("Read error for {}: {}", client_id, e);
                    break;
                }
            },
            _ = &mut quit => {
                debug!("Client {} quit", client_id);
                break;
            }
        }
    }

    debug!("Read pump ended for {}", client_id);
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Write queued lines until the queue closes or a write fails
async fn write_pump<W>(client_id: ClientId, writer: W, mut outbound: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);

    while let Some(line) = outbound.recv().await {
        if let Err(e) = write_line(&mut writer, &line).await {
            debug!("Write error for {}: {}", client_id, e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!("Write pump ended for {}", client_id);
}

async fn write_line<W>(writer: &mut BufWriter<W>, line: &str) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt};

    use super::*;

    #[tokio::test]
    async fn test_read_pump_strips_terminators() {
        let (server, mut remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let mut client = spawn_client(reader, writer);
        let mut inbound = client.take_inbound().unwrap();

        remote.write_all(b"oi\n/criar geral\r\n").await.unwrap();

        let first = inbound.recv().await.unwrap();
        assert_eq!(first.text, "oi");
        assert_eq!(first.client_id, client.id);
        assert_eq!(inbound.recv().await.unwrap().text, "/criar geral");
    }

    #[tokio::test]
    async fn test_read_pump_survives_invalid_utf8() {
        let (server, mut remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let mut client = spawn_client(reader, writer);
        let mut inbound = client.take_inbound().unwrap();

        remote.write_all(b"a\xe7\xe3o\nsegunda\n").await.unwrap();

        assert_eq!(inbound.recv().await.unwrap().text, "a\u{FFFD}\u{FFFD}o");
        assert_eq!(inbound.recv().await.unwrap().text, "segunda");
    }

    #[tokio::test]
    async fn test_read_pump_delivers_unterminated_last_line() {
        let (server, mut remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let mut client = spawn_client(reader, writer);
        let mut inbound = client.take_inbound().unwrap();

        remote.write_all(b"tchau").await.unwrap();
        drop(remote);

        assert_eq!(inbound.recv().await.unwrap().text, "tchau");
        assert!(inbound.recv().await.is_none());
    }

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"oi\r\n"), "oi");
        assert_eq!(decode_line(b"oi\n"), "oi");
        assert_eq!(decode_line(b"oi"), "oi");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[tokio::test]
    async fn test_read_pump_ends_on_eof() {
        let (server, remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let mut client = spawn_client(reader, writer);
        let mut inbound = client.take_inbound().unwrap();

        drop(remote);

        assert!(inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_quit_ends_inbound_stream() {
        let (server, _remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let mut client = spawn_client(reader, writer);
        let mut inbound = client.take_inbound().unwrap();

        client.quit();

        assert!(inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_write_pump_drains_then_closes() {
        let (server, mut remote) = duplex(1024);
        let (reader, writer) = tokio::io::split(server);
        let client = spawn_client(reader, writer);

        client.send("linha 1\n").await.unwrap();
        client.send("linha 2\n").await.unwrap();
        drop(client);

        let mut received = String::new();
        remote.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "linha 1\nlinha 2\n");
    }
}
