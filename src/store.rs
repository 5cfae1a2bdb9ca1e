//! Key-value store client.
//!
//! A minimal RESP2 client for the Redis-compatible store the display
//! driver reads from. Commands are arrays of bulk strings:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────────┐
//! │ *<N>\r\n   │  N × ( $<len>\r\n <bytes>\r\n )              │
//! │ arg count  │  one bulk string per argument                │
//! └────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Replies are a single type-prefixed line (`+` simple, `-` error,
//! `:` integer, `$` bulk). Array replies never occur for the commands
//! this client issues and are rejected outright.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

/// Default store endpoint
pub const DEFAULT_STORE_ADDR: &str = "127.0.0.1:6379";

/// Maximum accepted bulk reply payload (1 MB)
const MAX_BULK_LEN: usize = 1024 * 1024;

/// Store client errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store closed the connection")]
    ConnectionClosed,

    #[error("timed out connecting to store at {addr}")]
    ConnectTimeout { addr: String },

    #[error("store returned an error: {0}")]
    Server(String),

    #[error("malformed reply from store: {0}")]
    Protocol(String),

    #[error("unexpected reply to {command}: {reply:?}")]
    UnexpectedReply { command: &'static str, reply: Reply },
}

/// A single parsed RESP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(String),
    Nil,
}

/// Client for the key-value store, holding the one long-lived connection.
pub struct StoreClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl StoreClient {
    /// Connect to the store.
    pub async fn connect(addr: &str) -> Result<Self, StoreError> {
        debug!(addr = %addr, "Connecting to key-value store");
        let stream = TcpStream::connect(addr).await?;
        info!(addr = %addr, "Connected to key-value store");
        Ok(Self::from_stream(stream))
    }

    /// Connect with a timeout on connection establishment.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self, StoreError> {
        match tokio::time::timeout(timeout, Self::connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::ConnectTimeout {
                addr: addr.to_string(),
            }),
        }
    }

    fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// `SET key value`, replacing any prior value.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        match self.command(&["SET", key, value]).await? {
            Reply::Simple(s) if s == "OK" => Ok(()),
            Reply::Error(e) => Err(StoreError::Server(e)),
            reply => Err(StoreError::UnexpectedReply {
                command: "SET",
                reply,
            }),
        }
    }

    /// `GET key`, `None` when the key does not exist.
    pub async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        match self.command(&["GET", key]).await? {
            Reply::Bulk(value) => Ok(Some(value)),
            Reply::Nil => Ok(None),
            Reply::Error(e) => Err(StoreError::Server(e)),
            reply => Err(StoreError::UnexpectedReply {
                command: "GET",
                reply,
            }),
        }
    }

    /// `EXPIRE key secs`, returning whether the key existed.
    pub async fn expire(&mut self, key: &str, secs: u64) -> Result<bool, StoreError> {
        let secs = secs.to_string();
        match self.command(&["EXPIRE", key, &secs]).await? {
            Reply::Integer(n) => Ok(n == 1),
            Reply::Error(e) => Err(StoreError::Server(e)),
            reply => Err(StoreError::UnexpectedReply {
                command: "EXPIRE",
                reply,
            }),
        }
    }

    /// `PING`, used as a liveness probe right after connecting.
    pub async fn ping(&mut self) -> Result<(), StoreError> {
        match self.command(&["PING"]).await? {
            Reply::Simple(s) if s == "PONG" => Ok(()),
            Reply::Error(e) => Err(StoreError::Server(e)),
            reply => Err(StoreError::UnexpectedReply {
                command: "PING",
                reply,
            }),
        }
    }

    /// Release the connection: announce `QUIT`, then shut the socket down.
    pub async fn close(mut self) -> Result<(), StoreError> {
        let frame = encode_command(&["QUIT"]);
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        debug!("Store connection closed");
        Ok(())
    }

    async fn command(&mut self, parts: &[&str]) -> Result<Reply, StoreError> {
        let frame = encode_command(parts);
        trace!(command = parts[0], frame_len = frame.len(), "Sending store command");
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        read_reply(&mut self.reader).await
    }
}

/// Encode a command as a RESP array of bulk strings.
fn encode_command(parts: &[&str]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(16 + parts.iter().map(|p| p.len() + 16).sum::<usize>());
    frame.extend_from_slice(format!("*{}\r\n", parts.len()).as_bytes());
    for part in parts {
        frame.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        frame.extend_from_slice(part.as_bytes());
        frame.extend_from_slice(b"\r\n");
    }
    frame
}

/// Read one reply from the stream.
async fn read_reply<R>(reader: &mut R) -> Result<Reply, StoreError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let Some(payload) = line.get(1..) else {
        return Err(StoreError::Protocol("empty reply line".to_string()));
    };

    match line.as_bytes()[0] {
        b'+' => Ok(Reply::Simple(payload.to_string())),
        b'-' => Ok(Reply::Error(payload.to_string())),
        b':' => payload
            .parse::<i64>()
            .map(Reply::Integer)
            .map_err(|_| StoreError::Protocol(format!("bad integer reply: {payload:?}"))),
        b'$' => {
            let len = payload
                .parse::<i64>()
                .map_err(|_| StoreError::Protocol(format!("bad bulk length: {payload:?}")))?;
            if len < 0 {
                return Ok(Reply::Nil);
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(StoreError::Protocol(format!(
                    "bulk reply too large: {len} bytes (max {MAX_BULK_LEN})"
                )));
            }

            // Payload plus the trailing CRLF
            let mut buf = vec![0u8; len + 2];
            reader.read_exact(&mut buf).await?;
            if &buf[len..] != b"\r\n" {
                return Err(StoreError::Protocol(
                    "bulk reply missing CRLF terminator".to_string(),
                ));
            }
            buf.truncate(len);
            String::from_utf8(buf)
                .map(Reply::Bulk)
                .map_err(|_| StoreError::Protocol("bulk reply is not valid UTF-8".to_string()))
        }
        b'*' => Err(StoreError::Protocol(
            "unexpected array reply".to_string(),
        )),
        other => Err(StoreError::Protocol(format!(
            "unknown reply type byte: {:?}",
            other as char
        ))),
    }
}

/// Read one CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<String, StoreError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(StoreError::ConnectionClosed);
    }
    if !line.ends_with('\n') {
        // EOF in the middle of a reply
        return Err(StoreError::ConnectionClosed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

#[cfg(test)]
pub(crate) mod testutil {
    //! In-process store speaking just enough RESP to exercise the client
    //! over a real socket.

    use std::net::SocketAddr;

    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Spawn a one-connection store. Each received command is forwarded to
    /// the returned channel; replies are popped from `script`, falling back
    /// to `+PONG` for PING and `+OK` for everything else once the script is
    /// exhausted.
    pub(crate) async fn spawn_store(
        script: Vec<String>,
    ) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut script = script.into_iter();

            while let Some(command) = read_command(&mut reader).await {
                let reply = script.next().unwrap_or_else(|| {
                    match command.first().map(String::as_str) {
                        Some("PING") => "+PONG\r\n".to_string(),
                        _ => "+OK\r\n".to_string(),
                    }
                });
                let _ = tx.send(command);
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        (addr, rx)
    }

    async fn read_command<R>(reader: &mut R) -> Option<Vec<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut header = String::new();
        if reader.read_line(&mut header).await.unwrap() == 0 {
            return None;
        }
        let argc: usize = header.trim_end()[1..].parse().unwrap();

        let mut parts = Vec::with_capacity(argc);
        for _ in 0..argc {
            let mut len_line = String::new();
            reader.read_line(&mut len_line).await.unwrap();
            let len: usize = len_line.trim_end()[1..].parse().unwrap();

            let mut buf = vec![0u8; len + 2];
            reader.read_exact(&mut buf).await.unwrap();
            buf.truncate(len);
            parts.push(String::from_utf8(buf).unwrap());
        }
        Some(parts)
    }
}
