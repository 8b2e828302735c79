//! Line-delimited JSON transport to the application's test endpoint
//!
//! Each request is one JSON object on its own line tagged with an id; the
//! endpoint answers with `{"id": n, "result": ...}` or
//! `{"id": n, "error": {"class": ..., "desc": ...}}`. Lines carrying an
//! `"event"` key are notifications and are skipped while waiting for a reply.
//! A reply that arrives after its exchange timed out is read and dropped by
//! the next exchange.

use async_trait::async_trait;
use filesapp_harness_common::{Endpoint, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::call::Request;

/// Anything that can carry one request to the remote application and bring
/// back its result.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: Request) -> Result<Value>;
}

/// Exception reported by the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFault {
    #[serde(default = "default_fault_class")]
    pub class: String,
    #[serde(default)]
    pub desc: String,
}

fn default_fault_class() -> String {
    "Error".to_string()
}

impl RemoteFault {
    pub fn new(class: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            desc: desc.into(),
        }
    }
}

impl From<RemoteFault> for Error {
    fn from(fault: RemoteFault) -> Self {
        Error::Remote {
            class: fault.class,
            desc: fault.desc,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a Request,
}

/// Newline-delimited JSON over a byte stream
pub struct LineTransport<S> {
    peer: String,
    conn: Mutex<Connection<S>>,
    next_id: AtomicU64,
    io_timeout: Option<Duration>,
}

/// Stream plus the bytes of a reply line not yet terminated.
///
/// The partial line outlives a timed-out exchange, so the next exchange
/// finishes reading it and discards it by id instead of parsing its tail.
struct Connection<S> {
    reader: BufReader<S>,
    partial: Vec<u8>,
    /// Set while a request line is being written; still set afterwards only
    /// if that write was cancelled, leaving a torn line on the wire.
    writing: bool,
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            conn: Mutex::new(Connection {
                reader: BufReader::new(stream),
                partial: Vec::new(),
                writing: false,
            }),
            next_id: AtomicU64::new(1),
            io_timeout: None,
        }
    }

    /// Fail an exchange that gets no reply within `limit`
    pub fn with_io_timeout(mut self, limit: Option<Duration>) -> Self {
        self.io_timeout = limit;
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    async fn send(conn: &mut Connection<S>, line: &str) -> Result<()> {
        if conn.writing {
            return Err(Error::Transport(
                "a cancelled call left a partial request on the connection".to_string(),
            ));
        }
        conn.writing = true;
        let writer = conn.reader.get_mut();
        trace!("-> {}", line);
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        conn.writing = false;
        Ok(())
    }

    /// Read lines until the reply to `id` arrives.
    ///
    /// Cancel safe: `read_until` appends into `conn.partial`, which is only
    /// cleared once a full line has been read.
    async fn receive(conn: &mut Connection<S>, id: u64) -> Result<Value> {
        loop {
            let read = conn.reader.read_until(b'\n', &mut conn.partial).await?;
            if read == 0 || conn.partial.last() != Some(&b'\n') {
                return Err(Error::ConnectionClosed);
            }
            let raw = std::mem::take(&mut conn.partial);
            let text = String::from_utf8_lossy(&raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            trace!("<- {}", text);

            let reply: Value = serde_json::from_str(text)
                .map_err(|e| Error::Transport(format!("Malformed reply: {}", e)))?;
            let reply = match reply {
                Value::Object(map) => map,
                other => {
                    return Err(Error::Transport(format!(
                        "Reply is not an object: {}",
                        other
                    )))
                }
            };

            if reply.contains_key("event") {
                continue;
            }

            match reply.get("id").and_then(Value::as_u64) {
                Some(reply_id) if reply_id == id => {}
                other => {
                    warn!("Skipping reply for request {:?} while waiting for {}", other, id);
                    continue;
                }
            }

            if let Some(fault) = reply.get("error") {
                let fault: RemoteFault = serde_json::from_value(fault.clone())
                    .map_err(|e| Error::Transport(format!("Malformed error reply: {}", e)))?;
                return Err(fault.into());
            }

            return Ok(reply.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}

impl LineTransport<UnixStream> {
    pub async fn connect_unix(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await.map_err(|e| {
            Error::Transport(format!("Failed to connect to {}: {}", path.display(), e))
        })?;
        debug!("Connected to test endpoint at {}", path.display());
        Ok(Self::from_stream(stream, format!("unix:{}", path.display())))
    }
}

impl LineTransport<TcpStream> {
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::Transport(format!("Failed to connect to {}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        debug!("Connected to test endpoint at {}", addr);
        Ok(Self::from_stream(stream, format!("tcp:{}", addr)))
    }
}

#[async_trait]
impl<S> Transport for LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn exchange(&self, request: Request) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&Envelope {
            id,
            request: &request,
        })?;

        let mut conn = self.conn.lock().await;
        Self::send(&mut conn, &line).await?;
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, Self::receive(&mut conn, id))
                .await
                .map_err(|_| {
                    Error::Transport(format!(
                        "No reply from {} to {} within {:?}",
                        self.peer,
                        request.label(),
                        limit
                    ))
                })?,
            None => Self::receive(&mut conn, id).await,
        }
    }
}

/// Connect to `endpoint` and return a shareable transport
pub async fn connect(endpoint: &Endpoint, io_timeout: Option<Duration>) -> Result<std::sync::Arc<dyn Transport>> {
    let transport: std::sync::Arc<dyn Transport> = match endpoint {
        Endpoint::Unix(path) => {
            std::sync::Arc::new(LineTransport::connect_unix(path).await?.with_io_timeout(io_timeout))
        }
        Endpoint::Tcp(addr) => {
            std::sync::Arc::new(LineTransport::connect_tcp(addr).await?.with_io_timeout(io_timeout))
        }
    };
    Ok(transport)
}
