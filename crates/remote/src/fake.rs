//! In-process stand-in for the application's test endpoint.
//!
//! Serves the line protocol over an in-memory stream and answers each
//! request with a handler closure, so harness code can be exercised without
//! a running application.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::call::Request;
use crate::dispatcher::Dispatcher;
use crate::transport::{LineTransport, RemoteFault};

const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Deserialize)]
struct IncomingEnvelope {
    id: u64,
    #[serde(flatten)]
    request: Request,
}

/// A running fake endpoint
pub struct FakeRemote {
    task: JoinHandle<()>,
}

impl FakeRemote {
    /// Start serving with `handler` and return the client side.
    pub fn spawn<H>(handler: H) -> (LineTransport<DuplexStream>, FakeRemote)
    where
        H: FnMut(&Request) -> Result<Value, RemoteFault> + Send + 'static,
    {
        let (client, server) = duplex(BUFFER_SIZE);
        let task = tokio::spawn(serve(server, handler));
        (LineTransport::from_stream(client, "fake"), FakeRemote { task })
    }

    /// Start serving and return a dispatcher wired to it.
    pub fn dispatcher<H>(handler: H) -> (Dispatcher, FakeRemote)
    where
        H: FnMut(&Request) -> Result<Value, RemoteFault> + Send + 'static,
    {
        let (transport, fake) = Self::spawn(handler);
        (Dispatcher::new(Arc::new(transport)), fake)
    }

    /// Stop answering; pending and later calls see a closed connection.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn serve<H>(stream: DuplexStream, mut handler: H)
where
    H: FnMut(&Request) -> Result<Value, RemoteFault>,
{
    let mut reader = BufReader::new(stream);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        trace!("fake <- {}", line.trim());

        let envelope: IncomingEnvelope = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Fake endpoint could not parse request: {}", e);
                continue;
            }
        };

        let reply = match handler(&envelope.request) {
            Ok(result) => json!({"id": envelope.id, "result": result}),
            Err(fault) => json!({"id": envelope.id, "error": fault}),
        };

        let writer = reader.get_mut();
        let written = async {
            writer.write_all(reply.to_string().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        if written.await.is_err() {
            return;
        }
    }
}
