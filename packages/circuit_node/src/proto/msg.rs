//! `/msg`: fire-and-forget text delivery.
//!
//! Wire format: UTF-8 text terminated by a single `\n`, written to one
//! uni-directional stream. The responder sends nothing back; it closes the
//! connection after reading, and that close is the delivery acknowledgment.

use futures::FutureExt;
use futures::future::BoxFuture;
use iroh::EndpointId;
use iroh::endpoint::Connection;
use tokio::sync::mpsc;
use tracing::error;

use crate::error::CommandError;
use crate::node::{ConnectionHandler, Node};
use crate::proto::MSG_ALPN;

/// Upper bound on a message body. The read is bounded so a misbehaving
/// peer cannot grow the buffer without limit.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Responder side: read one newline-terminated line, display it, close.
///
/// An empty body is acknowledged like any other delivery but produces no
/// displayed line.
pub struct MsgResponder {
    /// Optional copy of every displayed line, for tests.
    observer: Option<mpsc::UnboundedSender<String>>,
}

impl MsgResponder {
    pub fn new() -> Self {
        Self { observer: None }
    }

    /// A responder that also forwards displayed lines to `tx`.
    pub fn with_observer(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { observer: Some(tx) }
    }
}

impl Default for MsgResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHandler for MsgResponder {
    fn handle(&self, conn: Connection) -> BoxFuture<'static, ()> {
        let observer = self.observer.clone();
        async move {
            let remote = conn.remote_id();
            let mut recv = match conn.accept_uni().await {
                Ok(s) => s,
                Err(e) => {
                    error!(peer = %remote, "failed to accept /msg stream: {e}");
                    return;
                }
            };
            let data = match recv.read_to_end(MAX_MESSAGE_SIZE).await {
                Ok(d) => d,
                Err(e) => {
                    error!(peer = %remote, "failed to read /msg payload: {e}");
                    return;
                }
            };
            let text = String::from_utf8_lossy(&data);
            let line = text.strip_suffix('\n').unwrap_or(&text);
            if !line.is_empty() {
                println!("________________________________________");
                println!("Message from {remote}:");
                println!("{line}");
                println!("________________________________________");
                if let Some(tx) = &observer {
                    let _ = tx.send(line.to_string());
                }
            }
            conn.close(0u32.into(), b"delivered");
        }
        .boxed()
    }
}

/// Initiator side: write `body` plus the newline terminator, finish the
/// stream, then block until the responder closes the connection. The close
/// is the only acknowledgment; no payload comes back.
pub async fn send(node: &Node, id: EndpointId, body: &str) -> Result<(), CommandError> {
    let conn = node.connect(id, MSG_ALPN).await?;
    let mut stream = conn
        .open_uni()
        .await
        .map_err(|e| CommandError::Stream(e.to_string()))?;
    stream
        .write_all(body.as_bytes())
        .await
        .map_err(|e| CommandError::Stream(e.to_string()))?;
    stream
        .write_all(b"\n")
        .await
        .map_err(|e| CommandError::Stream(e.to_string()))?;
    stream
        .finish()
        .map_err(|e| CommandError::Stream(e.to_string()))?;
    conn.closed().await;
    Ok(())
}
