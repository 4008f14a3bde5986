//! `/ping`: empty-payload reachability check.
//!
//! No bytes cross the wire. The responder closes the connection on
//! acceptance; the initiator awaits that close as the round-trip signal.

use futures::FutureExt;
use futures::future::BoxFuture;
use iroh::EndpointId;
use iroh::endpoint::Connection;

use crate::error::CommandError;
use crate::node::{ConnectionHandler, Node};
use crate::proto::PING_ALPN;

/// Responder side: print provenance, close. The close itself is the
/// acknowledgment.
pub struct PingResponder;

impl ConnectionHandler for PingResponder {
    fn handle(&self, conn: Connection) -> BoxFuture<'static, ()> {
        async move {
            println!("________________________________________");
            println!("Ping!");
            println!("From: {}", conn.remote_id());
            println!("________________________________________");
            conn.close(0u32.into(), b"pong");
        }
        .boxed()
    }
}

/// Initiator side: open a `/ping` connection to `id` and block until the
/// responder closes it. Responder-side close is success; a connect failure
/// aborts the command.
pub async fn ping(node: &Node, id: EndpointId) -> Result<(), CommandError> {
    let conn = node.connect(id, PING_ALPN).await?;
    conn.closed().await;
    Ok(())
}
