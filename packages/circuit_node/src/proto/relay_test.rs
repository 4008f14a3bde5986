//! `/relay-test`: end-to-end relay path confirmation.
//!
//! Used only during relay rendezvous. Both sides print a success notice;
//! the responder's close tells the initiator the path is usable.

use futures::FutureExt;
use futures::future::BoxFuture;
use iroh::EndpointAddr;
use iroh::endpoint::Connection;

use crate::error::CommandError;
use crate::node::{ConnectionHandler, Node};
use crate::proto::RELAY_TEST_ALPN;

/// Responder side of the rendezvous handshake.
pub struct RelayTestResponder;

impl ConnectionHandler for RelayTestResponder {
    fn handle(&self, conn: Connection) -> BoxFuture<'static, ()> {
        async move {
            println!(
                "Connection established :D (someone knocked on my door: {})",
                conn.remote_id()
            );
            conn.close(0u32.into(), b"");
        }
        .boxed()
    }
}

/// Initiator side: open the handshake connection to an explicit address
/// (normally the target's circuit address through the shared relay) and
/// block until the responder closes it.
pub async fn knock(node: &Node, addr: EndpointAddr) -> Result<(), CommandError> {
    let conn = node.connect_addr(addr, RELAY_TEST_ALPN).await?;
    println!("Connection established :D (I have knocked on someone's door)");
    conn.closed().await;
    Ok(())
}
