//! The network substrate handle: one iroh endpoint shared by the command
//! loop and every protocol handler.
//!
//! The endpoint identity is ephemeral (generated at bind). Inbound
//! connections are dispatched to a handler table keyed by the negotiated
//! ALPN; each handler runs as its own task and owns the connection it was
//! given for its whole lifetime.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use iroh::endpoint::Connection;
use iroh::{Endpoint, EndpointAddr, EndpointId, RelayMode, RelayUrl};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::address_book::AddressBook;
use crate::error::CommandError;

/// Upper bound on a single dial attempt. A dead address fails the attempt
/// instead of stalling the command loop.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A registered protocol handler, invoked once per accepted connection.
///
/// Invocations run concurrently and independently; a handler must not assume
/// any ordering relative to other handlers or the command loop.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, conn: Connection) -> BoxFuture<'static, ()>;
}

/// Handler table keyed by ALPN. Fixed at bind time: the endpoint only
/// accepts the protocols registered here.
#[derive(Default)]
pub struct HandlerTable {
    entries: Vec<(&'static [u8], Arc<dyn ConnectionHandler>)>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, alpn: &'static [u8], handler: impl ConnectionHandler) -> Self {
        self.entries.push((alpn, Arc::new(handler)));
        self
    }

    fn alpns(&self) -> Vec<Vec<u8>> {
        self.entries.iter().map(|(alpn, _)| alpn.to_vec()).collect()
    }

    fn get(&self, alpn: &[u8]) -> Option<Arc<dyn ConnectionHandler>> {
        self.entries
            .iter()
            .find(|(a, _)| *a == alpn)
            .map(|(_, h)| h.clone())
    }
}

/// Endpoint configuration resolved from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Explicit socket addresses to bind; empty = substrate defaults.
    pub listen: Vec<SocketAddr>,
    /// Relay to register with; `None` = the default public relays.
    pub relay_url: Option<RelayUrl>,
}

/// Process-wide substrate handle: endpoint, peer table, accept loop.
pub struct Node {
    endpoint: Endpoint,
    book: AddressBook,
    relay_url: Option<RelayUrl>,
    cancel: CancellationToken,
}

impl Node {
    /// Generate an ephemeral identity, bind the endpoint, and start
    /// accepting connections for the registered protocols.
    pub async fn bind(config: NodeConfig, handlers: HandlerTable) -> Result<Arc<Self>> {
        let secret = iroh::SecretKey::generate(&mut rand::rng());

        let relay_mode = match &config.relay_url {
            Some(url) => RelayMode::Custom(iroh::RelayMap::from(url.clone())),
            None => RelayMode::Default,
        };

        let mut builder = Endpoint::builder()
            .secret_key(secret)
            .alpns(handlers.alpns())
            .relay_mode(relay_mode);

        for addr in &config.listen {
            builder = builder
                .bind_addr(*addr)
                .context("failed to bind listen address")?;
        }

        let endpoint = builder.bind().await.context("failed to bind endpoint")?;

        let node = Arc::new(Self {
            endpoint,
            book: AddressBook::new(),
            relay_url: config.relay_url,
            cancel: CancellationToken::new(),
        });

        let accept_node = node.clone();
        tokio::spawn(async move {
            accept_node.accept_loop(handlers).await;
        });

        match &node.relay_url {
            Some(url) => info!(peer = %node.id(), relay = %url, "endpoint bound"),
            None => info!(peer = %node.id(), "endpoint bound (default relays)"),
        }

        Ok(node)
    }

    /// This node's identity.
    pub fn id(&self) -> EndpointId {
        self.endpoint.id()
    }

    /// The relay this node registered with, if a custom one was configured.
    pub fn relay_url(&self) -> Option<&RelayUrl> {
        self.relay_url.as_ref()
    }

    /// The local socket addresses the endpoint is bound to.
    pub fn bound_sockets(&self) -> Vec<SocketAddr> {
        self.endpoint.bound_sockets()
    }

    /// The shared peer registry.
    pub fn book(&self) -> &AddressBook {
        &self.book
    }

    /// Open a connection to `id` for `alpn`, trying the peer's known
    /// addresses in order until one succeeds or all fail.
    pub async fn connect(&self, id: EndpointId, alpn: &[u8]) -> Result<Connection, CommandError> {
        let addrs = self.book.addresses(id).await;
        if addrs.is_empty() {
            return Err(CommandError::ConnectFailed(format!(
                "no known addresses for {id}"
            )));
        }
        let mut last_err = String::new();
        for addr in &addrs {
            let attempt = self.endpoint.connect(addr.endpoint_addr(id), alpn);
            match tokio::time::timeout(CONNECT_TIMEOUT, attempt).await {
                Ok(Ok(conn)) => return Ok(conn),
                Ok(Err(e)) => {
                    warn!(peer = %id, addr = %addr, "connect attempt failed: {e}");
                    last_err = e.to_string();
                }
                Err(_) => {
                    warn!(peer = %id, addr = %addr, "connect attempt timed out");
                    last_err = format!("timed out after {CONNECT_TIMEOUT:?}");
                }
            }
        }
        Err(CommandError::ConnectFailed(last_err))
    }

    /// Open a connection to an explicit endpoint address (rendezvous path).
    pub async fn connect_addr(
        &self,
        addr: EndpointAddr,
        alpn: &[u8],
    ) -> Result<Connection, CommandError> {
        match tokio::time::timeout(CONNECT_TIMEOUT, self.endpoint.connect(addr, alpn)).await {
            Ok(res) => res.map_err(|e| CommandError::ConnectFailed(e.to_string())),
            Err(_) => Err(CommandError::ConnectFailed(format!(
                "timed out after {CONNECT_TIMEOUT:?}"
            ))),
        }
    }

    /// Orderly shutdown: stop the accept loop and close the endpoint, which
    /// unblocks any outstanding stream operations with an error.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.endpoint.close().await;
        info!("endpoint closed");
    }

    /// Accept incoming connections and dispatch each to the handler
    /// registered for its ALPN, spawned as an independent task.
    async fn accept_loop(self: Arc<Self>, handlers: HandlerTable) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("accept loop cancelled");
                    break;
                }
                incoming = self.endpoint.accept() => {
                    let Some(incoming) = incoming else {
                        info!("endpoint closed, accept loop exiting");
                        break;
                    };

                    let conn = match incoming.accept() {
                        Ok(connecting) => match connecting.await {
                            Ok(conn) => conn,
                            Err(e) => {
                                error!("connection handshake failed: {e}");
                                continue;
                            }
                        },
                        Err(e) => {
                            error!("failed to accept incoming connection: {e}");
                            continue;
                        }
                    };

                    let remote = conn.remote_id();
                    self.book.record_seen(remote).await;

                    let alpn = conn.alpn().to_vec();

                    match handlers.get(&alpn) {
                        Some(handler) => {
                            info!(
                                peer = %remote,
                                proto = %String::from_utf8_lossy(&alpn),
                                "accepted connection"
                            );
                            tokio::spawn(handler.handle(conn));
                        }
                        None => {
                            warn!(
                                peer = %remote,
                                proto = %String::from_utf8_lossy(&alpn),
                                "no handler for protocol, closing"
                            );
                            conn.close(1u32.into(), b"unknown protocol");
                        }
                    }
                }
            }
        }
    }
}

/// Parse a hex-encoded peer identity as printed by `whoami`.
pub fn parse_peer_id(s: &str) -> Result<EndpointId, CommandError> {
    s.trim()
        .parse()
        .map_err(|e| CommandError::InvalidPeerId(format!("{s}: {e}")))
}

/// Block until SIGINT or SIGTERM.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("failed to listen for Ctrl+C")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_hex_roundtrip() {
        let secret = iroh::SecretKey::from_bytes(&[7u8; 32]);
        let id = secret.public();
        let hex = id.to_string();
        assert_eq!(parse_peer_id(&hex).unwrap(), id);
        // whitespace around the token is tolerated
        assert_eq!(parse_peer_id(&format!(" {hex}\n")).unwrap(), id);
    }

    #[test]
    fn peer_id_rejects_garbage() {
        assert!(matches!(
            parse_peer_id("not-hex"),
            Err(CommandError::InvalidPeerId(_))
        ));
        assert!(matches!(
            parse_peer_id("abcd"),
            Err(CommandError::InvalidPeerId(_))
        ));
    }

    #[test]
    fn handler_table_lookup() {
        struct Nop;
        impl ConnectionHandler for Nop {
            fn handle(&self, _conn: Connection) -> BoxFuture<'static, ()> {
                Box::pin(async {})
            }
        }
        let table = HandlerTable::new().register(b"/ping", Nop);
        assert!(table.get(b"/ping").is_some());
        assert!(table.get(b"/msg").is_none());
        assert_eq!(table.alpns(), vec![b"/ping".to_vec()]);
    }
}
