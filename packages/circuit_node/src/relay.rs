//! Relay hop hosting.
//!
//! The same hop serves two deployment shapes: the dedicated broker binary,
//! which sits on a fixed well-known address, and a gateway peer started
//! with `--relay`, which grabs an ephemeral port and hands its URL out via
//! `addme`. Either way the hop speaks plain HTTP and admits every peer;
//! access control and TLS belong to an operator-run reverse proxy.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use iroh::RelayUrl;
use iroh_relay::server::{AccessConfig, RelayConfig, Server, ServerConfig};
use tracing::info;

/// A running relay hop. Dropping the handle leaves the server running;
/// call [`RelayHop::shutdown`] to stop it.
pub struct RelayHop {
    server: Server,
    addr: SocketAddr,
    url: RelayUrl,
}

impl RelayHop {
    /// Bind and start serving. Port 0 picks an ephemeral port (the gateway
    /// case); the broker passes its fixed address.
    pub async fn start(bind_addr: SocketAddr) -> Result<Self> {
        let relay = RelayConfig {
            http_bind_addr: bind_addr,
            tls: None,
            limits: Default::default(),
            key_cache_capacity: None,
            access: AccessConfig::Everyone,
        };
        let server = Server::spawn(ServerConfig::<(), ()> {
            relay: Some(relay),
            quic: None,
            metrics_addr: None,
        })
        .await
        .context("relay hop failed to start")?;

        let addr = server
            .http_addr()
            .context("relay hop reports no bound address")?;
        let url: RelayUrl = format!("http://{addr}")
            .parse()
            .context("relay hop produced an unparsable URL")?;

        info!(%addr, "relay hop listening");
        Ok(Self { server, addr, url })
    }

    /// The socket address the hop actually bound. With port 0 this is
    /// where the ephemeral port shows up.
    pub fn http_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The URL peers register with and dial through.
    pub fn url(&self) -> &RelayUrl {
        &self.url
    }

    pub async fn shutdown(self) {
        info!(addr = %self.addr, "relay hop shutting down");
        let _ = self.server.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_hop_gets_an_ephemeral_port() {
        let hop = RelayHop::start(([127, 0, 0, 1], 0).into()).await.unwrap();
        let port = hop.http_addr().port();
        assert_ne!(port, 0);
        // The advertised URL points at the port that was actually bound.
        assert!(hop.url().to_string().contains(&port.to_string()));
        hop.shutdown().await;
    }
}
