//! Relay rendezvous: the two asymmetric roles that meet through a relay.
//!
//! The role is a tagged variant resolved once at startup and fixed for the
//! process lifetime. There is no transition back and no automatic retry; a
//! failed dial requires an operator restart.

use iroh::{EndpointAddr, EndpointId, RelayUrl};
use tracing::info;

use crate::address_book::PeerAddress;
use crate::error::CommandError;
use crate::node::Node;
use crate::proto::relay_test;

/// Which side of the rendezvous this process plays.
#[derive(Debug, Clone)]
pub enum RelayRole {
    /// Advertise reachability through the relay and wait for a knock.
    Waiting,
    /// Dial the target through the relay and knock on its door.
    Dialing {
        target: EndpointId,
        /// Extra addresses for the target beyond the shared relay.
        extra_addrs: Vec<PeerAddress>,
    },
}

/// Rendezvous configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub relay_url: RelayUrl,
    pub role: RelayRole,
}

/// Run the rendezvous sequence for the configured role.
///
/// The node must already be bound with `relay_url` as its relay and, for
/// the Waiting role, with the `/relay-test` handler registered. Returns
/// once the role's terminal point is reached: immediately for Waiting
/// (the caller idles until shutdown), after handshake completion for a
/// successful dial, or with the error for a failed one.
pub async fn establish(node: &Node, config: &RelayConfig) -> Result<(), CommandError> {
    match &config.role {
        RelayRole::Waiting => {
            info!(relay = %config.relay_url, "advertising reachability through relay");
            println!("Waiting for someone to connect with me...");
            Ok(())
        }
        RelayRole::Dialing {
            target,
            extra_addrs,
        } => {
            info!(peer = %target, relay = %config.relay_url, "dialing target through relay");
            let mut addr = EndpointAddr::new(*target).with_relay_url(config.relay_url.clone());
            for extra in extra_addrs {
                addr = match extra {
                    PeerAddress::Relay(url) => addr.with_relay_url(url.clone()),
                    PeerAddress::Direct(sock) => addr.with_ip_addr(*sock),
                };
            }
            relay_test::knock(node, addr).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_role_has_no_target() {
        let config = RelayConfig {
            relay_url: "http://127.0.0.1:2000".parse().unwrap(),
            role: RelayRole::Waiting,
        };
        assert!(matches!(config.role, RelayRole::Waiting));
    }
}
