//! Known-peer registry: identities and the addresses they are reachable at.
//!
//! The table is process-wide state shared between the command loop and the
//! accept loop: `add` records operator-supplied addresses, the accept loop
//! records inbound identities via `record_seen`, and `list` is a live view of
//! everything the node currently knows. Records live for the whole process;
//! an identity never changes and its address set may only grow.

use std::net::SocketAddr;

use iroh::{EndpointAddr, EndpointId, RelayUrl};
use tokio::sync::Mutex;

use crate::error::CommandError;

/// One reachable locator for a peer: either a relay to dial through (the
/// circuit form: "reach this peer via that relay") or a direct UDP socket
/// address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddress {
    Relay(RelayUrl),
    Direct(SocketAddr),
}

impl PeerAddress {
    /// Parse one address token. Relay URLs carry a scheme (`http://`,
    /// `https://`); anything else must parse as `ip:port`.
    pub fn parse(s: &str) -> Result<Self, CommandError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CommandError::InvalidAddress("empty address".into()));
        }
        if s.contains("://") {
            let url: RelayUrl = s
                .parse()
                .map_err(|e| CommandError::InvalidAddress(format!("{s}: {e}")))?;
            return Ok(PeerAddress::Relay(url));
        }
        let sock: SocketAddr = s.parse().map_err(|_| {
            CommandError::InvalidAddress(format!("{s}: expected a relay URL or ip:port"))
        })?;
        Ok(PeerAddress::Direct(sock))
    }

    /// Expand into a dialable endpoint address for `id`.
    pub fn endpoint_addr(&self, id: EndpointId) -> EndpointAddr {
        match self {
            PeerAddress::Relay(url) => EndpointAddr::new(id).with_relay_url(url.clone()),
            PeerAddress::Direct(sock) => EndpointAddr::new(id).with_ip_addr(*sock),
        }
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerAddress::Relay(url) => write!(f, "{url}"),
            PeerAddress::Direct(sock) => write!(f, "{sock}"),
        }
    }
}

/// Decompose an address-list token: either a single address or a bracketed,
/// space-separated list `[addr1 addr2]`. Returns the ordered element list.
pub fn split_addr_list(s: &str) -> Vec<&str> {
    let s = s.trim();
    let s = s.strip_prefix('[').unwrap_or(s);
    let s = s.strip_suffix(']').unwrap_or(s);
    s.split_whitespace().collect()
}

/// Parse a whole address-list token. Validates every element before
/// returning, so a single malformed address rejects the call as a whole.
pub fn parse_addr_list(s: &str) -> Result<Vec<PeerAddress>, CommandError> {
    let parts = split_addr_list(s);
    if parts.is_empty() {
        return Err(CommandError::InvalidAddress("empty address list".into()));
    }
    parts.into_iter().map(PeerAddress::parse).collect()
}

/// A known peer and everywhere we can reach it.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub id: EndpointId,
    pub addrs: Vec<PeerAddress>,
}

/// In-memory peer registry. Insertion order is preserved for `list`; address
/// order within a record is preserved for first-match-wins dialing.
#[derive(Default)]
pub struct AddressBook {
    peers: Mutex<Vec<PeerRecord>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as reachable at the addresses in `addr_list`.
    ///
    /// The whole list is validated before any mutation: a malformed address
    /// leaves the book unchanged. Returns the number of addresses stored.
    pub async fn add(&self, id: EndpointId, addr_list: &str) -> Result<usize, CommandError> {
        let addrs = parse_addr_list(addr_list)?;
        let count = addrs.len();
        let mut peers = self.peers.lock().await;
        match peers.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                for addr in addrs {
                    if !record.addrs.contains(&addr) {
                        record.addrs.push(addr);
                    }
                }
            }
            None => peers.push(PeerRecord { id, addrs }),
        }
        Ok(count)
    }

    /// Inbound-connection notification: make sure `id` has a record.
    pub async fn record_seen(&self, id: EndpointId) {
        let mut peers = self.peers.lock().await;
        if !peers.iter().any(|r| r.id == id) {
            peers.push(PeerRecord {
                id,
                addrs: Vec::new(),
            });
        }
    }

    /// Every identity currently known, in insertion order.
    pub async fn list(&self) -> Vec<EndpointId> {
        self.peers.lock().await.iter().map(|r| r.id).collect()
    }

    /// The known addresses for `id`, in the order they were added.
    pub async fn addresses(&self, id: EndpointId) -> Vec<PeerAddress> {
        self.peers
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.addrs.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id(byte: u8) -> EndpointId {
        let secret = iroh::SecretKey::from_bytes(&[byte; 32]);
        secret.public()
    }

    #[test]
    fn split_single_address() {
        assert_eq!(split_addr_list("10.0.0.1:4433"), vec!["10.0.0.1:4433"]);
    }

    #[test]
    fn split_bracketed_list() {
        assert_eq!(split_addr_list("[a b c]"), vec!["a", "b", "c"]);
        assert_eq!(
            split_addr_list("[http://r.example 10.0.0.1:4433]"),
            vec!["http://r.example", "10.0.0.1:4433"]
        );
    }

    #[test]
    fn parse_relay_and_direct() {
        assert!(matches!(
            PeerAddress::parse("http://relay.example").unwrap(),
            PeerAddress::Relay(_)
        ));
        assert!(matches!(
            PeerAddress::parse("127.0.0.1:2000").unwrap(),
            PeerAddress::Direct(_)
        ));
        assert!(PeerAddress::parse("not-an-address").is_err());
    }

    #[tokio::test]
    async fn add_is_atomic_on_malformed_address() {
        let book = AddressBook::new();
        let id = test_id(1);
        let err = book
            .add(id, "[127.0.0.1:2000 bogus-addr]")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidAddress(_)));
        assert!(book.list().await.is_empty());
        assert!(book.addresses(id).await.is_empty());
    }

    #[tokio::test]
    async fn add_preserves_order_and_grows() {
        let book = AddressBook::new();
        let id = test_id(2);
        book.add(id, "[http://r1.example 127.0.0.1:1000]")
            .await
            .unwrap();
        book.add(id, "127.0.0.1:2000").await.unwrap();
        let addrs = book.addresses(id).await;
        assert_eq!(addrs.len(), 3);
        assert!(matches!(addrs[0], PeerAddress::Relay(_)));
        assert_eq!(book.list().await, vec![id]);
    }

    #[tokio::test]
    async fn record_seen_creates_empty_record_once() {
        let book = AddressBook::new();
        let id = test_id(3);
        book.record_seen(id).await;
        book.record_seen(id).await;
        assert_eq!(book.list().await, vec![id]);
        assert!(book.addresses(id).await.is_empty());
    }
}
