//! Core of the circuit peer: peer registry, substrate wrapper, application
//! protocols, relay rendezvous, and the interactive command interpreter.
//!
//! The network substrate is iroh; everything below the [`node::Node`]
//! wrapper (QUIC, NAT traversal, relay hops) belongs to it. This crate owns
//! the protocol layer on top: what flows over each ALPN, how a rendezvous
//! through a relay is established, and how operator commands drive both.

pub mod address_book;
pub mod commands;
pub mod error;
pub mod node;
pub mod proto;
pub mod relay;
pub mod rendezvous;


pub use error::CommandError;
pub use node::{HandlerTable, Node, NodeConfig};
