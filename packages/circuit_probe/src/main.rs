//! Relay-mode peer: rendezvous with another peer through a relay.
//!
//! Two fixed roles, chosen once at startup: wait for a knock through the
//! relay, or dial a target's circuit address and knock. Useful for peers
//! behind NAT that cannot reach each other directly.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;

use circuit_node::address_book::parse_addr_list;
use circuit_node::node::{self, HandlerTable, Node, NodeConfig, parse_peer_id};
use circuit_node::proto::RELAY_TEST_ALPN;
use circuit_node::proto::relay_test::RelayTestResponder;
use circuit_node::rendezvous::{self, RelayConfig, RelayRole};

#[derive(Parser)]
#[command(name = "circuit-probe")]
#[command(about = "Rendezvous with a peer through a relay")]
struct Cli {
    /// Relay to rendezvous through.
    #[arg(long)]
    relay_url: String,

    /// Initiate the connection instead of waiting to be connected to.
    #[arg(long)]
    dial: bool,

    /// Hex ID of the peer to dial (required with --dial).
    #[arg(long)]
    peer_id: Option<String>,

    /// Extra addresses for the target: a single address or `[addr list]`
    /// (default: reach it through the shared relay).
    #[arg(long)]
    peer_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("circuit_node=info,circuit_probe=info,warn")
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    // Everything here is the mandatory startup sequence: any failure is
    // fatal before a rendezvous is attempted.
    let relay_url = cli.relay_url.parse().context("invalid --relay-url")?;
    let role = if cli.dial {
        let raw_id = cli.peer_id.context("--peer-id is required with --dial")?;
        let target = parse_peer_id(&raw_id)?;
        let extra_addrs = match &cli.peer_addr {
            Some(list) => parse_addr_list(list)?,
            None => Vec::new(),
        };
        RelayRole::Dialing {
            target,
            extra_addrs,
        }
    } else {
        RelayRole::Waiting
    };
    let config = RelayConfig { relay_url, role };

    let handlers = HandlerTable::new().register(RELAY_TEST_ALPN, RelayTestResponder);
    let node = Node::bind(
        NodeConfig {
            listen: Vec::new(),
            relay_url: Some(config.relay_url.clone()),
        },
        handlers,
    )
    .await?;

    println!("Hi I am a peer: {}", node.id());
    println!("You can find me at: {} (via {})", node.id(), config.relay_url);

    // A failed dial ends the rendezvous sequence without crashing; there
    // is no retry, restart the process to try again.
    if let Err(e) = rendezvous::establish(&node, &config).await {
        println!("{e}");
        node.shutdown().await;
        return Ok(());
    }

    node::wait_for_shutdown().await?;
    println!("Received signal, shutting down...");
    node.shutdown().await;
    Ok(())
}
