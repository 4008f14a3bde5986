//! Interactive peer: the operator-facing deployment role.
//!
//! Binds an endpoint, registers the `/ping` and `/msg` handlers, prints the
//! self-addressing banner, and runs the command loop over stdin. With
//! `--no-interactive` the loop is skipped entirely: handlers stay
//! registered and the process idles until a termination signal.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::prelude::*;

use circuit_node::commands::{self, Interpreter};
use circuit_node::node::{self, HandlerTable, Node, NodeConfig};
use circuit_node::proto::msg::MsgResponder;
use circuit_node::proto::ping::PingResponder;
use circuit_node::proto::{MSG_ALPN, PING_ALPN};
use circuit_node::relay::RelayHop;

#[derive(Parser)]
#[command(name = "circuit-peer")]
#[command(about = "Interactive peer-to-peer node")]
struct Cli {
    /// Socket addresses the peer will listen on, separated by space.
    /// Useful if behind proxy, DNS, port forwarding, ...
    #[arg(long, value_delimiter = ' ', num_args = 0..)]
    listen: Vec<SocketAddr>,

    /// Host a relay hop other peers can connect through (gateway mode).
    #[arg(long)]
    relay: bool,

    /// Relay to register with. Default: the public relays.
    #[arg(long)]
    relay_url: Option<String>,

    /// Run without user intervention. For ping and relay purposes.
    #[arg(long)]
    no_interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("circuit_node=info,circuit_peer=info,warn")
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    // Gateway mode hosts its own hop and registers with it; otherwise use
    // the configured relay or fall back to the public ones.
    let relay_hop = if cli.relay {
        Some(RelayHop::start(([0, 0, 0, 0], 0).into()).await?)
    } else {
        None
    };
    let relay_url = match (&relay_hop, &cli.relay_url) {
        (Some(hop), custom) => {
            if custom.is_some() {
                warn!("--relay-url ignored: --relay hosts its own hop");
            }
            Some(hop.url().clone())
        }
        (None, Some(raw)) => Some(raw.parse().context("invalid --relay-url")?),
        (None, None) => None,
    };

    let handlers = HandlerTable::new()
        .register(PING_ALPN, PingResponder)
        .register(MSG_ALPN, MsgResponder::new());
    let config = NodeConfig {
        listen: cli.listen,
        relay_url,
    };
    let node = Node::bind(config, handlers).await?;
    let interpreter = Interpreter::new(node.clone());

    println!();
    println!("========================================");
    println!("Hi!");
    interpreter.whoami();
    println!("========================================");
    println!("You can add me by running this command in another instance of this app:");
    interpreter.addme();
    println!("========================================");

    if cli.no_interactive {
        node::wait_for_shutdown().await?;
        println!("Received signal, shutting down...");
    } else {
        commands::print_help();
        command_loop(&interpreter).await;
    }

    node.shutdown().await;
    if let Some(hop) = relay_hop {
        hop.shutdown().await;
    }
    Ok(())
}

/// One command per line until `quit` or the input stream fails. Each
/// network operation blocks the loop until it completes.
async fn command_loop(interpreter: &Interpreter) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("________________________________________");
        println!("Enter command:");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!("stdin closed, leaving command loop");
                break;
            }
            Err(e) => {
                warn!("error reading input, leaving command loop: {e}");
                break;
            }
        };
        match commands::parse(&line) {
            Ok(Some(cmd)) => {
                if !interpreter.dispatch(cmd).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e @ circuit_node::CommandError::UnknownCommand(_)) => {
                println!("{e}");
                commands::print_help();
            }
            Err(e) => println!("{e}"),
        }
    }
}
