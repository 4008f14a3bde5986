//! Standalone relay server: brokers connections between peers that cannot
//! reach each other directly. No flags; fixed listen address; runs until a
//! termination signal.

use std::net::SocketAddr;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use circuit_node::node::wait_for_shutdown;
use circuit_node::relay::RelayHop;

const LISTEN_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
    2000,
);

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("circuit_node=info,circuit_relay=info,warn")
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let relay = RelayHop::start(LISTEN_ADDR).await?;
    println!("Hi I am a relay!");
    println!("Listening on: {}", relay.http_addr());
    println!("You can find me at: {}", relay.url());

    wait_for_shutdown().await?;
    println!("Received signal, shutting down...");
    relay.shutdown().await;
    Ok(())
}
