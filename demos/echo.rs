//! Echo round trip between a server adapter and a client adapter.
//!
//! Run with: cargo run --example echo -- [--debug] [--console]
//!
//! The server replies to every `ping` with a `pong` carrying the same data.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use typed_socket::transport::{WsConnection, WsServer};
use typed_socket::{ConnectionAdapter, ConsoleObserver, TracingObserver};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Pong {
    n: u32,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let debug = args.iter().any(|a| a == "--debug");
    let console = args.iter().any(|a| a == "--console");

    let filter = if debug {
        "typed_socket=debug"
    } else {
        "typed_socket=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let builder = if console {
        ConnectionAdapter::builder().observer(ConsoleObserver)
    } else {
        ConnectionAdapter::builder().observer(TracingObserver)
    };

    // Server side
    let server_socket = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
    let url = server_socket.ws_url();
    let server = builder.clone().build(Arc::new(server_socket));

    let replies = server.clone();
    server.on("ping", move |data| {
        if let Err(e) = replies.emit("pong", &data.cloned()) {
            eprintln!("reply failed: {e}");
        }
    });
    server.on("connection", |peer| println!("peer connected: {peer:?}"));

    // Client side
    let client = builder.build(Arc::new(WsConnection::connect(&url)?));
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel();
    client.on_typed("pong", move |pong: Pong| {
        let _ = pong_tx.send(pong.n);
    });

    client.wait_connection().await?;
    println!("connected to {url} as {}", client.role());

    for n in 1..=3 {
        client.emit("ping", &json!({ "n": n }))?;
        let echoed = tokio::time::timeout(Duration::from_secs(5), pong_rx.recv()).await?;
        println!("pong {echoed:?}");
    }

    Ok(())
}
