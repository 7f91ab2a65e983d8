//! Compressed echo server and client over TCP.
//!
//! Run with `cargo run --example echo`. Both ends wrap their socket in a
//! `CompressedStream` with per-write flushing so every message reaches the
//! peer immediately.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use synapsed_compress::{CompressedStream, CompressionConfig, FlushPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

const MAX_LENGTH: usize = 1024;

fn stream_config() -> CompressionConfig {
    CompressionConfig {
        level: 3,
        flush_policy: FlushPolicy::EveryWrite,
        ..Default::default()
    }
}

async fn serve_connection(socket: TcpStream, peer: SocketAddr) -> Result<()> {
    let mut stream = CompressedStream::with_config(socket, stream_config())?;
    let mut data = [0u8; MAX_LENGTH];

    loop {
        let n = stream.read(&mut data).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&data[..n]).await?;
    }

    stream.close().await?;
    let stats = stream.statistics_snapshot();
    info!(%peer, ?stats, "session finished");
    Ok(())
}

async fn run_server(listener: TcpListener) -> Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tokio::spawn(async move {
            if let Err(e) = serve_connection(socket, peer).await {
                warn!(%peer, error = %e, "session failed");
            }
        });
    }
}

async fn run_client(addr: SocketAddr) -> Result<()> {
    let socket = TcpStream::connect(addr).await?;
    let mut stream = CompressedStream::with_config(socket, stream_config())?;
    let mut reply = vec![0u8; MAX_LENGTH];

    for i in 0..10 {
        let message = format!("message {} {}", i, "echo ".repeat(40));
        stream.write_all(message.as_bytes()).await?;

        let mut received = 0;
        while received < message.len() {
            let n = stream.read(&mut reply[received..]).await?;
            if n == 0 {
                anyhow::bail!("server closed the stream early");
            }
            received += n;
        }
        assert_eq!(&reply[..received], message.as_bytes());
    }

    stream.close().await?;

    let stats = stream.statistics_snapshot();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    if let Some(ratio) = stats.tx_compression_ratio() {
        println!("client tx compression ratio: {:.3}", ratio);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo=info,synapsed_compress=info".into()),
        )
        .init();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind echo listener")?;
    let addr = listener.local_addr()?;
    info!(%addr, "echo server listening");

    tokio::spawn(async move {
        if let Err(e) = run_server(listener).await {
            warn!(error = %e, "server stopped");
        }
    });

    run_client(addr).await
}
