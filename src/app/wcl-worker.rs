use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use wclite::cmd::worker::Args;
use wclite::utils::init_tracing;
use wclite::worker::Worker;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let addr = args.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let worker = Worker::new(&args.reducer, args.max_chunk);
    worker.serve(listener).await?;
    Ok(())
}
