use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::info;
use wclite::cmd::dispatch::Args;
use wclite::dispatch::{open_inputs, Dispatcher};
use wclite::utils::{init_tracing, input_files};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let endpoints = args.endpoints()?;
    let batch_size = args.batch_size.unwrap_or(endpoints.len());
    let dispatcher = Dispatcher::new(endpoints, batch_size, args.chunk_size)?;
    for endpoint in dispatcher.endpoints() {
        info!("worker {}", endpoint);
    }

    let files = input_files(&args.input)?;
    ensure!(!files.is_empty(), "no input files match `{}`", args.input);

    for path in &files {
        info!(file = %path.display(), "queued input");
    }
    let input = open_inputs(&files).await?;
    let report = dispatcher.run(input).await.context("failed reading input")?;

    print!("{}", report);
    ensure!(report.is_success(), "{} chunks were not delivered", report.failed.len());
    Ok(())
}
