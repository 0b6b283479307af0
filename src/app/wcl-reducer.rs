use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use wclite::cmd::reducer::Args;
use wclite::reducer::{Aggregator, Dump, Reducer};
use wclite::utils::init_tracing;

fn print_dump(title: &str, dump: &Dump) {
    println!("\n{}:\n", title);
    print!("{}", dump);
    println!(
        "\n{} words ({} entries from {} frames). Dictionary reset.\n",
        dump.entries.len(),
        dump.entries_merged,
        dump.frames_merged
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let addr = args.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let reducer = Reducer::new(Arc::new(Aggregator::new()));
    let aggregator = Arc::clone(reducer.aggregator());

    // SIGUSR1 dumps and clears the counts; Ctrl-C dumps once more and exits.
    let mut dump_signal = signal(SignalKind::user_defined1()).context("cannot listen for SIGUSR1")?;

    let serve = reducer.serve(listener);
    tokio::pin!(serve);
    loop {
        tokio::select! {
            result = &mut serve => return result.context("reducer stopped"),
            _ = dump_signal.recv() => print_dump("Word count", &aggregator.dump_and_reset()),
            _ = tokio::signal::ctrl_c() => {
                print_dump("Final word count", &aggregator.dump_and_reset());
                return Ok(());
            }
        }
    }
}
