use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use wclite::standalone::{engine, Args, Job};
use wclite::utils::init_tracing;

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let dump = engine::run(&Job::from(&args))?;

    if args.sorted {
        let by_count = dump
            .entries
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (word, count) in by_count {
            println!("{} = {}", word, count);
        }
    } else {
        print!("{}", dump);
    }
    Ok(())
}
