use clap::Parser;

use crate::CHUNK_SIZE;

pub mod engine;

/// Count words in local files in a single process.
///
/// Runs the same chunking, counting and merging as the networked pipeline,
/// without any worker or reducer nodes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Glob spec for the input files
    #[arg(short, long)]
    pub input: String,

    /// Bytes per chunk
    #[arg(short, long, default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Print words by descending count instead of store order
    #[arg(short, long)]
    pub sorted: bool,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub input: String,
    pub chunk_size: usize,
}

impl From<&Args> for Job {
    fn from(args: &Args) -> Self {
        Job {
            input: args.input.clone(),
            chunk_size: args.chunk_size,
        }
    }
}
