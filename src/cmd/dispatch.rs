use std::path::PathBuf;

use clap::Parser;

use crate::dispatch::{default_endpoints, load_endpoints, WorkerEndpoint};
use crate::error::Result;
use crate::CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Glob spec for the input files
    #[arg(short, long)]
    pub input: String,

    /// Chunks sent concurrently per batch (defaults to the number of workers)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Bytes per chunk
    #[arg(short, long, default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Worker endpoint as `label=host:port` or `host:port`; repeatable
    #[arg(short, long = "worker")]
    pub workers: Vec<WorkerEndpoint>,

    /// JSON file with an array of `{ "addr", "port", "label" }` workers
    #[arg(short = 'f', long)]
    pub workers_file: Option<PathBuf>,
}

impl Args {
    /// Workers given with `--worker`, then those from `--workers-file`.
    /// Falls back to the four default local workers when both are empty.
    pub fn endpoints(&self) -> Result<Vec<WorkerEndpoint>> {
        let mut endpoints = self.workers.clone();
        if let Some(path) = &self.workers_file {
            endpoints.extend(load_endpoints(path)?);
        }
        if endpoints.is_empty() {
            endpoints = default_endpoints();
        }
        Ok(endpoints)
    }
}
