use anyhow::{ensure, Context, Result};
use std::{fs::File, io::Read};
use tracing::{debug, info};

use crate::codec::parse_entries;
use crate::reducer::{Aggregator, Dump};
use crate::standalone::Job;
use crate::store::KeyCountStore;
use crate::utils::input_files;
use crate::workload::wc;

/// Cuts every input file into `job.chunk_size` byte chunks and counts each
/// chunk into its own store, exactly as a worker would.
pub fn perform_map(job: &Job) -> Result<Vec<KeyCountStore>> {
    ensure!(job.chunk_size > 0, "chunk size must be positive");

    let mut partials = Vec::new();
    for pathspec in input_files(&job.input)? {
        let mut buf = Vec::new();
        {
            // a scope so that the file is closed right after reading
            let mut file = File::open(&pathspec)
                .with_context(|| format!("cannot open {}", pathspec.display()))?;
            file.read_to_end(&mut buf)?;
        }
        debug!(file = %pathspec.display(), bytes = buf.len(), "read input");

        partials.extend(buf.chunks(job.chunk_size).map(|chunk| wc::map(chunk.to_vec())));
    }

    Ok(partials)
}

/// Merges every partial store through its encoded text, the same payload
/// a worker would put on the wire.
pub fn perform_reduce(partials: Vec<KeyCountStore>, aggregator: &Aggregator) -> Result<()> {
    for partial in partials {
        let entries = parse_entries(&partial.encode())?;
        aggregator.merge(&entries);
    }
    Ok(())
}

pub fn run(job: &Job) -> Result<Dump> {
    let partials = perform_map(job)?;
    info!(chunks = partials.len(), "map phase done");

    let aggregator = Aggregator::new();
    perform_reduce(partials, &aggregator)?;
    Ok(aggregator.dump_and_reset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    #[test]
    fn counts_across_files_and_chunks() {
        let dir = std::env::temp_dir().join(format!("wclite-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "The cat sat.\nThe mat!").unwrap();
        fs::write(dir.join("b.txt"), "the dog; the END").unwrap();
        fs::write(dir.join("skip.md"), "ignored words").unwrap();

        let job = Job {
            input: format!("{}/*.txt", dir.display()),
            chunk_size: 8,
        };
        let partials = perform_map(&job).unwrap();
        assert!(partials.len() > 2);

        let dump = run(&job).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let counts: std::collections::HashMap<_, _> = dump.entries.into_iter().collect();
        // 8-byte chunks happen to fall between words in both files
        assert_eq!(counts.get("the"), Some(&4));
        assert_eq!(counts.get("dog"), Some(&1));
        assert_eq!(counts.get("ignored"), None);
        assert_eq!(dump.frames_merged, partials.len() as u64);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let job = Job {
            input: "*.nothing".into(),
            chunk_size: 0,
        };
        assert!(perform_map(&job).is_err());
    }
}
