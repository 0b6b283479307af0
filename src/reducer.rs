//! The aggregating node.
//!
//! Every accepted connection carries one frame from a worker. Each
//! connection runs in its own task; the frame is read and parsed without
//! holding any lock, then all of its entries are merged into the shared
//! store under a single lock acquisition, so a frame's merge is never
//! interleaved with another frame's.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::codec::{parse_entries, read_frame};
use crate::error::Result;
use crate::store::KeyCountStore;
use crate::workload::wc;

#[derive(Debug, Default)]
struct Tally {
    store: KeyCountStore,
    entries_merged: u64,
    frames_merged: u64,
}

/// The process-lifetime word counts, shared by every connection task.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<Tally>,
}

/// What [`Aggregator::dump_and_reset`] took out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    /// Entries in store iteration order.
    pub entries: Vec<(String, i64)>,
    /// Entries merged since the previous reset.
    pub entries_merged: u64,
    /// Frames merged since the previous reset.
    pub frames_merged: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    // Merging does not panic midway, so a poisoned lock still guards a
    // consistent store.
    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merges one frame's entries with the update idiom, holding the lock
    /// for the whole batch. Returns the number of entries applied.
    pub fn merge(&self, entries: &[(String, i64)]) -> usize {
        let mut tally = self.lock();
        let applied = wc::reduce(&mut tally.store, entries);
        tally.entries_merged += applied as u64;
        tally.frames_merged += 1;
        applied
    }

    /// Current count for `key`, `0` when absent.
    pub fn lookup(&self, key: &str) -> i64 {
        self.lock().store.lookup(key)
    }

    /// Number of distinct words currently held.
    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out every entry in store iteration order.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let tally = self.lock();
        tally
            .store
            .iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect()
    }

    /// Takes every entry out and replaces the store with a fresh one.
    ///
    /// Uses the same lock as [`Aggregator::merge`], so a reset never runs
    /// while a frame is being merged.
    pub fn dump_and_reset(&self) -> Dump {
        let mut tally = self.lock();
        let dump = Dump {
            entries: tally
                .store
                .iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
            entries_merged: tally.entries_merged,
            frames_merged: tally.frames_merged,
        };
        *tally = Tally::default();
        dump
    }
}

impl fmt::Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}

/// Reads one frame from `stream` and merges it into `aggregator`.
///
/// On any error the aggregator is left untouched.
pub async fn handle_connection<S>(mut stream: S, aggregator: &Aggregator) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    let text = read_frame(&mut stream).await?;
    debug!(bytes = text.len(), "frame received");
    let entries = parse_entries(&text)?;
    Ok(aggregator.merge(&entries))
}

pub struct Reducer {
    aggregator: Arc<Aggregator>,
}

impl Reducer {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, "reducer listening");
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    continue;
                }
            };
            self.spawn_handler(stream, peer);
        }
    }

    fn spawn_handler(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let aggregator = Arc::clone(&self.aggregator);
        let span = info_span!("frame", id = %Uuid::new_v4(), %peer);
        tokio::spawn(
            async move {
                match handle_connection(stream, &aggregator).await {
                    Ok(applied) => info!(entries = applied, "merged frame"),
                    Err(e) => warn!("dropping connection: {}", e),
                }
            }
            .instrument(span),
        );
    }
}
