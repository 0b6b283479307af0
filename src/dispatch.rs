//! Splits an input stream into chunks and deals them out to workers.
//!
//! Chunks go to the configured endpoints in round-robin order. After
//! `batch_size` chunks the batch's sends are awaited together and the
//! round-robin position starts over at the first endpoint, so at most
//! `batch_size` sends are in flight at once. Dispatch is fire-and-forget:
//! a send completes once the chunk is written, not once it is counted.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Where one worker listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEndpoint {
    pub addr: String,
    pub port: u16,
    pub label: String,
}

impl WorkerEndpoint {
    pub fn new(addr: impl ToString, port: u16, label: impl ToString) -> Self {
        Self {
            addr: addr.to_string(),
            port,
            label: label.to_string(),
        }
    }

    /// `addr:port`, ready for connecting.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.label, self.addr, self.port)
    }
}

/// Parses `label=host:port` or plain `host:port` (labelled by its address).
impl FromStr for WorkerEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (label, target) = match s.split_once('=') {
            Some((label, target)) => (label.trim(), target.trim()),
            None => (s.trim(), s.trim()),
        };
        let (addr, port) = target
            .rsplit_once(':')
            .ok_or_else(|| Error::Config(format!("worker `{}` is not host:port", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("worker `{}` has an invalid port", s)))?;
        if addr.is_empty() || label.is_empty() {
            return Err(Error::Config(format!("worker `{}` is incomplete", s)));
        }
        Ok(Self::new(addr, port, label))
    }
}

/// The four local workers used when nothing else is configured.
pub fn default_endpoints() -> Vec<WorkerEndpoint> {
    (0..4)
        .map(|i| WorkerEndpoint::new("127.0.0.1", 8888 + i, format!("W{}", i)))
        .collect()
}

/// Parses a JSON array of `{ "addr", "port", "label" }` objects.
pub fn parse_endpoints(json: &str) -> Result<Vec<WorkerEndpoint>> {
    serde_json::from_str(json).map_err(|e| Error::Config(format!("bad worker list: {}", e)))
}

pub fn load_endpoints(path: impl AsRef<Path>) -> Result<Vec<WorkerEndpoint>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_endpoints(&json)
}

/// Opens `paths` as one continuous stream, in order.
///
/// Chunks may span a file boundary, and the round-robin carries on from
/// one file into the next instead of restarting at the first worker.
pub async fn open_inputs(paths: &[PathBuf]) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    let mut input: Box<dyn AsyncRead + Unpin + Send> = Box::new(tokio::io::empty());
    for path in paths {
        let file = File::open(path)
            .await
            .map_err(|e| Error::Config(format!("cannot open {}: {}", path.display(), e)))?;
        input = Box::new(input.chain(file));
    }
    Ok(input)
}

/// A chunk whose send failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChunk {
    pub index: usize,
    pub worker: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct DispatchReport {
    pub chunks: usize,
    pub bytes: usize,
    pub batches: usize,
    pub failed: Vec<FailedChunk>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dispatched {} chunks ({} bytes) in {} batches, {} failed",
            self.chunks,
            self.bytes,
            self.batches,
            self.failed.len()
        )?;
        for failed in &self.failed {
            writeln!(f, "  chunk {} -> {}: {}", failed.index, failed.worker, failed.reason)?;
        }
        Ok(())
    }
}

type PendingSend = (usize, String, JoinHandle<Result<()>>);

#[derive(Debug)]
pub struct Dispatcher {
    endpoints: Vec<WorkerEndpoint>,
    batch_size: usize,
    chunk_size: usize,
}

impl Dispatcher {
    /// Requires at least one endpoint, `1 <= batch_size <= endpoints.len()`
    /// and a non-zero chunk size.
    pub fn new(endpoints: Vec<WorkerEndpoint>, batch_size: usize, chunk_size: usize) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::Config("no worker endpoints configured".into()));
        }
        if batch_size == 0 || batch_size > endpoints.len() {
            return Err(Error::Config(format!(
                "batch size must be between 1 and {}, got {}",
                endpoints.len(),
                batch_size
            )));
        }
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be positive".into()));
        }
        Ok(Self {
            endpoints,
            batch_size,
            chunk_size,
        })
    }

    pub fn endpoints(&self) -> &[WorkerEndpoint] {
        &self.endpoints
    }

    /// Reads `input` to the end, sending every chunk to a worker.
    ///
    /// A failed send is recorded in the report and does not stop the run;
    /// an error reading `input` does.
    pub async fn run<R>(&self, mut input: R) -> Result<DispatchReport>
    where
        R: AsyncRead + Unpin,
    {
        let mut report = DispatchReport::default();
        let mut batch: Vec<PendingSend> = Vec::with_capacity(self.batch_size);
        let mut slot = 0;

        loop {
            let chunk = read_chunk(&mut input, self.chunk_size).await?;
            if chunk.is_empty() {
                break;
            }

            let endpoint = self.endpoints[slot % self.endpoints.len()].clone();
            let index = report.chunks;
            info!(index, bytes = chunk.len(), worker = %endpoint, "assigning chunk");
            report.chunks += 1;
            report.bytes += chunk.len();

            let label = endpoint.label.clone();
            let handle = tokio::spawn(async move { send_chunk(&endpoint, chunk).await });
            batch.push((index, label, handle));

            slot += 1;
            if slot == self.batch_size {
                finish_batch(&mut batch, &mut report).await;
                slot = 0;
            }
        }

        if !batch.is_empty() {
            finish_batch(&mut batch, &mut report).await;
        }
        Ok(report)
    }
}

async fn finish_batch(batch: &mut Vec<PendingSend>, report: &mut DispatchReport) {
    for (index, worker, handle) in batch.drain(..) {
        let reason = match handle.await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("send task failed: {}", e),
        };
        warn!(index, %worker, "chunk not delivered: {}", reason);
        report.failed.push(FailedChunk {
            index,
            worker,
            reason,
        });
    }
    report.batches += 1;
    debug!(batches = report.batches, "batch complete");
}

/// Fills up to `size` bytes, stopping early only at end of input.
async fn read_chunk<R>(input: &mut R, size: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(size);
    input.take(size as u64).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

async fn send_chunk(endpoint: &WorkerEndpoint, chunk: Bytes) -> Result<()> {
    let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;
    stream.write_all(&chunk).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    async fn fake_worker(index: usize, tx: mpsc::UnboundedSender<(usize, Vec<u8>)>) -> WorkerEndpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut chunk = Vec::new();
                stream.read_to_end(&mut chunk).await.unwrap();
                if tx.send((index, chunk)).is_err() {
                    break;
                }
            }
        });
        WorkerEndpoint::new("127.0.0.1", port, format!("W{}", index))
    }

    async fn assignments(workers: usize, batch_size: usize, chunks: usize) -> BTreeMap<String, usize> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut endpoints = Vec::new();
        for i in 0..workers {
            endpoints.push(fake_worker(i, tx.clone()).await);
        }

        let input: String = (0..chunks).map(|i| format!("{:04}", i)).collect();
        let dispatcher = Dispatcher::new(endpoints, batch_size, 4).unwrap();
        let report = dispatcher.run(input.as_bytes()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.chunks, chunks);
        assert_eq!(report.bytes, chunks * 4);
        assert_eq!(report.batches, (chunks + batch_size - 1) / batch_size);

        let mut seen = BTreeMap::new();
        for _ in 0..chunks {
            let (worker, chunk) = rx.recv().await.unwrap();
            seen.insert(String::from_utf8(chunk).unwrap(), worker);
        }
        seen
    }

    #[tokio::test]
    async fn round_robin_over_all_workers() {
        let seen = assignments(3, 3, 7).await;
        for (i, (chunk, worker)) in seen.iter().enumerate() {
            assert_eq!(chunk, &format!("{:04}", i));
            assert_eq!(*worker, i % 3);
        }
    }

    #[tokio::test]
    async fn batch_boundary_restarts_at_first_worker() {
        let seen = assignments(4, 2, 9).await;
        assert_eq!(seen.len(), 9);
        for (i, worker) in seen.values().enumerate() {
            assert_eq!(*worker, i % 2);
        }
    }

    #[tokio::test]
    async fn last_chunk_may_be_short() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let endpoint = fake_worker(0, tx).await;
        let dispatcher = Dispatcher::new(vec![endpoint], 1, 4).unwrap();

        let report = dispatcher.run(&b"abcdefghij"[..]).await.unwrap();
        assert_eq!(report.chunks, 3);

        let mut chunks = Vec::new();
        for _ in 0..3 {
            chunks.push(rx.recv().await.unwrap().1);
        }
        chunks.sort();
        assert_eq!(chunks, vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]);
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let dispatcher = Dispatcher::new(default_endpoints(), 4, 16).unwrap();
        let report = dispatcher.run(&b""[..]).await.unwrap();
        assert_eq!(report.chunks, 0);
        assert_eq!(report.batches, 0);
    }

    #[tokio::test]
    async fn unreachable_worker_is_tallied() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let live = fake_worker(0, tx).await;
        let dead = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            WorkerEndpoint::new("127.0.0.1", listener.local_addr().unwrap().port(), "dead")
        };

        let dispatcher = Dispatcher::new(vec![live, dead], 2, 2).unwrap();
        let report = dispatcher.run(&b"aabbccdd"[..]).await.unwrap();

        assert_eq!(report.chunks, 4);
        assert!(!report.is_success());
        let failed: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![1, 3]);
        assert!(report.failed.iter().all(|f| f.worker == "dead"));

        let mut delivered = vec![rx.recv().await.unwrap().1, rx.recv().await.unwrap().1];
        delivered.sort();
        assert_eq!(delivered, vec![b"aa".to_vec(), b"cc".to_vec()]);
    }

    #[tokio::test]
    async fn rotation_continues_across_files() {
        let dir = std::env::temp_dir().join(format!("wclite-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let paths = vec![dir.join("a.txt"), dir.join("b.txt")];
        fs::write(&paths[0], "aaaab").unwrap();
        fs::write(&paths[1], "bbbcccc").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let endpoints = vec![fake_worker(0, tx.clone()).await, fake_worker(1, tx).await];
        let dispatcher = Dispatcher::new(endpoints, 2, 4).unwrap();

        let input = open_inputs(&paths).await.unwrap();
        let report = dispatcher.run(input).await.unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert!(report.is_success());
        assert_eq!(report.chunks, 3);

        let mut seen = BTreeMap::new();
        for _ in 0..3 {
            let (worker, chunk) = rx.recv().await.unwrap();
            seen.insert(String::from_utf8(chunk).unwrap(), worker);
        }
        let expected: BTreeMap<String, usize> = [("aaaa", 0), ("bbbb", 1), ("cccc", 0)]
            .iter()
            .map(|(chunk, worker)| (chunk.to_string(), *worker))
            .collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn missing_input_is_a_config_error() {
        let missing = std::env::temp_dir().join(format!("wclite-{}.txt", uuid::Uuid::new_v4()));
        assert!(matches!(open_inputs(&[missing]).await, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(Dispatcher::new(Vec::new(), 1, 10), Err(Error::Config(_))));
        assert!(matches!(Dispatcher::new(default_endpoints(), 0, 10), Err(Error::Config(_))));
        assert!(matches!(Dispatcher::new(default_endpoints(), 5, 10), Err(Error::Config(_))));
        assert!(matches!(Dispatcher::new(default_endpoints(), 4, 0), Err(Error::Config(_))));
    }

    #[test]
    fn parses_endpoint_specs() {
        let labelled: WorkerEndpoint = "W7=10.0.0.2:9000".parse().unwrap();
        assert_eq!(labelled, WorkerEndpoint::new("10.0.0.2", 9000, "W7"));
        assert_eq!(labelled.to_string(), "W7 (10.0.0.2:9000)");

        let bare: WorkerEndpoint = "localhost:8888".parse().unwrap();
        assert_eq!(bare.label, "localhost:8888");
        assert_eq!(bare.socket_addr(), "localhost:8888");

        assert!("nohost".parse::<WorkerEndpoint>().is_err());
        assert!("W0=host:notaport".parse::<WorkerEndpoint>().is_err());
    }

    #[test]
    fn parses_endpoint_json() {
        let json = r#"[{"addr": "127.0.0.1", "port": 8888, "label": "W0"},
                       {"addr": "127.0.0.1", "port": 8889, "label": "W1"}]"#;
        let endpoints = parse_endpoints(json).unwrap();
        assert_eq!(endpoints, default_endpoints()[..2].to_vec());
        assert!(matches!(parse_endpoints("{}"), Err(Error::Config(_))));
    }
}
