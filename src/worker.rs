//! The mapping node.
//!
//! Connections are served one at a time. Each one goes through the same
//! stages: read the chunk, normalize and count it into a store owned by
//! this connection alone, then open a fresh connection to the reducer and
//! send the counts as a single frame. No counts survive between chunks.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::codec::write_frame;
use crate::error::Result;
use crate::store::KeyCountStore;
use crate::workload::wc;

pub struct Worker {
    reducer_addr: String,
    max_chunk: usize,
}

impl Worker {
    /// A worker forwarding to `reducer_addr` and accepting at most
    /// `max_chunk` bytes per connection.
    pub fn new(reducer_addr: impl ToString, max_chunk: usize) -> Self {
        Self {
            reducer_addr: reducer_addr.to_string(),
            max_chunk,
        }
    }

    pub fn reducer_addr(&self) -> &str {
        &self.reducer_addr
    }

    /// Accepts and handles connections sequentially, forever.
    ///
    /// A failed chunk is logged and the next connection is accepted.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, reducer = %self.reducer_addr, "worker listening");
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    continue;
                }
            };

            let span = info_span!("chunk", id = %Uuid::new_v4(), %peer);
            match self.handle(stream).instrument(span.clone()).await {
                Ok(sent) => span.in_scope(|| info!(bytes = sent, "counts forwarded")),
                Err(e) => span.in_scope(|| warn!("chunk dropped: {}", e)),
            }
        }
    }

    /// Processes the chunk arriving on `stream`.
    ///
    /// Returns the size of the frame sent to the reducer. A chunk without
    /// words still sends a frame, with an empty payload.
    pub async fn handle<S>(&self, stream: S) -> Result<usize>
    where
        S: AsyncRead + Unpin,
    {
        let chunk = read_chunk(stream, self.max_chunk).await?;
        debug!(bytes = chunk.len(), "chunk received");

        let store = wc::map(chunk);
        debug!(words = store.len(), "chunk counted");

        self.forward(&store).await
    }

    async fn forward(&self, store: &KeyCountStore) -> Result<usize> {
        let mut stream = TcpStream::connect(self.reducer_addr.as_str()).await?;
        let written = write_frame(&mut stream, store).await?;
        stream.shutdown().await?;
        Ok(written)
    }
}

/// Reads until end-of-stream or `max` bytes, whichever comes first, then
/// drops (closes) the stream.
pub async fn read_chunk<S>(stream: S, max: usize) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut chunk = Vec::with_capacity(max);
    stream.take(max as u64).read_to_end(&mut chunk).await?;
    Ok(chunk)
}
