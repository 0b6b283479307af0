//! Wire format between a worker and the reducer.
//!
//! One frame per connection: a 4-byte big-endian payload length followed
//! by the payload, which is [`KeyCountStore::encode`] text
//! (`key:value,` repeated). Keys are not escaped; the worker strips
//! punctuation before counting, so `:` and `,` never occur in a key.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::store::KeyCountStore;

pub const HEADER_LEN: usize = 4;

/// Largest payload a reader accepts before giving up on the peer.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Builds the frame for `store`.
pub fn encode_frame(store: &KeyCountStore) -> Result<Bytes> {
    frame_text(&store.encode())
}

/// Prefixes `text` with its byte length.
pub fn frame_text(text: &str) -> Result<Bytes> {
    let len = u32::try_from(text.len())
        .map_err(|_| Error::protocol(format!("payload of {} bytes does not fit a frame", text.len())))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + text.len());
    buf.put_u32(len);
    buf.put_slice(text.as_bytes());
    Ok(buf.freeze())
}

/// Writes the frame for `store` and flushes, returning the bytes written.
pub async fn write_frame<W>(writer: &mut W, store: &KeyCountStore) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(store)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(frame.len())
}

/// Reads one frame and returns its payload text.
pub async fn read_frame<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    read_full(reader, &mut header).await?;
    let len = (&header[..]).get_u32() as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::protocol(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len, MAX_FRAME_LEN
        )));
    }

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload).await?;
    String::from_utf8(payload).map_err(|e| Error::protocol(format!("payload is not UTF-8: {}", e)))
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut received = 0;
    while received < buf.len() {
        let n = reader.read(&mut buf[received..]).await?;
        if n == 0 {
            return Err(Error::Framing {
                expected: buf.len(),
                received,
            });
        }
        received += n;
    }
    Ok(())
}

/// Splits payload text into `(key, value)` pairs.
///
/// Tokens are separated by `,` or `:` and must alternate key, value. Empty
/// tokens are skipped, so the trailing comma is harmless. A dangling key
/// or a value that is not an integer is a protocol error.
pub fn parse_entries(text: &str) -> Result<Vec<(String, i64)>> {
    let mut tokens = text.split([',', ':']).filter(|token| !token.is_empty());
    let mut entries = Vec::new();

    while let Some(key) = tokens.next() {
        let raw = tokens
            .next()
            .ok_or_else(|| Error::protocol(format!("key `{}` has no value", key)))?;
        let value = raw.parse::<i64>().map_err(|_| {
            Error::protocol(format!("value `{}` for key `{}` is not an integer", raw, key))
        })?;
        entries.push((key.to_owned(), value));
    }

    Ok(entries)
}
