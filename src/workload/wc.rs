//! A MapReduce-compatible implementation of word count.
//!
//! Chunks are raw bytes cut at fixed offsets, so a chunk may end in the
//! middle of a word or of a multi-byte character. Everything here works on
//! bytes and only converts finished tokens to strings (lossily).

use std::borrow::Cow;

use crate::store::KeyCountStore;
use crate::tally::{accumulate, merge_entries};

/// Rewrites `chunk` in place: ASCII punctuation is dropped, ASCII letters
/// are lower-cased and every `\n` becomes a space. Other bytes pass through
/// in their original order.
pub fn normalize(chunk: &mut Vec<u8>) {
    chunk.retain(|b| !b.is_ascii_punctuation());
    for b in chunk.iter_mut() {
        match *b {
            b'\n' => *b = b' ',
            _ => b.make_ascii_lowercase(),
        }
    }
}

/// Splits normalized text on whitespace, skipping empty tokens.
///
/// Whitespace is the C locale set: ASCII whitespace plus vertical tab.
pub fn tokenize(text: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    text.split(|&b| is_space(b))
        .filter(|token| !token.is_empty())
        .map(String::from_utf8_lossy)
}

fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

/// Normalizes and counts one chunk into a fresh store.
pub fn map(mut chunk: Vec<u8>) -> KeyCountStore {
    normalize(&mut chunk);
    let mut store = KeyCountStore::new();
    for word in tokenize(&chunk) {
        accumulate(&mut store, &word, 1);
    }
    store
}

/// Folds one chunk's parsed counts into the running totals.
pub fn reduce(totals: &mut KeyCountStore, entries: &[(String, i64)]) -> usize {
    merge_entries(totals, entries.iter().map(|(key, count)| (key.as_str(), *count)))
}
