//! The update idiom every caller uses to accumulate counts.
//!
//! [`KeyCountStore`] itself never merges values: inserting an existing key
//! just shadows the old entry. Going through [`accumulate`] for every
//! mutation keeps exactly one live entry per key.

use crate::store::{KeyCountStore, ABSENT};

/// Adds `delta` to the count for `key`.
///
/// Looks the key up; when absent, inserts `delta`, otherwise deletes the
/// old entry and inserts the sum. A sum of zero leaves the key absent, and
/// a zero `delta` on a missing key stores nothing.
pub fn accumulate(store: &mut KeyCountStore, key: &str, delta: i64) {
    let existing = store.lookup(key);
    if existing == ABSENT {
        store.insert(key, delta);
    } else {
        store.delete(key);
        store.insert(key, existing.saturating_add(delta));
    }
}

/// Applies [`accumulate`] to every pair, returning how many were applied.
pub fn merge_entries<K, I>(store: &mut KeyCountStore, entries: I) -> usize
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, i64)>,
{
    let mut applied = 0;
    for (key, delta) in entries {
        accumulate(store, key.as_ref(), delta);
        applied += 1;
    }
    applied
}
