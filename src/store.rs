//! A string-keyed table of integer counts.
//!
//! [`KeyCountStore`] is a separately chained hash table. Every bucket holds
//! a singly linked chain that the table owns outright; new entries are
//! prepended, so the most recently inserted entry for a key is always the
//! first one found. The table doubles its bucket array once the number of
//! live entries reaches the bucket count.
//!
//! # Zero means absent
//!
//! A stored value of `0` is not representable. [`KeyCountStore::insert`]
//! silently ignores a zero value, and [`KeyCountStore::lookup`] returns
//! [`ABSENT`] (which is `0`) for a missing key, so callers cannot tell
//! "missing" apart from "zero". Callers must never try to store zero.

use std::fmt;
use std::iter;
use std::mem;

/// Returned by [`KeyCountStore::lookup`] when the key is not present.
pub const ABSENT: i64 = 0;

/// Bucket count of a freshly created store.
pub const INITIAL_CAPACITY: usize = 1024;

const GROWTH_FACTOR: usize = 2;
const MAX_LOAD_FACTOR: usize = 1;
const MULTIPLIER: u64 = 97;

type Link = Option<Box<Entry>>;

struct Entry {
    key: String,
    value: i64,
    next: Link,
}

/// Unseeded polynomial string hash, stable across runs and platforms.
pub fn hash_key(key: &str) -> u64 {
    key.bytes().fold(0u64, |h, b| {
        h.wrapping_mul(MULTIPLIER).wrapping_add(u64::from(b))
    })
}

pub struct KeyCountStore {
    buckets: Vec<Link>,
    len: usize,
}

impl KeyCountStore {
    /// Creates an empty store with [`INITIAL_CAPACITY`] buckets.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty store with `capacity` buckets (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buckets = Vec::with_capacity(capacity.max(1));
        buckets.resize_with(capacity.max(1), || None);
        Self { buckets, len: 0 }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Prepends `(key, value)` to the key's bucket chain.
    ///
    /// Does nothing when `key` is empty or `value` is zero. A key that is
    /// already present is not replaced; the new entry shadows the old one
    /// until it is deleted. Use [`crate::tally::accumulate`] to keep one
    /// entry per key.
    pub fn insert(&mut self, key: &str, value: i64) {
        if key.is_empty() || value == ABSENT {
            return;
        }

        self.push_entry(Box::new(Entry {
            key: key.to_owned(),
            value,
            next: None,
        }));

        if self.len >= self.capacity() * MAX_LOAD_FACTOR {
            self.grow();
        }
    }

    /// Value of the most recently inserted entry for `key`, or [`ABSENT`].
    pub fn lookup(&self, key: &str) -> i64 {
        self.chain(self.bucket_of(key))
            .find(|entry| entry.key == key)
            .map_or(ABSENT, |entry| entry.value)
    }

    /// Removes the most recently inserted entry for `key`, if any.
    pub fn delete(&mut self, key: &str) {
        let index = self.bucket_of(key);
        let position = match self.chain(index).position(|entry| entry.key == key) {
            Some(position) => position,
            None => return,
        };

        let mut cursor = &mut self.buckets[index];
        for _ in 0..position {
            match cursor {
                Some(entry) => cursor = &mut entry.next,
                None => return,
            }
        }

        if let Some(entry) = cursor.take() {
            *cursor = entry.next;
            self.len -= 1;
        }
    }

    /// Renders every entry as `key:value,` in iteration order.
    ///
    /// An empty store encodes to the empty string. The order depends on the
    /// bucket count, so two stores with equal contents but different
    /// capacities may encode differently.
    pub fn encode(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}:{},", key, value))
            .collect()
    }

    /// Iterates buckets in index order and each chain newest-first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: self.buckets.iter(),
            chain: None,
        }
    }

    fn bucket_of(&self, key: &str) -> usize {
        (hash_key(key) % self.buckets.len() as u64) as usize
    }

    fn chain(&self, index: usize) -> impl Iterator<Item = &Entry> {
        iter::successors(self.buckets[index].as_deref(), |entry| {
            entry.next.as_deref()
        })
    }

    fn push_entry(&mut self, mut entry: Box<Entry>) {
        let index = self.bucket_of(&entry.key);
        entry.next = self.buckets[index].take();
        self.buckets[index] = Some(entry);
        self.len += 1;
    }

    /// Rehashes every entry into a table twice the size, then swaps the
    /// new table's state into `self`. Entries are relinked, not copied.
    fn grow(&mut self) {
        let mut grown = Self::with_capacity(self.capacity() * GROWTH_FACTOR);
        for bucket in self.buckets.iter_mut() {
            let mut link = bucket.take();
            while let Some(mut entry) = link {
                link = entry.next.take();
                grown.push_entry(entry);
            }
        }
        mem::swap(self, &mut grown);
    }
}

impl Default for KeyCountStore {
    fn default() -> Self {
        Self::new()
    }
}

// Chains are unlinked one node at a time so a long chain cannot overflow
// the stack through recursive `Box` drops.
impl Drop for KeyCountStore {
    fn drop(&mut self) {
        for bucket in self.buckets.iter_mut() {
            let mut link = bucket.take();
            while let Some(mut entry) = link {
                link = entry.next.take();
            }
        }
    }
}

impl fmt::Debug for KeyCountStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a> {
    buckets: std::slice::Iter<'a, Link>,
    chain: Option<&'a Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, i64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.chain {
                self.chain = entry.next.as_deref();
                return Some((entry.key.as_str(), entry.value));
            }
            self.chain = self.buckets.next()?.as_deref();
        }
    }
}

impl<'a> IntoIterator for &'a KeyCountStore {
    type Item = (&'a str, i64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
