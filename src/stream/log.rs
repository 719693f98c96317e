//! Append-only message log
//!
//! A `Stream` stores every message published to one of its topics, in
//! insertion order, for the lifetime of the broker. Messages are never
//! removed or reordered, which is what lets independent consumers replay the
//! same sequence at their own pace.
//!
//! Concurrency note: the log sits behind an `RwLock`; appends take the write
//! side, point reads take the read side. The topic filter is fixed at
//! construction and needs no lock.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::utils::error::{Error, Result};

#[derive(Debug)]
pub struct Stream<T> {
    name: String,
    topics: BTreeSet<String>,
    messages: RwLock<Vec<T>>,
}

impl<T> Stream<T> {
    /// Create a stream that accepts messages published on any of `topics`.
    ///
    /// Fails with `EmptyTopics` when no topic is given; duplicates collapse.
    pub fn new<I, S>(name: impl Into<String>, topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let topics: BTreeSet<String> = topics.into_iter().map(Into::into).collect();

        if topics.is_empty() {
            return Err(Error::EmptyTopics(name));
        }

        Ok(Self {
            name,
            topics,
            messages: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topic filter, in sorted order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    /// Whether messages published on `topic` are stored in this stream.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Append a message to the end of the log.
    pub fn insert(&self, message: T) {
        self.write().push(message);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-written, so a
    // poisoned guard is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.messages.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.messages.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> Stream<T> {
    /// Read the message at `index` without consuming it.
    ///
    /// Fails with `IndexOutOfRange` when `index` is at or past the end.
    pub fn fetch(&self, index: usize) -> Result<T> {
        let messages = self.read();
        messages
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: messages.len(),
            })
    }
}
