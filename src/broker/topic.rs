//! Topic management
//!
//! A `Topic` holds the mailboxes subscribed to one topic name, in
//! subscription order. Publishing offers a message to each of them without
//! blocking.
//!
//! Concurrency note: callers must synchronize access to `Topic` (the broker
//! keeps every topic behind its registry lock).

use std::sync::Arc;

use tracing::trace;

use crate::subscriber::mailbox::{Mailbox, OfferError};

pub type SubscriberId = String;

#[derive(Debug)]
struct Entry<T> {
    id: SubscriberId,
    mailbox: Arc<Mailbox<T>>,
}

#[derive(Debug)]
pub struct Topic<T> {
    pub name: String,
    subscribers: Vec<Entry<T>>,
}

impl<T> Topic<T> {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, id: SubscriberId, mailbox: Arc<Mailbox<T>>) {
        self.subscribers.push(Entry { id, mailbox });
    }

    /// Detach a subscriber and close its mailbox. Returns whether it was found.
    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        match self.subscribers.iter().position(|e| &e.id == id) {
            Some(pos) => {
                self.subscribers.remove(pos).mailbox.close();
                true
            }
            None => false,
        }
    }

    /// Forget mailboxes whose handle has been dropped. Returns how many went.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|e| !e.mailbox.is_closed());
        before - self.subscribers.len()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.iter().any(|e| &e.id == id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<T: Clone> Topic<T> {
    /// Offer `message` to every subscriber once. Returns the ids of the
    /// subscribers whose mailbox was full.
    pub(crate) fn offer(&self, message: &T) -> Vec<SubscriberId> {
        let mut full = Vec::new();
        for entry in &self.subscribers {
            match entry.mailbox.try_offer(message.clone()) {
                Ok(()) => {}
                Err(OfferError::Full) => {
                    trace!(topic = %self.name, subscriber = %entry.id, "mailbox full, message dropped");
                    full.push(entry.id.clone());
                }
                Err(OfferError::Closed) => {}
            }
        }
        full
    }
}
