//! Subscriber handle
//!
//! A `Subscriber` is the receiving end of one mailbox registered on a topic.
//! Delivery is at-most-once: the broker never waits for a subscriber, so a
//! message published while the mailbox is full is lost for that subscriber.
//!
//! Dropping the handle closes the mailbox; the broker skips closed mailboxes
//! on publish and prunes them on the next subscribe to the same topic.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::broker::topic::SubscriberId;
use crate::subscriber::mailbox::Mailbox;
use crate::utils::cancel::{Interrupt, race};
use crate::utils::error::Result;

#[derive(Debug)]
pub struct Subscriber<T> {
    id: SubscriberId,
    topic: String,
    mailbox: Arc<Mailbox<T>>,
}

impl<T> Subscriber<T> {
    /// Create a handle with a fresh id, returning the mailbox the broker
    /// should keep.
    pub(crate) fn new(topic: &str, capacity: usize) -> (Self, Arc<Mailbox<T>>) {
        let mailbox = Arc::new(Mailbox::new(capacity));
        let subscriber = Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            mailbox: mailbox.clone(),
        };
        (subscriber, mailbox)
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// Number of messages waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Whether the broker has detached this subscriber.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Wait for the next message or until `token` is cancelled.
    ///
    /// Returns `Canceled` if the token fires first and `Closed` once the
    /// subscriber was detached and its mailbox drained.
    pub async fn fetch(&self, token: &CancellationToken) -> Result<T> {
        race(self.mailbox.recv(), Interrupt::Token(token)).await?
    }

    /// Wait for the next message for at most `timeout`.
    ///
    /// Returns `DeadlineExceeded` if nothing arrived in time.
    pub async fn fetch_timeout(&self, timeout: Duration) -> Result<T> {
        race(self.mailbox.recv(), Interrupt::Timeout(timeout)).await?
    }

    /// Take a message if one is already waiting.
    pub fn try_fetch(&self) -> Result<Option<T>> {
        self.mailbox.try_recv()
    }
}

impl<T> Drop for Subscriber<T> {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}
