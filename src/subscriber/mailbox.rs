//! Bounded mailbox
//!
//! The broker pushes into a mailbox with `try_offer`, which never blocks:
//! a full or closed mailbox rejects the message and the publisher moves on.
//! The receiving side parks on a `Notify` until a message lands or the
//! mailbox is closed.
//!
//! Receivers that are currently parked count towards the capacity, so a
//! capacity of zero behaves like a rendezvous: an offer only succeeds while
//! someone is waiting to take it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::utils::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OfferError {
    Full,
    Closed,
}

#[derive(Debug)]
struct State<T> {
    queue: VecDeque<T>,
    waiting: usize,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Mailbox<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                waiting: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Enqueue without blocking.
    pub(crate) fn try_offer(&self, message: T) -> std::result::Result<(), OfferError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(OfferError::Closed);
            }
            if state.queue.len() >= self.capacity + state.waiting {
                return Err(OfferError::Full);
            }
            state.queue.push_back(message);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Pop the oldest message, if any. Fails with `Closed` once the mailbox is
    /// closed and drained.
    pub(crate) fn try_recv(&self) -> Result<Option<T>> {
        let mut state = self.lock();
        match state.queue.pop_front() {
            Some(message) => Ok(Some(message)),
            None if state.closed => Err(Error::Closed),
            None => Ok(None),
        }
    }

    /// Wait for the next message. Cancel-safe: dropping the future never
    /// loses a message.
    pub(crate) async fn recv(&self) -> Result<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the queue so an offer that lands in
            // between still wakes us.
            notified.as_mut().enable();

            let _parked = {
                let mut state = self.lock();
                if let Some(message) = state.queue.pop_front() {
                    return Ok(message);
                }
                if state.closed {
                    return Err(Error::Closed);
                }
                state.waiting += 1;
                Parked(self)
            };

            notified.await;
        }
    }

    /// Reject further offers and wake every parked receiver. Messages already
    /// queued can still be received.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts a receiver as parked for as long as it lives.
struct Parked<'a, T>(&'a Mailbox<T>);

impl<T> Drop for Parked<'_, T> {
    fn drop(&mut self) {
        self.0.lock().waiting -= 1;
    }
}
