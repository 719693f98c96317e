//! Polling consumer
//!
//! A `Consumer` reads one `Stream` through its own offset. A background task
//! wakes on a fixed interval, reads the message at the current offset and, if
//! there is one, moves it into a local pending buffer that callers drain with
//! `fetch`. Because the stream keeps every message, a consumer that falls
//! behind loses nothing; it only catches up later.
//!
//! Lifecycle:
//! ```text
//! Created ──start()──► Running ──stop() / token cancelled──► Stopped
//!    └───────────────────stop()──────────────────────────────────┘
//! ```
//! `Stopped` is terminal. Offset, pending buffer and lifecycle share one
//! mutex, and the poll step re-checks the lifecycle under it, so once `stop()`
//! returns no caller can observe the offset move again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::stream::Stream;
use crate::utils::cancel::{Interrupt, race};
use crate::utils::error::Result;

/// Poll interval used when none is given.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Created,
    Running,
    Stopped,
}

#[derive(Debug)]
struct State<T> {
    offset: usize,
    pending: VecDeque<T>,
    lifecycle: ConsumerState,
}

#[derive(Debug)]
struct Inner<T> {
    stream: Arc<Stream<T>>,
    interval: Duration,
    state: Mutex<State<T>>,
    ready: Notify,
    close: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
pub struct Consumer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Consumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(stream: Arc<Stream<T>>) -> Self {
        Self::with_interval(stream, DEFAULT_POLL_INTERVAL)
    }

    /// Intervals shorter than a millisecond are rounded up to one.
    pub fn with_interval(stream: Arc<Stream<T>>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                stream,
                interval: interval.max(Duration::from_millis(1)),
                state: Mutex::new(State {
                    offset: 0,
                    pending: VecDeque::new(),
                    lifecycle: ConsumerState::Created,
                }),
                ready: Notify::new(),
                close: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Start polling in the background. Only the first call from `Created`
    /// has any effect. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        self.spawn(None);
    }

    /// Like [`start`](Self::start), but polling also ends, and the consumer
    /// moves to `Stopped`, when `token` is cancelled.
    pub fn start_with_cancellation(&self, token: CancellationToken) {
        self.spawn(Some(token));
    }

    fn spawn(&self, token: Option<CancellationToken>) {
        {
            let mut state = self.inner.lock();
            if state.lifecycle != ConsumerState::Created {
                return;
            }
            state.lifecycle = ConsumerState::Running;
        }

        debug!(
            stream = %self.inner.stream.name(),
            interval_ms = self.inner.interval.as_millis() as u64,
            "consumer started"
        );

        let mut worker = self.inner.worker();
        *worker = Some(tokio::spawn(poll_loop(
            self.inner.clone(),
            token.unwrap_or_else(CancellationToken::new),
        )));
    }

    /// Stop polling. Safe to call in any state and more than once.
    pub fn stop(&self) {
        let previous = {
            let mut state = self.inner.lock();
            std::mem::replace(&mut state.lifecycle, ConsumerState::Stopped)
        };
        self.inner.close.cancel();

        if previous != ConsumerState::Stopped {
            debug!(stream = %self.inner.stream.name(), offset = self.offset(), "consumer stopped");
        }
    }

    /// Stop polling and wait for the background task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let worker = self.inner.worker().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl<T> Consumer<T> {
    /// Wait until at least one message is buffered or `token` is cancelled.
    ///
    /// Returns immediately when messages are already pending.
    pub async fn wait(&self, token: &CancellationToken) -> Result<()> {
        if self.pending_len() > 0 {
            return Ok(());
        }
        race(self.inner.readiness(), Interrupt::Token(token)).await
    }

    /// Wait until at least one message is buffered, for at most `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        if self.pending_len() > 0 {
            return Ok(());
        }
        race(self.inner.readiness(), Interrupt::Timeout(timeout)).await
    }

    /// Pop the oldest buffered message without blocking.
    pub fn fetch(&self) -> Option<T> {
        self.inner.lock().pending.pop_front()
    }

    pub fn state(&self) -> ConsumerState {
        self.inner.lock().lifecycle
    }

    /// Index of the next stream message this consumer will read.
    pub fn offset(&self) -> usize {
        self.inner.lock().offset
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn stream_name(&self) -> &str {
        self.inner.stream.name()
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.inner.close.cancel();
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolves once the pending buffer is non-empty. Wakeups that find the
    /// buffer drained by someone else go back to waiting.
    async fn readiness(&self) {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.lock().pending.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl<T: Clone> Inner<T> {
    /// One poll step: move at most one stream message into the buffer.
    fn poll(&self) {
        let mut state = self.lock();
        if state.lifecycle != ConsumerState::Running {
            return;
        }

        // Nothing at this offset yet; try again next tick.
        let Ok(message) = self.stream.fetch(state.offset) else {
            return;
        };

        state.offset += 1;
        let was_empty = state.pending.is_empty();
        state.pending.push_back(message);
        trace!(stream = %self.stream.name(), offset = state.offset, "consumer polled message");
        drop(state);

        if was_empty {
            self.ready.notify_waiters();
        }
    }
}

async fn poll_loop<T: Clone>(inner: Arc<Inner<T>>, token: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            biased;
            _ = inner.close.cancelled() => break,
            _ = token.cancelled() => break,
            _ = ticker.tick() => inner.poll(),
        }
    }

    let previous = {
        let mut state = inner.lock();
        std::mem::replace(&mut state.lifecycle, ConsumerState::Stopped)
    };
    if previous == ConsumerState::Running {
        debug!(stream = %inner.stream.name(), "consumer cancelled");
    }
}
