//! The `error` module defines the error types returned by `cmq`.
//!
//! Every failure in the broker is local and recoverable, so all operations
//! return [`Result`] and none of these errors are used for control flow
//! inside the crate.

use thiserror::Error;

use crate::broker::topic::SubscriberId;

/// A mailbox that rejected a message because it was at capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFull {
    pub topic: String,
    pub subscriber: SubscriberId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A stream with the same name is already registered.
    #[error("stream with the name `{0}` already exists")]
    DuplicateStream(String),

    /// No stream is registered under the given name.
    #[error("stream with the name `{0}` does not exist")]
    StreamNotFound(String),

    /// A stream was created without any topic filter.
    #[error("stream `{0}` needs at least one topic")]
    EmptyTopics(String),

    /// Point read past the end of a stream.
    #[error("index {index} out of range for stream of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The caller's cancellation token fired first.
    #[error("operation canceled")]
    Canceled,

    /// The caller's deadline elapsed first.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The mailbox was detached from the broker and has no buffered messages.
    #[error("mailbox closed")]
    Closed,

    /// One or more mailboxes were full during a checked publish.
    #[error("{} subscriber mailbox(es) full", .0.len())]
    SubscribersFull(Vec<SubscriberFull>),
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::DuplicateStream(_) => "duplicate_stream",
            Error::StreamNotFound(_) => "stream_not_found",
            Error::EmptyTopics(_) => "empty_topics",
            Error::IndexOutOfRange { .. } => "index_out_of_range",
            Error::Canceled => "canceled",
            Error::DeadlineExceeded => "deadline_exceeded",
            Error::Closed => "closed",
            Error::SubscribersFull(_) => "subscribers_full",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
