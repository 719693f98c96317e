//! # cmq
//!
//! `cmq` is an in-process mock message queue for exercising pub/sub and
//! log-consumption patterns without running a real broker.
//!
//! It offers two delivery semantics over messages keyed by topic:
//!
//! - **at-most-once** fan-out through [`Subscriber`]s: each subscription has a
//!   bounded mailbox, and a message published while the mailbox is full is
//!   dropped for that subscriber only.
//! - **at-least-once** replay through [`Stream`]s: named, topic-filtered,
//!   append-only logs read by [`Consumer`]s that each keep their own offset and
//!   poll in the background.
//!
//! ## Core Modules
//!
//! - `broker`: topic and stream registries, publish-time routing.
//! - `stream`: the append-only log.
//! - `subscriber`: mailboxes and the subscriber handle.
//! - `consumer`: the offset-tracking polling consumer.
//! - `config`: loading settings from file and environment.
//! - `utils`: error type, logging setup.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod stream;
pub mod subscriber;
pub mod utils;

pub use broker::Broker;
pub use consumer::{Consumer, ConsumerState};
pub use stream::Stream;
pub use subscriber::Subscriber;
pub use tokio_util::sync::CancellationToken;
pub use utils::error::{Error, Result, SubscriberFull};
