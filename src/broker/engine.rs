//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - keeping the topic → subscriber registry and the name → stream registry
//! - routing each published message to live subscribers (at-most-once) and
//!   to every stream whose topic filter matches (at-least-once)
//! - creating subscribers and consumers
//!
//! Concurrency and usage notes:
//! - Every method takes `&self`; share the broker as `Arc<Broker<T>>`.
//! - Registration (`register_stream`, `subscribe`, `unsubscribe`) takes the
//!   registry write locks; `publish` only takes read locks, so publishes run
//!   concurrently with each other but never see a registry mid-update.
//! - Nothing in here blocks: mailboxes are offered with `try_offer`, and a
//!   full mailbox just misses the message.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::debug;

use crate::broker::topic::Topic;
use crate::config::{BrokerSettings, ConsumerSettings};
use crate::consumer::Consumer;
use crate::stream::Stream;
use crate::subscriber::Subscriber;
use crate::utils::error::{Error, Result, SubscriberFull};

#[derive(Debug)]
pub struct Broker<T> {
    topics: RwLock<HashMap<String, Topic<T>>>,
    streams: RwLock<HashMap<String, Arc<Stream<T>>>>,
    settings: BrokerSettings,
    consumer_settings: ConsumerSettings,
}

impl<T> Default for Broker<T> {
    fn default() -> Self {
        Self::with_settings(BrokerSettings::default(), ConsumerSettings::default())
    }
}

impl<T> Broker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: BrokerSettings, consumer_settings: ConsumerSettings) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            streams: RwLock::new(HashMap::new()),
            settings,
            consumer_settings,
        }
    }

    /// Register a stream under its name. Fails with `DuplicateStream` if the
    /// name is taken, leaving the existing stream untouched.
    pub fn register_stream(&self, stream: Stream<T>) -> Result<Arc<Stream<T>>> {
        let mut streams = self.streams_write();
        if streams.contains_key(stream.name()) {
            return Err(Error::DuplicateStream(stream.name().to_string()));
        }

        let stream = Arc::new(stream);
        streams.insert(stream.name().to_string(), stream.clone());
        debug!(stream = %stream.name(), topics = ?stream.topics().collect::<Vec<_>>(), "stream registered");
        Ok(stream)
    }

    /// Subscribe to `topic` with the configured default mailbox capacity.
    pub fn subscribe(&self, topic: &str) -> Subscriber<T> {
        self.subscribe_with_capacity(topic, self.settings.mailbox_capacity)
    }

    pub fn subscribe_with_capacity(&self, topic: &str, capacity: usize) -> Subscriber<T> {
        let (subscriber, mailbox) = Subscriber::new(topic, capacity);

        let mut topics = self.topics_write();
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));
        let pruned = entry.prune_closed();
        entry.subscribe(subscriber.id().clone(), mailbox);

        debug!(topic, subscriber = %subscriber.id(), capacity, pruned, "subscribed");
        subscriber
    }

    /// Detach `subscriber` from its topic and close its mailbox. Messages
    /// already in the mailbox can still be fetched.
    pub fn unsubscribe(&self, subscriber: &Subscriber<T>) -> bool {
        let mut topics = self.topics_write();
        let removed = topics
            .get_mut(subscriber.topic())
            .is_some_and(|t| t.unsubscribe(subscriber.id()));
        if removed {
            debug!(topic = %subscriber.topic(), subscriber = %subscriber.id(), "unsubscribed");
        }
        removed
    }

    /// Look up a registered stream.
    pub fn stream(&self, name: &str) -> Option<Arc<Stream<T>>> {
        self.streams_read().get(name).cloned()
    }

    /// Names of every registered stream, sorted.
    pub fn stream_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.streams_read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of mailboxes currently listed under `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics_read().get(topic).map_or(0, Topic::len)
    }

    fn topics_read(&self) -> RwLockReadGuard<'_, HashMap<String, Topic<T>>> {
        self.topics.read().unwrap_or_else(|e| e.into_inner())
    }

    fn topics_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Topic<T>>> {
        self.topics.write().unwrap_or_else(|e| e.into_inner())
    }

    fn streams_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Stream<T>>>> {
        self.streams.read().unwrap_or_else(|e| e.into_inner())
    }

    fn streams_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Stream<T>>>> {
        self.streams.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> Broker<T> {
    /// Publish `message` on `topic`.
    ///
    /// Subscribers whose mailbox is full miss the message; every stream that
    /// filters on `topic` stores it regardless.
    pub fn publish(&self, topic: &str, message: T) {
        let _ = self.route(topic, message);
    }

    /// Like [`publish`](Self::publish), but reports every subscriber that
    /// missed the message in a single `SubscribersFull` error. Streams are
    /// appended either way.
    pub fn publish_checked(&self, topic: &str, message: T) -> Result<()> {
        let full = self.route(topic, message);
        if full.is_empty() {
            Ok(())
        } else {
            Err(Error::SubscribersFull(full))
        }
    }

    fn route(&self, topic: &str, message: T) -> Vec<SubscriberFull> {
        let full = {
            let topics = self.topics_read();
            topics
                .get(topic)
                .map(|t| t.offer(&message))
                .unwrap_or_default()
        };

        let streams = self.streams_read();
        for stream in streams.values().filter(|s| s.has_topic(topic)) {
            stream.insert(message.clone());
        }

        full.into_iter()
            .map(|subscriber| SubscriberFull {
                topic: topic.to_string(),
                subscriber,
            })
            .collect()
    }
}

impl<T> Broker<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a consumer reading `stream` from offset 0, polling at the
    /// configured interval. The consumer is not started.
    pub fn consume(&self, stream: &str) -> Result<Consumer<T>> {
        self.consume_with_interval(stream, self.consumer_settings.poll_interval())
    }

    pub fn consume_with_interval(&self, stream: &str, interval: Duration) -> Result<Consumer<T>> {
        let found = self
            .stream(stream)
            .ok_or_else(|| Error::StreamNotFound(stream.to_string()))?;
        Ok(Consumer::with_interval(found, interval))
    }
}
