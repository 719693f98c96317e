use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the broker, the polling consumers and logging.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub consumer: ConsumerSettings,
    pub log: LogSettings,
}

/// Configuration settings for the broker.
///
/// `mailbox_capacity` is the default capacity of subscriber mailboxes. Zero
/// means a message is only handed over while a subscriber is waiting for it.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub mailbox_capacity: usize,
}

/// Configuration settings for stream consumers.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub poll_interval_ms: u64,
}

impl ConsumerSettings {
    /// Poll interval as a `Duration`, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub consumer: Option<PartialConsumerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub mailbox_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConsumerSettings {
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 0,
        }
    }
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings::default(),
            consumer: ConsumerSettings::default(),
            log: LogSettings::default(),
        }
    }
}
