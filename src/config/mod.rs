mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, ConsumerSettings, LogSettings, Settings};

/// Loads the configuration from the default file and `CMQ_*` environment variables
/// Merges the configuration with default values
///
/// Nested keys use a double underscore, e.g. `CMQ_CONSUMER__POLL_INTERVAL_MS=250`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("CMQ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            mailbox_capacity: partial
                .broker
                .as_ref()
                .and_then(|b| b.mailbox_capacity)
                .unwrap_or(default.broker.mailbox_capacity),
        },
        consumer: ConsumerSettings {
            poll_interval_ms: partial
                .consumer
                .as_ref()
                .and_then(|c| c.poll_interval_ms)
                .unwrap_or(default.consumer.poll_interval_ms),
        },
        log: LogSettings {
            level: partial
                .log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    })
}
