use std::sync::Arc;
use std::time::Duration;

use cmq::config::load_config;
use cmq::utils::logging;
use cmq::{Broker, Error, Stream};
use futures::future::join_all;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.log.level);

    if let Err(e) = run(config).await {
        error!(label = e.as_label(), "demo failed: {e}");
    }
}

async fn run(config: cmq::config::Settings) -> Result<(), Error> {
    let broker = Arc::new(Broker::with_settings(config.broker, config.consumer));
    broker.register_stream(Stream::new("numbers", ["numbers"])?)?;

    let subscribers: Vec<_> = (1..=2)
        .map(|n| {
            let sub = broker.subscribe_with_capacity("numbers", 8);
            tokio::spawn(async move {
                while let Ok(v) = sub.fetch_timeout(Duration::from_millis(200)).await {
                    info!(subscriber = n, value = v, "received");
                }
            })
        })
        .collect();

    let consumer = broker.consume("numbers")?;
    consumer.start();

    for v in [10, 20, 30] {
        broker.publish("numbers", v);
    }

    let mut replayed = Vec::new();
    while replayed.len() < 3 {
        consumer.wait_timeout(Duration::from_secs(10)).await?;
        while let Some(v) = consumer.fetch() {
            replayed.push(v);
        }
    }
    consumer.shutdown().await;
    info!(?replayed, "consumer replayed stream");

    join_all(subscribers).await;
    Ok(())
}
