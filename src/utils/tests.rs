use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::cancel::{Interrupt, race};
use super::error::{Error, SubscriberFull};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn test_parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("TRACE"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("warning"), tracing::Level::WARN);
    assert_eq!(logging::parse_level("nonsense"), tracing::Level::INFO);
}

#[test]
fn test_error_labels_and_messages() {
    let err = Error::IndexOutOfRange { index: 3, len: 2 };
    assert_eq!(err.as_label(), "index_out_of_range");
    assert_eq!(err.to_string(), "index 3 out of range for stream of length 2");

    let full = Error::SubscribersFull(vec![
        SubscriberFull {
            topic: "numbers".to_string(),
            subscriber: "a".to_string(),
        },
        SubscriberFull {
            topic: "numbers".to_string(),
            subscriber: "b".to_string(),
        },
    ]);
    assert_eq!(full.as_label(), "subscribers_full");
    assert_eq!(full.to_string(), "2 subscriber mailbox(es) full");
}

#[tokio::test]
async fn test_race_prefers_cancelled_token() {
    let token = CancellationToken::new();
    token.cancel();

    let res = race(async { 42 }, Interrupt::Token(&token)).await;
    assert_eq!(res, Err(Error::Canceled));
}

#[tokio::test]
async fn test_race_returns_output() {
    let token = CancellationToken::new();
    let res = race(async { 42 }, Interrupt::Token(&token)).await;
    assert_eq!(res, Ok(42));
}

#[tokio::test(start_paused = true)]
async fn test_race_deadline() {
    let res = race(
        std::future::pending::<()>(),
        Interrupt::Timeout(Duration::from_millis(5)),
    )
    .await;
    assert_eq!(res, Err(Error::DeadlineExceeded));
}
