use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

use super::{Consumer, ConsumerState, DEFAULT_POLL_INTERVAL};
use crate::stream::Stream;
use crate::utils::error::Error;

const TICK: Duration = Duration::from_millis(100);

fn rides() -> Arc<Stream<String>> {
    Arc::new(Stream::new("rides", ["ride.accepted"]).unwrap())
}

fn numbers(values: &[i32]) -> Arc<Stream<i32>> {
    let stream = Arc::new(Stream::new("numbers", ["num"]).unwrap());
    for v in values {
        stream.insert(*v);
    }
    stream
}

#[tokio::test(start_paused = true)]
async fn test_consumer_fetch() {
    let stream = rides();
    let consumer = Consumer::new(stream.clone());
    assert_eq!(consumer.interval(), DEFAULT_POLL_INTERVAL);
    assert_eq!(consumer.stream_name(), "rides");

    stream.insert("ride 73 is accepted by driver 78".to_string());

    assert_eq!(consumer.fetch(), None);
    assert_eq!(consumer.state(), ConsumerState::Created);

    consumer.start();
    assert_eq!(consumer.state(), ConsumerState::Running);

    sleep(Duration::from_secs(2)).await;

    assert_eq!(
        consumer.fetch(),
        Some("ride 73 is accepted by driver 78".to_string())
    );
    assert_eq!(consumer.offset(), 1);
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_consumer_polls_one_message_per_tick_in_order() {
    let consumer = Consumer::with_interval(numbers(&[1, 2, 3]), TICK);
    consumer.start();

    sleep(TICK + TICK / 2).await;
    assert_eq!(consumer.offset(), 1);
    assert_eq!(consumer.pending_len(), 1);

    sleep(TICK * 2).await;
    assert_eq!(consumer.offset(), 3);

    assert_eq!(consumer.fetch(), Some(1));
    assert_eq!(consumer.fetch(), Some(2));
    assert_eq!(consumer.fetch(), Some(3));
    assert_eq!(consumer.fetch(), None);

    // caught up: further ticks change nothing
    sleep(TICK * 3).await;
    assert_eq!(consumer.offset(), 3);
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let consumer = Consumer::with_interval(numbers(&[1, 2, 3, 4, 5]), TICK);
    consumer.start();
    consumer.start();
    consumer.start_with_cancellation(CancellationToken::new());

    sleep(TICK * 2 + TICK / 2).await;
    // a second poll task would have doubled this
    assert_eq!(consumer.offset(), 2);
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_no_poll_after_stop() {
    let stream = numbers(&[1, 2]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start();

    sleep(TICK + TICK / 2).await;
    consumer.stop();
    let offset = consumer.offset();
    assert_eq!(consumer.state(), ConsumerState::Stopped);

    stream.insert(3);
    sleep(TICK * 5).await;
    assert_eq!(consumer.offset(), offset);

    // Stopped is terminal
    consumer.start();
    sleep(TICK * 5).await;
    assert_eq!(consumer.state(), ConsumerState::Stopped);
    assert_eq!(consumer.offset(), offset);

    // buffered messages are still readable
    assert_eq!(consumer.fetch(), Some(1));
}

#[tokio::test]
async fn test_stop_from_created_is_safe() {
    let consumer = Consumer::with_interval(numbers(&[1]), TICK);
    consumer.stop();
    consumer.stop();
    assert_eq!(consumer.state(), ConsumerState::Stopped);

    consumer.start();
    assert_eq!(consumer.state(), ConsumerState::Stopped);
    assert_eq!(consumer.offset(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_poll_task() {
    let stream = numbers(&[1]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start();
    sleep(TICK * 2).await;

    consumer.shutdown().await;
    assert_eq!(consumer.state(), ConsumerState::Stopped);
    // only the test and the consumer itself hold the stream now
    assert_eq!(Arc::strong_count(&stream), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_token_stops_consumer() {
    let token = CancellationToken::new();
    let stream = numbers(&[]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start_with_cancellation(token.clone());

    sleep(TICK * 2).await;
    token.cancel();

    timeout(Duration::from_secs(1), async {
        while consumer.state() != ConsumerState::Stopped {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("consumer did not stop after cancellation");

    stream.insert(1);
    sleep(TICK * 3).await;
    assert_eq!(consumer.offset(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_ends_poll_task() {
    let stream = numbers(&[1]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start();
    sleep(TICK * 2).await;

    drop(consumer);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(Arc::strong_count(&stream), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_immediately_with_pending_data() {
    let consumer = Consumer::with_interval(numbers(&[42]), TICK);
    consumer.start();
    sleep(TICK * 2).await;

    // an already-cancelled token does not matter when data is pending
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(consumer.wait(&token).await, Ok(()));
    assert_eq!(consumer.wait_timeout(Duration::ZERO).await, Ok(()));
    assert_eq!(consumer.fetch(), Some(42));
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_wait_blocks_until_next_poll() {
    let stream = numbers(&[]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start();

    let start = Instant::now();
    let producer = {
        let stream = stream.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(250)).await;
            stream.insert(7);
        })
    };

    assert_eq!(consumer.wait_timeout(Duration::from_secs(5)).await, Ok(()));
    // inserted at 250ms, picked up by the 300ms tick
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "woke too early: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(300), "woke too late: {elapsed:?}");
    assert_eq!(consumer.fetch(), Some(7));

    producer.await.unwrap();
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_and_cancel() {
    let consumer = Consumer::with_interval(numbers(&[]), TICK);
    consumer.start();

    assert_eq!(
        consumer.wait_timeout(Duration::from_millis(350)).await,
        Err(Error::DeadlineExceeded)
    );

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };
    assert_eq!(consumer.wait(&token).await, Err(Error::Canceled));
    canceller.await.unwrap();
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_wait_ignores_wakeup_for_drained_buffer() {
    let stream = numbers(&[1]);
    let consumer = Consumer::with_interval(stream.clone(), TICK);
    consumer.start();

    assert_eq!(consumer.wait_timeout(Duration::from_secs(1)).await, Ok(()));
    assert_eq!(consumer.fetch(), Some(1));

    // buffer is empty again and nothing new is in the stream
    assert_eq!(
        consumer.wait_timeout(Duration::from_millis(500)).await,
        Err(Error::DeadlineExceeded)
    );
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_all_wake() {
    let stream = numbers(&[]);
    let consumer = Arc::new(Consumer::with_interval(stream.clone(), TICK));
    consumer.start();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let consumer = consumer.clone();
            tokio::spawn(async move { consumer.wait_timeout(Duration::from_secs(5)).await })
        })
        .collect();

    sleep(TICK / 2).await;
    stream.insert(9);

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }
    assert_eq!(consumer.fetch(), Some(9));
    consumer.stop();
}

#[tokio::test(start_paused = true)]
async fn test_independent_consumers_replay_same_sequence() {
    let stream = numbers(&[1, 2, 3]);
    let a = Consumer::with_interval(stream.clone(), TICK);
    let b = Consumer::with_interval(stream.clone(), Duration::from_millis(70));
    a.start();
    b.start();

    let mut seen_a = Vec::new();
    let mut seen_b = Vec::new();
    while seen_a.len() < 3 || seen_b.len() < 3 {
        sleep(Duration::from_millis(10)).await;
        seen_a.extend(a.fetch());
        seen_b.extend(b.fetch());
    }

    assert_eq!(seen_a, vec![1, 2, 3]);
    assert_eq!(seen_b, vec![1, 2, 3]);
    assert_eq!(stream.len(), 3);
    a.stop();
    b.stop();
}

#[test]
fn test_zero_interval_is_clamped() {
    let consumer = Consumer::with_interval(numbers(&[]), Duration::ZERO);
    assert_eq!(consumer.interval(), Duration::from_millis(1));
}
