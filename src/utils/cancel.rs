//! Racing a blocking wait against a cancellation token or a deadline.

use std::future::Future;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::utils::error::{Error, Result};

/// What a blocking call gives up on.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Interrupt<'a> {
    Token(&'a CancellationToken),
    Timeout(Duration),
}

/// Drives `fut` to completion unless `interrupt` fires first.
///
/// A token that is already cancelled wins without polling `fut`, so a
/// cancelled call never consumes a message.
pub(crate) async fn race<F: Future>(fut: F, interrupt: Interrupt<'_>) -> Result<F::Output> {
    match interrupt {
        Interrupt::Token(token) => select! {
            biased;
            _ = token.cancelled() => Err(Error::Canceled),
            out = fut => Ok(out),
        },
        Interrupt::Timeout(timeout) => time::timeout(timeout, fut)
            .await
            .map_err(|_| Error::DeadlineExceeded),
    }
}
