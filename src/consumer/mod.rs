//! The `consumer` module implements the at-least-once read path: a consumer
//! owns an offset into one stream and polls it in the background.

pub mod poller;

pub use poller::{Consumer, ConsumerState, DEFAULT_POLL_INTERVAL};

#[cfg(test)]
mod tests;
