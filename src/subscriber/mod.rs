//! The `subscriber` module implements the at-most-once, push-fed side of the
//! broker: a bounded mailbox per subscription and the `Subscriber` handle
//! that pulls from it.

pub mod handle;
pub(crate) mod mailbox;

pub use handle::Subscriber;
