//! The `utils` module provides the pieces shared by every part of `cmq`:
//! the error type, logging setup and the cancellation helper used by the
//! blocking calls.

pub(crate) mod cancel;
pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
