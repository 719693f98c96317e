pub mod log;

pub use log::Stream;
