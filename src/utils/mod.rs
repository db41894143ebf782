//! Utilities shared across anvilq.

pub mod logging;

pub use logging::init_logging;
