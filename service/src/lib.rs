//! Process-wide infrastructure: configuration and logging.
//!
//! Both are set up once at start-up and are read-only afterwards.

pub mod config;
pub mod logging;
