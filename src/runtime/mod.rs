//! # Runtime Module
//!
//! Runtime components for the API Gateway Controller, including initialization,
//! the watch loop, and watch error handling.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
