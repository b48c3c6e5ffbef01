//! Utility modules

pub mod model_retry;

pub use model_retry::{call_with_retry, RetryPolicy};
