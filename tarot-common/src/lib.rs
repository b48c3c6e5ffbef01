//! # Tarot Common Library
//!
//! Shared code for the tarot vision annotation tools:
//! - Error and result types
//! - Configuration loading and data folder layout
//! - Progress events for batch annotation runs

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
