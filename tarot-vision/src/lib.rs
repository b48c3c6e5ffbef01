//! tarot-vision library interface
//!
//! Dual-recognition annotation of tarot spread photos: parse two independent
//! model readings of each image, detect where they disagree, pick a
//! provisional label and let a reviewer build the authoritative one.

pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

pub use crate::error::{ModelError, ReviewError, WorkflowError, WorkflowResult};
