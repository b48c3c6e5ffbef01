//! Test Helper Utilities
//!
//! Shared utilities for testing tarot-vision

#![allow(dead_code)]

pub mod fake_model;
pub mod fixtures;

pub use fake_model::{json_response, FakeModel};
pub use fixtures::{card, local_card, memory_stores, recognition, recognition_with_total};
