//! Batch annotation workflow
//!
//! [`BatchAnnotator::start_batch`] selects the images still to annotate and
//! creates a task for them; [`BatchAnnotator::run`] drives that task to a
//! terminal state, publishing progress on the event bus.

pub mod batch;
pub mod images;

pub use batch::{BatchAnnotator, BatchOptions, BatchOutcome};
pub use images::{list_images, select_images};
