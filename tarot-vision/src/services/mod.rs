//! Annotation services
//!
//! Parser, comparator, selector, card reference and review model are pure
//! and synchronous.
//! The vision model seam is the only async collaborator.

pub mod annotation_comparator;
pub mod card_reference;
pub mod label_selector;
pub mod recognition_parser;
pub mod review_session;
pub mod vision_model;

pub use annotation_comparator::{compare_recognitions, is_same_card, normalize_name, Comparison};
pub use label_selector::{select_final_label, Selection};
pub use recognition_parser::parse_recognition;
pub use review_session::{CardEdit, ReviewSession};
pub use vision_model::{ImageInput, ModelResponse, VisionModel, RECOGNITION_PROMPT};
