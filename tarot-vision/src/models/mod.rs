//! Data models for dual-recognition annotation
//!
//! - Recognitions and their cards
//! - Differences between two recognitions
//! - Machine annotation records and human-reviewed labels
//! - Batch task state

pub mod annotation;
pub mod card;
pub mod correction;
pub mod difference;
pub mod recognition;
pub mod task;

pub use annotation::{AnnotationRecord, AnnotationStatus, FinalLabel, LabelSource, RecognitionSlot};
pub use card::{CardLabel, CardPosition, Confidence, LabelOrientation, Orientation};
pub use correction::{
    CorrectedCard, CorrectedCards, CorrectedLabel, OriginalAnnotation, ReviewInfo, ReviewStatus,
    CORRECTION_FORMAT_VERSION,
};
pub use difference::{Difference, DifferenceKind, DifferenceStats, Severity};
pub use recognition::RecognitionResult;
pub use task::{
    AnnotationTask, ImageProgress, ImageProgressUpdate, TaskStatus, TaskSummary, TaskUpdate,
};
