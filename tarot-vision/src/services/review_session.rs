//! Manual review merge model
//!
//! A [`ReviewSession`] is the only way to build a [`CorrectedLabel`]. It
//! holds a working set of corrected cards keyed by position, so an insert at
//! an occupied position always replaces the previous card.
//!
//! Source and edit tracking:
//! - pulled cards carry the recognition they came from and `edited = false`
//! - editing a card keeps its source and sets `edited = true`
//! - manually authored cards are `source = manual`, `edited = true`

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::card_reference;
use crate::error::ReviewError;
use crate::models::{
    AnnotationRecord, CardPosition, CorrectedCard, CorrectedCards, CorrectedLabel, LabelOrientation,
    LabelSource, OriginalAnnotation, RecognitionResult, RecognitionSlot, ReviewInfo, ReviewStatus,
    CORRECTION_FORMAT_VERSION,
};

/// Field changes for one card; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardEdit {
    pub name_local: Option<String>,
    pub name_canonical: Option<String>,
    pub orientation: Option<LabelOrientation>,
}

/// Working state of one image under review
#[derive(Debug, Clone)]
pub struct ReviewSession {
    record: AnnotationRecord,
    cards: BTreeMap<u32, CorrectedCard>,
    notes: Option<String>,
}

impl ReviewSession {
    /// Open a review of `record`
    ///
    /// Resumes from `existing` when the image was reviewed before; otherwise
    /// seeds from the first recognition, skipping cards with no name.
    pub fn open(record: AnnotationRecord, existing: Option<&CorrectedLabel>) -> Self {
        let (cards, notes) = match existing {
            Some(label) => (
                label
                    .corrected_label
                    .cards
                    .iter()
                    .map(|c| (c.position, c.clone()))
                    .collect(),
                label.review_info.notes.clone(),
            ),
            None => (seed_cards(&record.first_annotation), None),
        };

        debug!(
            filename = %record.filename,
            resumed = existing.is_some(),
            "Opened review with {} cards",
            cards.len()
        );

        Self {
            record,
            cards,
            notes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.record.filename
    }

    pub fn record(&self) -> &AnnotationRecord {
        &self.record
    }

    /// Working-set cards in position order
    pub fn cards(&self) -> impl Iterator<Item = &CorrectedCard> {
        self.cards.values()
    }

    pub fn card(&self, position: u32) -> Option<&CorrectedCard> {
        self.cards.get(&position)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Pull the card at `position` from one recognition into the working set
    ///
    /// Replaces whatever occupied that position. Returns the replaced card.
    pub fn pull(
        &mut self,
        slot: RecognitionSlot,
        position: u32,
    ) -> Result<Option<CorrectedCard>, ReviewError> {
        check_position(position)?;

        let recognition = match slot {
            RecognitionSlot::First => &self.record.first_annotation,
            RecognitionSlot::Second => &self.record.second_annotation,
        };
        let card = recognition
            .card_at(position)
            .ok_or(ReviewError::RecognitionCardMissing { slot, position })?;
        if !card.is_identified() {
            return Err(ReviewError::UnidentifiedCard(position));
        }

        let pulled = pulled_card(card, slot.into());
        debug!(filename = %self.record.filename, position, ?slot, "Pulled card into review");
        Ok(self.cards.insert(position, pulled))
    }

    /// Change fields of the card at `position`
    pub fn edit(&mut self, position: u32, edit: CardEdit) -> Result<&CorrectedCard, ReviewError> {
        let card = self
            .cards
            .get_mut(&position)
            .ok_or(ReviewError::NoCardAtPosition(position))?;

        if let Some(name) = edit.name_local {
            card.name_local = name.trim().to_string();
        }
        if let Some(name) = edit.name_canonical {
            card.name_canonical = name.trim().to_string();
        }
        if let Some(orientation) = edit.orientation {
            card.orientation = orientation;
        }
        card.edited = true;

        Ok(card)
    }

    /// Author a card by hand at `position`, replacing any card there
    pub fn add_manual(
        &mut self,
        position: u32,
        name_local: &str,
        name_canonical: &str,
        orientation: LabelOrientation,
    ) -> Result<Option<CorrectedCard>, ReviewError> {
        check_position(position)?;

        let mut name_local = name_local.trim().to_string();
        let mut name_canonical = name_canonical.trim().to_string();
        if name_local.is_empty() && name_canonical.is_empty() {
            return Err(ReviewError::MissingName);
        }

        // Fill the other language from the deck when only one name was given
        if name_local.is_empty() {
            if let Some(card) = card_reference::find_by_canonical(&name_canonical) {
                name_local = card.name_local.clone();
            }
        } else if name_canonical.is_empty() {
            if let Some(card) = card_reference::find_by_local(&name_local) {
                name_canonical = card.name_canonical.clone();
            }
        } else if !card_reference::is_valid_pair(&name_canonical, &name_local) {
            warn!(
                filename = %self.record.filename,
                position,
                "Manual card names do not name the same card: {} / {}",
                name_local,
                name_canonical
            );
        }

        Ok(self.cards.insert(
            position,
            CorrectedCard {
                position,
                name_local,
                name_canonical,
                orientation,
                source: LabelSource::Manual,
                edited: true,
            },
        ))
    }

    /// Remove the card at `position`
    pub fn delete(&mut self, position: u32) -> Result<CorrectedCard, ReviewError> {
        self.cards
            .remove(&position)
            .ok_or(ReviewError::NoCardAtPosition(position))
    }

    /// Blank notes clear them
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
    }

    /// Freeze the working set into a verified corrected label
    ///
    /// Rejected when the working set is empty. `totalCards` is the number of
    /// reviewed cards.
    pub fn commit(
        &self,
        reviewed_by: impl Into<String>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<CorrectedLabel, ReviewError> {
        if self.cards.is_empty() {
            return Err(ReviewError::EmptyWorkingSet);
        }

        let cards: Vec<CorrectedCard> = self.cards.values().cloned().collect();
        info!(
            filename = %self.record.filename,
            cards = cards.len(),
            edited = cards.iter().filter(|c| c.edited).count(),
            "Committed review"
        );

        Ok(CorrectedLabel {
            filename: self.record.filename.clone(),
            original_annotation: OriginalAnnotation::from(&self.record),
            corrected_label: CorrectedCards {
                total_cards: cards.len(),
                cards,
            },
            review_info: ReviewInfo {
                reviewed_by: reviewed_by.into(),
                reviewed_at,
                status: ReviewStatus::Verified,
                notes: self.notes.clone(),
            },
            version: CORRECTION_FORMAT_VERSION.to_string(),
        })
    }
}

fn check_position(position: u32) -> Result<(), ReviewError> {
    if position == 0 {
        Err(ReviewError::InvalidPosition(position))
    } else {
        Ok(())
    }
}

fn seed_cards(first: &RecognitionResult) -> BTreeMap<u32, CorrectedCard> {
    let mut cards = BTreeMap::new();
    for card in first.cards.iter().filter(|c| c.is_identified()) {
        // Duplicate positions keep the first card
        cards
            .entry(card.position)
            .or_insert_with(|| pulled_card(card, LabelSource::First));
    }
    cards
}

fn pulled_card(card: &CardPosition, source: LabelSource) -> CorrectedCard {
    let label = card.to_label();
    CorrectedCard {
        position: label.position,
        name_local: label.name_local,
        name_canonical: label.name_canonical,
        orientation: label.orientation,
        source,
        edited: false,
    }
}
