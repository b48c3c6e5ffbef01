//! Scripted vision model

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tarot_vision::error::ModelError;
use tarot_vision::services::{ImageInput, ModelResponse, VisionModel};
use tokio_util::sync::CancellationToken;

/// JSON response text for the given `(canonical name, orientation, confidence)` cards
pub fn json_response(cards: &[(&str, &str, &str)]) -> String {
    let cards: Vec<serde_json::Value> = cards
        .iter()
        .enumerate()
        .map(|(i, (name, orientation, confidence))| {
            serde_json::json!({
                "position": i + 1,
                "cardNameEn": name,
                "orientation": orientation,
                "confidence": confidence,
            })
        })
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({ "cards": cards, "totalCards": cards.len(), "reason": "scripted" })
    )
}

/// Model answering from per-image scripts, in call order
///
/// Unscripted calls fail with a non-retryable API error.
pub struct FakeModel {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, ModelError>>>>,
    calls: Mutex<Vec<String>>,
    cancel_after_calls: Option<(usize, CancellationToken)>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            cancel_after_calls: None,
        }
    }

    pub fn script(self, filename: &str, responses: Vec<Result<String, ModelError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(filename.to_string(), responses.into_iter().collect());
        self
    }

    /// Trip `token` once `calls` model calls have been made
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after_calls = Some((calls, token));
        self
    }

    /// Filenames of every call made so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-model"
    }

    async fn recognize(
        &self,
        image: &ImageInput,
        _prompt: &str,
    ) -> Result<ModelResponse, ModelError> {
        let call_count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(image.filename.clone());
            calls.len()
        };
        if let Some((after, token)) = &self.cancel_after_calls {
            if call_count >= *after {
                token.cancel();
            }
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&image.filename)
            .and_then(|script| script.pop_front());

        match next {
            Some(Ok(text)) => Ok(ModelResponse { text, latency_ms: 10 }),
            Some(Err(e)) => Err(e),
            None => Err(ModelError::Api(format!("no script for {}", image.filename))),
        }
    }
}
