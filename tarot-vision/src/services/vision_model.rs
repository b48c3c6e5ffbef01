//! Vision model seam
//!
//! The concrete model client (HTTP, local inference, ...) lives outside this
//! crate. The batch driver only needs raw response text and call latency.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::ModelError;

/// Instruction sent alongside every image
pub const RECOGNITION_PROMPT: &str = r#"You are an expert reader of Rider-Waite-Smith tarot cards.
Identify every face-up card in the photo, left to right then top to bottom,
and report its name and whether it is upright or reversed.

Answer with JSON only, in this shape:
```json
{
  "cards": [
    {
      "position": 1,
      "cardNameCn": "local card name",
      "cardNameEn": "English card name, no numerals",
      "orientation": "upright | reversed",
      "confidence": "high | medium | low",
      "analysisWhichCard": "what identifies this card"
    }
  ],
  "totalCards": 1,
  "reason": "short rationale"
}
```

Positions start at 1. Use low confidence for blurry cards but still give the
most likely name. With no tarot cards in the photo, return an empty cards
array and totalCards 0."#;

/// One image handed to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub filename: String,
    pub path: PathBuf,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Read an image file
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            media_type: media_type_for(path),
            bytes,
        })
    }
}

/// MIME type guessed from the file extension, JPEG when unknown
pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Raw text returned by one model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    /// Wall-clock call latency in milliseconds
    pub latency_ms: u64,
}

/// A vision model able to read tarot cards from a photo
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier recorded on tasks and annotation records
    fn model_id(&self) -> &str;

    /// Run one recognition call
    async fn recognize(&self, image: &ImageInput, prompt: &str)
        -> Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(media_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_load_reads_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spread.webp");
        std::fs::write(&path, b"RIFF").unwrap();

        let image = ImageInput::load(&path).await.unwrap();
        assert_eq!(image.filename, "spread.webp");
        assert_eq!(image.media_type, "image/webp");
        assert_eq!(image.bytes, b"RIFF");
    }
}
