use std::path::PathBuf;

use crate::model::AssetId;

/// Broad media category of an imported asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MediaKind {
    /// Video file (may carry an audio stream).
    Video,
    /// Audio-only file.
    Audio,
    /// Still image.
    Image,
}

/// An imported media source.
///
/// Assets are immutable once imported and referenced from clips by id, never
/// embedded by value. Removing an asset releases its byte source; clips that
/// still reference it simply resolve to nothing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaAsset {
    /// Stable asset identifier.
    pub id: AssetId,
    /// Media category.
    pub kind: MediaKind,
    /// Path to the source bytes.
    pub source: PathBuf,
    /// Intrinsic duration in seconds (0 for still images).
    pub duration_sec: f64,
    /// Pixel width, when the source has a visual stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, when the source has a visual stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Optional derived preview (thumbnail) path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PathBuf>,
}

impl MediaAsset {
    /// Create a video asset record.
    pub fn video(source: impl Into<PathBuf>, duration_sec: f64, width: u32, height: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind: MediaKind::Video,
            source: source.into(),
            duration_sec,
            width: Some(width),
            height: Some(height),
            preview: None,
        }
    }

    /// Create an audio asset record.
    pub fn audio(source: impl Into<PathBuf>, duration_sec: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind: MediaKind::Audio,
            source: source.into(),
            duration_sec,
            width: None,
            height: None,
            preview: None,
        }
    }

    /// Create an image asset record.
    pub fn image(source: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind: MediaKind::Image,
            source: source.into(),
            duration_sec: 0.0,
            width: Some(width),
            height: Some(height),
            preview: None,
        }
    }
}
