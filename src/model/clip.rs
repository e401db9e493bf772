use crate::model::{AssetId, ClipId};

/// 2D placement of a visual clip on the canvas.
///
/// `x`/`y` offset the clip center from the canvas center, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform2D {
    /// Horizontal offset in pixels.
    pub x: f64,
    /// Vertical offset in pixels.
    pub y: f64,
    /// Uniform scale factor.
    pub scale: f64,
    /// Rotation in degrees, clockwise.
    pub rotation: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// Entrance animation applied to text clips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextAnimation {
    /// No animation; text is visible for the whole clip.
    #[default]
    None,
    /// Opacity ramp over the first 0.5 s of the clip.
    FadeIn,
    /// Slide up from below while fading in.
    SlideUp,
    /// Scale overshoot pop while fading in.
    PopIn,
}

/// Per-kind rendering parameters.
///
/// Each clip kind carries only its relevant fields; there is no free-form
/// property bag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClipProps {
    /// A media-backed video clip.
    Video {
        /// Layer opacity in `[0, 1]`.
        opacity: f64,
        /// Audio gain applied to the clip's own audio stream.
        volume: f64,
        /// Canvas placement.
        transform: Transform2D,
        /// Audio fade-in duration in seconds.
        fade_in_sec: f64,
        /// Audio fade-out duration in seconds.
        fade_out_sec: f64,
    },
    /// A media-backed audio clip.
    Audio {
        /// Audio gain.
        volume: f64,
        /// Fade-in duration in seconds.
        fade_in_sec: f64,
        /// Fade-out duration in seconds.
        fade_out_sec: f64,
    },
    /// A generated text element.
    Text {
        /// UTF-8 text content.
        content: String,
        /// Relative path to the font file.
        font_source: String,
        /// Font size in pixels.
        size_px: f32,
        /// Straight-alpha RGBA8 fill color.
        color_rgba8: [u8; 4],
        /// Entrance animation.
        animation: TextAnimation,
        /// Canvas placement.
        transform: Transform2D,
    },
    /// An overlay layer (picture-in-picture, stickers, B-roll).
    Overlay {
        /// Layer opacity in `[0, 1]`.
        opacity: f64,
        /// Audio gain for overlays backed by video assets.
        volume: f64,
        /// Canvas placement.
        transform: Transform2D,
        /// Visual fade-in duration in seconds.
        fade_in_sec: f64,
        /// Visual fade-out duration in seconds.
        fade_out_sec: f64,
    },
}

/// Clip kind derived from its property variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClipKind {
    /// Main video layer content.
    Video,
    /// Audio-only content.
    Audio,
    /// Generated text.
    Text,
    /// Overlay layer content.
    Overlay,
}

impl ClipProps {
    /// Return the clip kind this variant belongs to.
    pub fn kind(&self) -> ClipKind {
        match self {
            ClipProps::Video { .. } => ClipKind::Video,
            ClipProps::Audio { .. } => ClipKind::Audio,
            ClipProps::Text { .. } => ClipKind::Text,
            ClipProps::Overlay { .. } => ClipKind::Overlay,
        }
    }

    /// Default video props.
    pub fn video() -> Self {
        ClipProps::Video {
            opacity: 1.0,
            volume: 1.0,
            transform: Transform2D::default(),
            fade_in_sec: 0.0,
            fade_out_sec: 0.0,
        }
    }

    /// Default audio props.
    pub fn audio() -> Self {
        ClipProps::Audio {
            volume: 1.0,
            fade_in_sec: 0.0,
            fade_out_sec: 0.0,
        }
    }

    /// Default overlay props.
    pub fn overlay() -> Self {
        ClipProps::Overlay {
            opacity: 1.0,
            volume: 1.0,
            transform: Transform2D::default(),
            fade_in_sec: 0.0,
            fade_out_sec: 0.0,
        }
    }

    /// Text props with default styling.
    pub fn text(content: impl Into<String>, font_source: impl Into<String>) -> Self {
        ClipProps::Text {
            content: content.into(),
            font_source: font_source.into(),
            size_px: 64.0,
            color_rgba8: [255, 255, 255, 255],
            animation: TextAnimation::None,
            transform: Transform2D::default(),
        }
    }

    /// Audio gain for audible clip kinds, `None` for text.
    pub fn volume(&self) -> Option<f64> {
        match self {
            ClipProps::Video { volume, .. }
            | ClipProps::Audio { volume, .. }
            | ClipProps::Overlay { volume, .. } => Some(*volume),
            ClipProps::Text { .. } => None,
        }
    }
}

/// A placed, trimmed reference to a media asset or a generated element.
///
/// `start_sec`/`duration_sec` position the clip on the shared timeline;
/// `trim_start_sec`/`trim_end_sec` are in/out offsets into the referenced
/// asset's own duration, so the clip plays the asset slice
/// `[trim_start, trim_start + duration)`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    /// Stable clip identifier.
    pub id: ClipId,
    /// Referenced asset, when media-backed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    /// Position on the shared timeline, in seconds.
    pub start_sec: f64,
    /// Played duration in seconds; always > 0.
    pub duration_sec: f64,
    /// In-offset into the asset's own duration, seconds, >= 0.
    #[serde(default)]
    pub trim_start_sec: f64,
    /// Out-offset from the asset's end, seconds, >= 0.
    #[serde(default)]
    pub trim_end_sec: f64,
    /// Per-kind rendering parameters.
    pub props: ClipProps,
}

impl Clip {
    /// Create a clip with a fresh id.
    pub fn new(asset_id: Option<AssetId>, start_sec: f64, duration_sec: f64, props: ClipProps) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            asset_id,
            start_sec,
            duration_sec,
            trim_start_sec: 0.0,
            trim_end_sec: 0.0,
            props,
        }
    }

    /// Clip kind derived from its props.
    pub fn kind(&self) -> ClipKind {
        self.props.kind()
    }

    /// Timeline end, exclusive.
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }

    /// Return `true` when timeline time `t` falls in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_sec && t < self.end_sec()
    }

    /// Map timeline time `t` to media-local time inside the trim window.
    ///
    /// The result is not clamped at the trim-out edge: transition resolution
    /// deliberately reads past a clip's nominal end into its trim-out margin.
    pub fn local_time(&self, t: f64) -> f64 {
        self.trim_start_sec + (t - self.start_sec)
    }
}
