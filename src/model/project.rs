use crate::foundation::core::{Canvas, Fps};

/// Per-session project settings.
///
/// One instance exists per editing session; the canvas and frame rate fix the
/// raster surface and time quantization for playback and export.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectSettings {
    /// Output canvas dimensions.
    pub canvas: Canvas,
    /// Timeline frame rate.
    pub fps: Fps,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1920,
                height: 1080,
            },
            fps: Fps { num: 30, den: 1 },
        }
    }
}
