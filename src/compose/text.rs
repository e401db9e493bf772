//! Parley-backed text shaping for title clips.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::{CutError, CutResult};

/// Solid RGBA8 brush carried through Parley styles into glyph drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextBrushRgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

/// A shaped text layout paired with the font it was shaped against.
#[derive(Clone)]
pub struct ShapedText {
    /// Parley layout, positioned glyph runs included.
    pub layout: Arc<parley::Layout<TextBrushRgba8>>,
    /// Font data handed to the glyph rasterizer.
    pub font: vello_cpu::peniko::FontData,
}

impl ShapedText {
    /// Total laid-out size in pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.layout.width(), self.layout.height())
    }
}

/// Stateful helper for shaping text from font files on disk.
///
/// Font bytes and shaped layouts are cached: a title that stays on screen
/// shapes once, not once per frame.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    font_bytes: HashMap<PathBuf, Arc<Vec<u8>>>,
    shaped: HashMap<ShapeKey, ShapedText>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct ShapeKey {
    text: String,
    font_source: PathBuf,
    size_px_milli: u32,
    color: [u8; 4],
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font_bytes: HashMap::new(),
            shaped: HashMap::new(),
        }
    }

    /// Shape `text` with the font file at `font_source`.
    pub fn shape(
        &mut self,
        text: &str,
        font_source: &Path,
        size_px: f32,
        color_rgba8: [u8; 4],
        max_width_px: Option<f32>,
    ) -> CutResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CutError::validation("text size_px must be finite and > 0"));
        }
        let key = ShapeKey {
            text: text.to_string(),
            font_source: font_source.to_path_buf(),
            size_px_milli: (size_px * 1000.0) as u32,
            color: color_rgba8,
        };
        if let Some(cached) = self.shaped.get(&key) {
            return Ok(cached.clone());
        }

        let font_bytes = match self.font_bytes.get(font_source) {
            Some(b) => b.clone(),
            None => {
                let bytes = Arc::new(std::fs::read(font_source).map_err(|e| {
                    CutError::validation(format!(
                        "failed to read font '{}': {e}",
                        font_source.display()
                    ))
                })?);
                self.font_bytes
                    .insert(font_source.to_path_buf(), bytes.clone());
                bytes
            }
        };

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CutError::validation("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CutError::validation("registered font family has no name"))?
            .to_string();

        let brush = TextBrushRgba8 {
            r: color_rgba8[0],
            g: color_rgba8[1],
            b: color_rgba8[2],
            a: color_rgba8[3],
        };
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes.to_vec()), 0);
        let out = ShapedText {
            layout: Arc::new(layout),
            font,
        };
        self.shaped.insert(key, out.clone());
        Ok(out)
    }
}
