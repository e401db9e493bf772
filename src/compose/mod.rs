//! Frame compositing: resolved layer set in, premultiplied RGBA8 canvas out.
//!
//! Vector and image drawing (video frames, overlays, glyphs) goes through
//! `vello_cpu`; layer combination uses the byte kernels in [`blend`]. The
//! same compositor instance serves preview and export, which keeps caches
//! (fonts, shaped text, still images) warm across frames.

pub mod blend;
pub mod text;

pub use text::{ShapedText, TextBrushRgba8, TextLayoutEngine};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use kurbo::{Affine, Vec2};

use crate::foundation::{Canvas, CutError, CutResult};
use crate::media::DecodeFarm;
use crate::model::{AssetId, ClipProps, MediaKind, Timeline, Transform2D};
use crate::resolve::{MainSlot, ResolvedClip, ResolvedFrame};
use crate::transition::{LayerStyle, OverlayKind, TransitionVisuals, transition_visuals};

/// Entrance animation length for text clips, seconds.
const TEXT_ANIM_SEC: f64 = 0.5;

#[derive(Clone)]
struct CachedImage {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

/// CPU compositor over one project canvas.
pub struct Compositor {
    canvas: Canvas,
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    image_cache: HashMap<AssetId, CachedImage>,
}

impl Compositor {
    /// Create a compositor for the given output canvas.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            ctx: None,
            text_engine: TextLayoutEngine::new(),
            image_cache: HashMap::new(),
        }
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Composite one resolved frame into premultiplied RGBA8 canvas bytes.
    pub fn render_frame(
        &mut self,
        timeline: &Timeline,
        resolved: &ResolvedFrame<'_>,
        farm: &mut DecodeFarm,
    ) -> CutResult<Vec<u8>> {
        let len = self.canvas.width as usize * self.canvas.height as usize * 4;
        // Opaque black base; empty slots show as black, not garbage.
        let mut out = vec![0u8; len];
        for px in out.chunks_exact_mut(4) {
            px[3] = 255;
        }

        for rc in &resolved.under {
            let layer = self.render_video_layer(timeline, rc, Affine::IDENTITY, farm)?;
            blend::over_in_place(&mut out, &layer, clip_opacity(rc))?;
        }

        match &resolved.main {
            MainSlot::Empty => {}
            MainSlot::Single(rc) => {
                let layer = self.render_video_layer(timeline, rc, Affine::IDENTITY, farm)?;
                blend::over_in_place(&mut out, &layer, clip_opacity(rc))?;
            }
            MainSlot::Transition {
                outgoing,
                incoming,
                kind,
                progress,
            } => {
                let visuals = transition_visuals(*kind, *progress);
                self.render_transition(timeline, outgoing, incoming, &visuals, resolved.t_sec, farm, &mut out)?;
            }
        }

        for rc in &resolved.overlays {
            let envelope = visual_fade(rc);
            if envelope <= 0.0 {
                continue;
            }
            let layer = self.render_video_layer(timeline, rc, Affine::IDENTITY, farm)?;
            blend::over_in_place(&mut out, &layer, clip_opacity(rc) * envelope)?;
        }

        for rc in &resolved.texts {
            let layer = self.render_text_layer(rc)?;
            blend::over_in_place(&mut out, &layer, 1.0)?;
        }

        Ok(out)
    }

    fn render_transition(
        &mut self,
        timeline: &Timeline,
        outgoing: &ResolvedClip<'_>,
        incoming: &ResolvedClip<'_>,
        visuals: &TransitionVisuals,
        t_sec: f64,
        farm: &mut DecodeFarm,
        out: &mut [u8],
    ) -> CutResult<()> {
        let (cw, ch) = (self.canvas.width, self.canvas.height);

        let mut render_side = |this: &mut Self, rc: &ResolvedClip<'_>, style: &LayerStyle| -> CutResult<Vec<u8>> {
            if style.is_hidden() {
                return Ok(vec![0u8; cw as usize * ch as usize * 4]);
            }
            let affine = style_affine_px(style.transform, f64::from(cw), f64::from(ch));
            let mut buf = this.render_video_layer(timeline, rc, affine, farm)?;
            if let Some(mask) = style.wipe {
                blend::apply_wipe_mask(&mut buf, cw, ch, mask)?;
            }
            if style.blur_px > 0.5 {
                blend::blur_in_place(&mut buf, cw, ch, style.blur_px)?;
            }
            Ok(buf)
        };

        let out_buf = render_side(self, outgoing, &visuals.outgoing)?;
        let in_buf = render_side(self, incoming, &visuals.incoming)?;
        blend::weighted_add_over_in_place(
            out,
            &out_buf,
            &in_buf,
            visuals.outgoing.opacity * clip_opacity(outgoing),
            visuals.incoming.opacity * clip_opacity(incoming),
        )?;

        if let Some(fx) = visuals.overlay {
            match fx.kind {
                OverlayKind::Flash => blend::apply_flash(out, fx.intensity),
                OverlayKind::FilmGrain => {
                    let seed = (t_sec * 1000.0).abs() as u32;
                    blend::apply_film_grain(out, cw, fx.intensity, seed);
                }
            }
        }
        Ok(())
    }

    /// Render one media-backed clip into a canvas-sized premultiplied buffer.
    ///
    /// `extra` is applied in pixel space on top of the clip's own placement
    /// (transition slides and zooms land here).
    fn render_video_layer(
        &mut self,
        timeline: &Timeline,
        rc: &ResolvedClip<'_>,
        extra: Affine,
        farm: &mut DecodeFarm,
    ) -> CutResult<Vec<u8>> {
        let (cw, ch) = (self.canvas.width, self.canvas.height);
        let blank = || vec![0u8; cw as usize * ch as usize * 4];
        let Some(asset_id) = rc.clip.asset_id else {
            return Ok(blank());
        };
        let Some(asset) = timeline.asset(asset_id) else {
            return Ok(blank());
        };

        let image = match asset.kind {
            MediaKind::Image => self.image_for(asset_id, &asset.source)?,
            MediaKind::Video => {
                let (w, h) = farm
                    .dimensions(asset_id)
                    .ok_or_else(|| CutError::decode(format!("no decoder open for asset {asset_id}")))?;
                let mut bytes = farm.frame_rgba8(asset_id, rc.local_sec)?;
                blend::premultiply_rgba8_in_place(&mut bytes);
                let pixmap = pixmap_from_premul_bytes(&bytes, w, h)?;
                CachedImage {
                    paint: vello_cpu::Image {
                        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                        sampler: vello_cpu::peniko::ImageSampler::default(),
                    },
                    width: w,
                    height: h,
                }
            }
            MediaKind::Audio => return Ok(blank()),
        };

        let transform = extra
            * clip_affine_px(clip_transform(rc), f64::from(cw), f64::from(ch))
            * fit_affine(image.width, image.height, cw, ch);

        self.with_ctx(|ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(image.paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(image.width),
                f64::from(image.height),
            ));
            Ok(())
        })
    }

    /// Render one text clip into a canvas-sized premultiplied buffer.
    fn render_text_layer(&mut self, rc: &ResolvedClip<'_>) -> CutResult<Vec<u8>> {
        let ClipProps::Text {
            content,
            font_source,
            size_px,
            color_rgba8,
            animation,
            transform,
        } = &rc.clip.props
        else {
            return Err(CutError::evaluation("text layer requires a text clip"));
        };

        let (cw, ch) = (self.canvas.width, self.canvas.height);
        let shaped = self.text_engine.shape(
            content,
            Path::new(font_source),
            *size_px,
            *color_rgba8,
            Some(cw as f32),
        )?;
        let (tw, th) = shaped.size();

        // Entrance animation ramps over the first half second of the clip.
        let elapsed = (rc.local_sec - rc.clip.trim_start_sec).max(0.0);
        let k = (elapsed / TEXT_ANIM_SEC).clamp(0.0, 1.0) as f32;
        let (alpha, dy, scale) = match animation {
            crate::model::TextAnimation::None => (1.0f32, 0.0f64, 1.0f64),
            crate::model::TextAnimation::FadeIn => (k, 0.0, 1.0),
            crate::model::TextAnimation::SlideUp => (k, f64::from(1.0 - k) * 40.0, 1.0),
            crate::model::TextAnimation::PopIn => (k, 0.0, 0.6 + 0.4 * f64::from(k)),
        };
        if alpha <= 0.0 {
            return Ok(vec![0u8; cw as usize * ch as usize * 4]);
        }

        // Text is centered on the canvas, then offset by the clip transform.
        let center = Affine::translate(Vec2::new(
            (f64::from(cw) - f64::from(tw)) / 2.0 + transform.x,
            (f64::from(ch) - f64::from(th)) / 2.0 + transform.y + dy,
        ));
        let total_scale = transform.scale * scale;
        let pivot = Vec2::new(f64::from(cw) / 2.0, f64::from(ch) / 2.0);
        let affine = Affine::translate(pivot)
            * Affine::scale(total_scale)
            * Affine::translate(-pivot)
            * center;

        let font = shaped.font.clone();
        let layout = shaped.layout.clone();
        self.with_ctx(|ctx| {
            ctx.set_transform(affine_to_cpu(affine));
            if alpha < 1.0 {
                ctx.push_opacity_layer(alpha);
            }
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
            if alpha < 1.0 {
                ctx.pop_layer();
            }
            Ok(())
        })
    }

    fn image_for(&mut self, asset_id: AssetId, source: &Path) -> CutResult<CachedImage> {
        if let Some(cached) = self.image_cache.get(&asset_id) {
            return Ok(cached.clone());
        }
        let decoded = image::open(source)
            .map_err(|e| CutError::decode(format!("failed to decode image '{}': {e}", source.display())))?
            .to_rgba8();
        let (w, h) = decoded.dimensions();
        let mut bytes = decoded.into_raw();
        blend::premultiply_rgba8_in_place(&mut bytes);
        let pixmap = pixmap_from_premul_bytes(&bytes, w, h)?;
        let cached = CachedImage {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: w,
            height: h,
        };
        self.image_cache.insert(asset_id, cached.clone());
        Ok(cached)
    }

    /// Run a draw closure against a reusable render context and read the
    /// result back as premultiplied bytes.
    fn with_ctx(
        &mut self,
        draw: impl FnOnce(&mut vello_cpu::RenderContext) -> CutResult<()>,
    ) -> CutResult<Vec<u8>> {
        let w: u16 = self
            .canvas
            .width
            .try_into()
            .map_err(|_| CutError::validation("canvas width exceeds u16"))?;
        let h: u16 = self
            .canvas
            .height
            .try_into()
            .map_err(|_| CutError::validation("canvas height exceeds u16"))?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        draw(&mut ctx)?;
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        let out = pixmap.data_as_u8_slice().to_vec();
        self.ctx = Some(ctx);
        Ok(out)
    }
}

fn clip_opacity(rc: &ResolvedClip<'_>) -> f32 {
    match &rc.clip.props {
        ClipProps::Video { opacity, .. } | ClipProps::Overlay { opacity, .. } => {
            (*opacity as f32).clamp(0.0, 1.0)
        }
        _ => 1.0,
    }
}

fn clip_transform(rc: &ResolvedClip<'_>) -> Transform2D {
    match &rc.clip.props {
        ClipProps::Video { transform, .. }
        | ClipProps::Overlay { transform, .. }
        | ClipProps::Text { transform, .. } => *transform,
        ClipProps::Audio { .. } => Transform2D::default(),
    }
}

/// Visual fade envelope for overlay clips, anchored to the clip edges.
fn visual_fade(rc: &ResolvedClip<'_>) -> f32 {
    let ClipProps::Overlay {
        fade_in_sec,
        fade_out_sec,
        ..
    } = &rc.clip.props
    else {
        return 1.0;
    };
    let elapsed = (rc.local_sec - rc.clip.trim_start_sec).max(0.0);
    let remaining = (rc.clip.duration_sec - elapsed).max(0.0);
    let mut g = 1.0f64;
    if *fade_in_sec > 0.0 {
        g = g.min((elapsed / fade_in_sec).clamp(0.0, 1.0));
    }
    if *fade_out_sec > 0.0 {
        g = g.min((remaining / fade_out_sec).clamp(0.0, 1.0));
    }
    g as f32
}

/// Scale-to-fit affine mapping a `w x h` source into the canvas, centered
/// with letterboxing.
fn fit_affine(w: u32, h: u32, cw: u32, ch: u32) -> Affine {
    if w == 0 || h == 0 {
        return Affine::IDENTITY;
    }
    let s = (f64::from(cw) / f64::from(w)).min(f64::from(ch) / f64::from(h));
    let tx = (f64::from(cw) - f64::from(w) * s) / 2.0;
    let ty = (f64::from(ch) - f64::from(h) * s) / 2.0;
    Affine::translate(Vec2::new(tx, ty)) * Affine::scale(s)
}

/// Clip placement in pixel space: offset from canvas center, uniform scale
/// and rotation about the canvas center.
fn clip_affine_px(t: Transform2D, cw: f64, ch: f64) -> Affine {
    let pivot = Vec2::new(cw / 2.0, ch / 2.0);
    Affine::translate(Vec2::new(t.x, t.y))
        * Affine::translate(pivot)
        * Affine::rotate(t.rotation.to_radians())
        * Affine::scale(t.scale)
        * Affine::translate(-pivot)
}

/// Transition style transform with normalized translations scaled to pixels
/// and the linear part applied about the canvas center.
fn style_affine_px(style: Affine, cw: f64, ch: f64) -> Affine {
    let c = style.as_coeffs();
    let linear = Affine::new([c[0], c[1], c[2], c[3], 0.0, 0.0]);
    let pivot = Vec2::new(cw / 2.0, ch / 2.0);
    Affine::translate(Vec2::new(c[4] * cw, c[5] * ch))
        * Affine::translate(pivot)
        * linear
        * Affine::translate(-pivot)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> CutResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CutError::evaluation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CutError::evaluation("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize).saturating_mul(height as usize).saturating_mul(4) {
        return Err(CutError::evaluation("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}
