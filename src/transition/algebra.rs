use kurbo::Affine;

use crate::transition::{SlideDir, TransitionKind};

/// Composable visual style for one side of a transition.
///
/// Translations inside `transform` are expressed in canvas fractions
/// (1.0 = one full canvas width/height); the compositor scales them to
/// pixels. Scale components are dimensionless.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerStyle {
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
    /// 2D transform in normalized canvas units.
    pub transform: Affine,
    /// Optional reveal mask (wipes).
    pub wipe: Option<WipeMask>,
    /// Gaussian blur radius in pixels, 0 for none.
    pub blur_px: f32,
}

impl LayerStyle {
    /// Fully opaque, untransformed, unmasked, unblurred.
    pub fn identity() -> Self {
        Self {
            opacity: 1.0,
            transform: Affine::IDENTITY,
            wipe: None,
            blur_px: 0.0,
        }
    }

    /// Return `true` when this style makes the layer invisible: zero
    /// opacity, zero mask coverage, or fully offset out of the canvas.
    pub fn is_hidden(&self) -> bool {
        if self.opacity <= 0.0 {
            return true;
        }
        if let Some(w) = self.wipe
            && w.coverage <= 0.0
        {
            return true;
        }
        let t = self.transform.translation();
        t.x.abs() >= 1.0 || t.y.abs() >= 1.0
    }

    /// Return `true` when this style leaves the layer untouched.
    pub fn is_identity(&self) -> bool {
        self.opacity >= 1.0
            && self.transform == Affine::IDENTITY
            && self.wipe.is_none_or(|w| w.coverage >= 1.0)
            && self.blur_px <= 0.0
    }
}

/// A directional reveal mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WipeMask {
    /// Edge travel direction.
    pub dir: SlideDir,
    /// Revealed fraction of the travel axis in `[0, 1]`.
    pub coverage: f32,
    /// Soft-edge width as a fraction of the travel axis.
    pub soft_edge: f32,
}

/// Screen-space overlay layer emitted by stylized transitions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayFx {
    /// Overlay content.
    pub kind: OverlayKind,
    /// Overlay strength in `[0, 1]`.
    pub intensity: f32,
    /// Blend mode applied on top of the blended layers.
    pub blend: OverlayBlend,
}

/// Overlay content kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    /// Uniform white flash.
    Flash,
    /// Procedural film grain.
    FilmGrain,
}

/// Overlay blend modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayBlend {
    /// Screen blend (brightens).
    Screen,
    /// Multiply blend (darkens).
    Multiply,
}

/// Paired styles for the outgoing and incoming layers, plus an optional
/// screen-space overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionVisuals {
    /// Style applied to the outgoing clip's layer.
    pub outgoing: LayerStyle,
    /// Style applied to the incoming clip's layer.
    pub incoming: LayerStyle,
    /// Optional overlay drawn above both layers.
    pub overlay: Option<OverlayFx>,
}

/// Normalized `[0, 1]` position within a transition window.
///
/// Progress is measured against the *incoming* clip: 0 at `to_start`, 1 at
/// `to_start + duration`. Values outside the window clamp.
pub fn transition_progress(t: f64, to_start_sec: f64, duration_sec: f64) -> f32 {
    if duration_sec <= 0.0 {
        return 1.0;
    }
    (((t - to_start_sec) / duration_sec).clamp(0.0, 1.0)) as f32
}

/// Peak zoom-blend blur radius in pixels.
const ZOOM_BLUR_MAX_PX: f32 = 6.0;

fn opposite(dir: SlideDir) -> SlideDir {
    match dir {
        SlideDir::Left => SlideDir::Right,
        SlideDir::Right => SlideDir::Left,
        SlideDir::Up => SlideDir::Down,
        SlideDir::Down => SlideDir::Up,
    }
}

fn slide_offset(dir: SlideDir, amount: f64) -> Affine {
    match dir {
        SlideDir::Left => Affine::translate((amount, 0.0)),
        SlideDir::Right => Affine::translate((-amount, 0.0)),
        SlideDir::Up => Affine::translate((0.0, amount)),
        SlideDir::Down => Affine::translate((0.0, -amount)),
    }
}

/// Pure mapping `(kind, progress) -> visuals`.
///
/// Symmetric and continuous: at progress 0 the incoming layer is hidden and
/// the outgoing untouched; at progress 1 the reverse. Once progress reaches
/// 1 the transition is inactive and callers should drop the outgoing layer.
pub fn transition_visuals(kind: TransitionKind, progress: f32) -> TransitionVisuals {
    let p = progress.clamp(0.0, 1.0);
    let q = 1.0 - p;

    match kind {
        TransitionKind::Crossfade => TransitionVisuals {
            outgoing: LayerStyle {
                opacity: q,
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                opacity: p,
                ..LayerStyle::identity()
            },
            overlay: None,
        },
        TransitionKind::FadeToBlack => TransitionVisuals {
            outgoing: LayerStyle {
                opacity: (1.0 - 2.0 * p).clamp(0.0, 1.0),
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                opacity: (2.0 * p - 1.0).clamp(0.0, 1.0),
                ..LayerStyle::identity()
            },
            overlay: None,
        },
        TransitionKind::Slide(dir) => TransitionVisuals {
            outgoing: LayerStyle {
                transform: slide_offset(dir, -f64::from(p)),
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                transform: slide_offset(dir, f64::from(q)),
                ..LayerStyle::identity()
            },
            overlay: None,
        },
        TransitionKind::Wipe(dir) => TransitionVisuals {
            // The outgoing layer keeps the unrevealed region, so its mask
            // travels the opposite way with complementary coverage.
            outgoing: LayerStyle {
                wipe: Some(WipeMask {
                    dir: opposite(dir),
                    coverage: q,
                    soft_edge: 0.05,
                }),
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                wipe: Some(WipeMask {
                    dir,
                    coverage: p,
                    soft_edge: 0.05,
                }),
                ..LayerStyle::identity()
            },
            overlay: None,
        },
        TransitionKind::ZoomBlend => {
            let out_scale = 1.0 + 0.15 * f64::from(p);
            let in_scale = 0.85 + 0.15 * f64::from(p);
            // Motion blur stand-in, peaking halfway and vanishing at both
            // endpoints so continuity holds.
            let blur_px = (p * q * 4.0).clamp(0.0, 1.0) * ZOOM_BLUR_MAX_PX;
            TransitionVisuals {
                outgoing: LayerStyle {
                    opacity: q,
                    transform: Affine::scale(out_scale),
                    wipe: None,
                    blur_px,
                },
                incoming: LayerStyle {
                    opacity: p,
                    transform: Affine::scale(in_scale),
                    wipe: None,
                    blur_px,
                },
                overlay: None,
            }
        }
        TransitionKind::Flash => TransitionVisuals {
            outgoing: LayerStyle {
                opacity: q,
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                opacity: p,
                ..LayerStyle::identity()
            },
            overlay: Some(OverlayFx {
                kind: OverlayKind::Flash,
                intensity: (p * q * 4.0).clamp(0.0, 1.0),
                blend: OverlayBlend::Screen,
            }),
        },
        TransitionKind::FilmBurn => TransitionVisuals {
            outgoing: LayerStyle {
                opacity: q,
                ..LayerStyle::identity()
            },
            incoming: LayerStyle {
                opacity: p,
                ..LayerStyle::identity()
            },
            overlay: Some(OverlayFx {
                kind: OverlayKind::FilmGrain,
                intensity: (p * q * 4.0).clamp(0.0, 1.0),
                blend: OverlayBlend::Multiply,
            }),
        },
    }
}
