//! Transition kinds and the pure style algebra used by the resolver and
//! compositor.

mod algebra;

pub use algebra::{
    LayerStyle, OverlayBlend, OverlayFx, OverlayKind, TransitionVisuals, WipeMask,
    transition_progress, transition_visuals,
};

/// Direction for slide and wipe transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SlideDir {
    /// Incoming enters from the right, moving left.
    Left,
    /// Incoming enters from the left, moving right.
    Right,
    /// Incoming enters from the bottom, moving up.
    Up,
    /// Incoming enters from the top, moving down.
    Down,
}

/// Supported transition kinds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TransitionKind {
    /// Linear opacity cross-dissolve.
    Crossfade,
    /// Outgoing fades to black in the first half, incoming fades in from
    /// black in the second.
    FadeToBlack,
    /// Incoming slides over the outgoing clip.
    Slide(SlideDir),
    /// Incoming is revealed behind a moving edge.
    Wipe(SlideDir),
    /// Outgoing zooms out while the incoming zooms in, crossfading.
    ZoomBlend,
    /// Cross-dissolve under a white screen-blend flash peaking mid-blend.
    Flash,
    /// Cross-dissolve under a multiplied film-grain burn peaking mid-blend.
    FilmBurn,
}

impl TransitionKind {
    /// All supported kinds, used by exhaustive property tests and pickers.
    pub fn all() -> Vec<TransitionKind> {
        vec![
            TransitionKind::Crossfade,
            TransitionKind::FadeToBlack,
            TransitionKind::Slide(SlideDir::Left),
            TransitionKind::Slide(SlideDir::Right),
            TransitionKind::Slide(SlideDir::Up),
            TransitionKind::Slide(SlideDir::Down),
            TransitionKind::Wipe(SlideDir::Left),
            TransitionKind::Wipe(SlideDir::Right),
            TransitionKind::Wipe(SlideDir::Up),
            TransitionKind::Wipe(SlideDir::Down),
            TransitionKind::ZoomBlend,
            TransitionKind::Flash,
            TransitionKind::FilmBurn,
        ]
    }
}
