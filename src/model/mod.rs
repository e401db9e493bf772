//! Time-domain data model: project settings, media assets, tracks, clips and
//! transitions.
//!
//! The model is pure serializable data plus invariant helpers. All mutation
//! goes through [`crate::session::EditorSession`], which is also where history
//! snapshots and derived-duration recomputation live.

mod asset;
mod clip;
mod project;
mod timeline;
mod track;
mod transition;

pub use asset::{MediaAsset, MediaKind};
pub use clip::{Clip, ClipKind, ClipProps, TextAnimation, Transform2D};
pub use project::ProjectSettings;
pub use timeline::Timeline;
pub use track::{Track, TrackKind, TrackRole};
pub use transition::{TRANSITION_ADJACENCY_EPSILON, Transition};

/// Identifier for a [`Track`].
pub type TrackId = uuid::Uuid;
/// Identifier for a [`Clip`].
pub type ClipId = uuid::Uuid;
/// Identifier for a [`Transition`].
pub type TransitionId = uuid::Uuid;
/// Identifier for a [`MediaAsset`].
pub type AssetId = uuid::Uuid;
