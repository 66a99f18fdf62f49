//! # Mapframe View Host
//!
//! Host-side plumbing for embedding vendor views: a [`ViewTree`] that
//! holds attached surfaces by tag, and a [`ViewRegistry`] that creates
//! platform views through per-type factories.

use lifecycle::Phase;
use serde::{Deserialize, Serialize};

pub mod registry;
pub mod surface;

pub use registry::{PlatformView, PlatformViewFactory, RegistryError, ViewRegistry};
pub use surface::{Surface, SurfaceError, SurfaceHost, TreeError, ViewTree};

/// Identifier of a created platform view, allocated sequentially by the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(pub i64);

/// How an embedded view composites with the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// The vendor view is layered directly over host UI.
    Overlay,
    /// The vendor view renders into a texture the host composites.
    Texture,
}

impl RenderMode {
    /// Overlay compositing is only safe while the window is foreground;
    /// everything else falls back to texture rendering.
    pub fn for_phase(phase: Phase) -> Self {
        if phase == Phase::Resumed {
            RenderMode::Overlay
        } else {
            RenderMode::Texture
        }
    }
}
