//! Vendor map backend boundary.

use lifecycle::PhaseHandle;
use std::sync::Arc;
use view_host::{PlatformView, PlatformViewFactory, RenderMode, Surface, ViewId};

/// Boundary to the vendor map SDK.
///
/// One backend serves every map view and warm-up surface the plugin
/// creates. The first surface a backend hands out typically pays the
/// vendor stack's one-time initialization cost, which is what the
/// `warmUp` call exploits.
pub trait MapBackend: Send + Sync {
    /// Create a fresh surface. The surface signals readiness on its own
    /// once the vendor side has brought it up.
    fn create_surface(&self) -> anyhow::Result<Arc<dyn Surface>>;
}

/// A map view embedded in host UI.
pub struct MapView {
    id: ViewId,
    render_mode: RenderMode,
    surface: Arc<dyn Surface>,
}

impl MapView {
    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }
}

impl PlatformView for MapView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn render_mode(&self) -> RenderMode {
        self.render_mode
    }
}

/// Creates [`MapView`]s for the registered map view type.
///
/// The factory samples the window phase at each creation to pick the
/// view's initial render mode; overlay composition is only used while
/// the window is foreground.
pub struct MapViewFactory {
    backend: Arc<dyn MapBackend>,
    phase: PhaseHandle,
}

impl MapViewFactory {
    pub fn new(backend: Arc<dyn MapBackend>, phase: PhaseHandle) -> Self {
        Self { backend, phase }
    }

    /// Typed creation path; the erased factory entry point delegates here.
    pub fn create_map_view(&self, id: ViewId) -> anyhow::Result<MapView> {
        let surface = self.backend.create_surface()?;
        let render_mode = RenderMode::for_phase(self.phase.get());
        Ok(MapView {
            id,
            render_mode,
            surface,
        })
    }
}

impl PlatformViewFactory for MapViewFactory {
    fn create_view(
        &self,
        id: ViewId,
        _args: serde_json::Value,
    ) -> anyhow::Result<Box<dyn PlatformView>> {
        Ok(Box::new(self.create_map_view(id)?))
    }
}
