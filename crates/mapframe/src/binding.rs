//! Host-side binding contexts handed to the plugin.
//!
//! Modern hosts drive the plugin through two attach/detach pairs, one
//! for the engine and one for the window. Older hosts hand over a
//! single [`Registrar`] up front and never call back.

use lifecycle::{ActivityBroadcast, WindowId, WindowLifecycle};
use method_channel::Messenger;
use std::sync::Arc;
use view_host::{SurfaceHost, ViewRegistry};

/// Engine-scoped collaborators.
#[derive(Clone)]
pub struct EngineBinding {
    pub messenger: Arc<Messenger>,
    pub views: Arc<ViewRegistry>,
}

impl EngineBinding {
    pub fn new(messenger: Arc<Messenger>, views: Arc<ViewRegistry>) -> Self {
        Self { messenger, views }
    }
}

/// Window-scoped collaborators.
#[derive(Clone)]
pub struct WindowBinding {
    pub lifecycle: Arc<WindowLifecycle>,
    pub surfaces: Arc<dyn SurfaceHost>,
}

impl WindowBinding {
    pub fn new(lifecycle: Arc<WindowLifecycle>, surfaces: Arc<dyn SurfaceHost>) -> Self {
        Self {
            lifecycle,
            surfaces,
        }
    }

    pub fn window(&self) -> WindowId {
        self.lifecycle.window()
    }
}

/// A live window as seen by the legacy registrar. Legacy hosts have no
/// scoped lifecycle, only the process-wide broadcast.
#[derive(Clone)]
pub struct WindowHandle {
    pub id: WindowId,
    pub surfaces: Arc<dyn SurfaceHost>,
}

/// Legacy single-shot registration context.
///
/// `window` is `None` when registration happens from a background
/// context, in which case the plugin declines to register at all.
#[derive(Clone)]
pub struct Registrar {
    pub messenger: Arc<Messenger>,
    pub views: Arc<ViewRegistry>,
    pub window: Option<WindowHandle>,
    pub broadcast: Arc<ActivityBroadcast>,
}

impl Registrar {
    pub fn new(messenger: Arc<Messenger>, views: Arc<ViewRegistry>) -> Self {
        Self {
            messenger,
            views,
            window: None,
            broadcast: ActivityBroadcast::global(),
        }
    }

    pub fn with_window(mut self, id: WindowId, surfaces: Arc<dyn SurfaceHost>) -> Self {
        self.window = Some(WindowHandle { id, surfaces });
        self
    }

    pub fn with_broadcast(mut self, broadcast: Arc<ActivityBroadcast>) -> Self {
        self.broadcast = broadcast;
        self
    }
}
