//! The mapframe plugin.
//!
//! Glues everything together: engine and window attachment, the
//! lifecycle coordinator, map view factory registration, and the utils
//! channel with its `warmUp` call.

use crate::backend::{MapBackend, MapViewFactory};
use crate::binding::{EngineBinding, Registrar, WindowBinding};
use crate::config::PluginConfig;
use crate::coordinator::LifecycleCoordinator;
use crate::warmup::{WarmUpError, WarmUpHandle, WarmUpRequest};
use crate::{MAP_VIEW_TYPE, UTILS_CHANNEL, WARM_UP_ERROR_CODE};
use anyhow::anyhow;
use async_trait::async_trait;
use method_channel::{MethodCall, MethodChannel, MethodHandler, MethodReply, Messenger};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use view_host::{SurfaceHost, ViewRegistry};

/// Map views for a windowed embedder.
///
/// One plugin instance serves one engine. Modern hosts construct it with
/// [`MapFramePlugin::new`] and drive the attach/detach callbacks; legacy
/// hosts go through [`MapFramePlugin::register_with`] once.
#[derive(Clone)]
pub struct MapFramePlugin {
    inner: Arc<PluginInner>,
}

struct PluginInner {
    backend: Arc<dyn MapBackend>,
    config: PluginConfig,
    engine: RwLock<Option<EngineBinding>>,
    coordinator: RwLock<Option<LifecycleCoordinator>>,
    surfaces: RwLock<Option<Arc<dyn SurfaceHost>>>,
}

impl MapFramePlugin {
    pub fn new(backend: Arc<dyn MapBackend>, config: PluginConfig) -> Self {
        Self {
            inner: Arc::new(PluginInner {
                backend,
                config,
                engine: RwLock::new(None),
                coordinator: RwLock::new(None),
                surfaces: RwLock::new(None),
            }),
        }
    }

    /// Legacy single-shot registration.
    ///
    /// Returns `None` from background contexts: map views are foreground
    /// only, so a registrar without a window registers nothing.
    pub fn register_with(
        backend: Arc<dyn MapBackend>,
        config: PluginConfig,
        registrar: &Registrar,
    ) -> Option<MapFramePlugin> {
        let Some(window) = registrar.window.clone() else {
            info!("skipping legacy registration from background context");
            return None;
        };

        let plugin = MapFramePlugin::new(backend, config);
        *plugin.inner.engine.write() = Some(EngineBinding::new(
            Arc::clone(&registrar.messenger),
            Arc::clone(&registrar.views),
        ));
        *plugin.inner.surfaces.write() = Some(Arc::clone(&window.surfaces));

        let coordinator = PluginInner::ensure_coordinator(&plugin.inner, &registrar.messenger);
        if let Err(err) = coordinator.bind_broadcast(window.id, &registrar.broadcast) {
            warn!(error = %err, "legacy lifecycle bind failed");
        }
        plugin
            .inner
            .register_view_factory(&registrar.views, &coordinator);

        info!(window = %window.id, "registered via legacy registrar");
        Some(plugin)
    }

    pub fn attach_to_engine(&self, binding: EngineBinding) {
        *self.inner.engine.write() = Some(binding);
        debug!("attached to engine");
    }

    pub fn detach_from_engine(&self) {
        *self.inner.engine.write() = None;
        debug!("detached from engine");
    }

    /// Attach to a window: starts following the window's lifecycle,
    /// registers the map view factory, and binds the utils channel. A
    /// refused attach leaves existing state untouched.
    pub fn attach_to_window(&self, binding: WindowBinding) -> anyhow::Result<()> {
        let engine = self
            .inner
            .engine
            .read()
            .clone()
            .ok_or_else(|| anyhow!("plugin is not attached to an engine"))?;

        // Bind first: nothing may be swapped in for a window that is
        // rejected here.
        let coordinator = PluginInner::ensure_coordinator(&self.inner, &engine.messenger);
        coordinator.bind_observed(&binding.lifecycle)?;
        self.inner.register_view_factory(&engine.views, &coordinator);
        *self.inner.surfaces.write() = Some(Arc::clone(&binding.surfaces));

        info!(window = %binding.window(), "attached to window");
        Ok(())
    }

    pub fn detach_from_window(&self) {
        if let Some(coordinator) = self.inner.coordinator.read().clone() {
            coordinator.unbind();
        }
        *self.inner.surfaces.write() = None;
        debug!("detached from window");
    }

    /// Window detach driven by a configuration change; a matching
    /// [`MapFramePlugin::reattach_to_window`] follows shortly.
    pub fn detach_from_window_for_config_change(&self) {
        self.detach_from_window();
    }

    /// Rebind to a fresh window after a configuration change. The phase
    /// carries over from before the detach; the view factory stays
    /// registered from the first attach.
    pub fn reattach_to_window(&self, binding: WindowBinding) -> anyhow::Result<()> {
        let coordinator = self
            .inner
            .coordinator
            .read()
            .clone()
            .ok_or_else(|| anyhow!("plugin was never attached to a window"))?;

        coordinator.bind_observed(&binding.lifecycle)?;
        *self.inner.surfaces.write() = Some(Arc::clone(&binding.surfaces));

        info!(window = %binding.window(), "reattached to window");
        Ok(())
    }

    /// Snapshot of the coordinator, once one exists.
    pub fn coordinator(&self) -> Option<LifecycleCoordinator> {
        self.inner.coordinator.read().clone()
    }

    /// Kick off a warm-up and return a handle to it.
    ///
    /// The operation runs on its own task; dropping the handle detaches
    /// from it without stopping it.
    pub fn warm_up(&self) -> WarmUpHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        match self.inner.warm_up_request() {
            Ok(request) => {
                tokio::spawn(async move {
                    let _ = done_tx.send(request.run(cancel_rx).await);
                });
            }
            Err(err) => {
                let _ = done_tx.send(Err(err));
            }
        }
        WarmUpHandle::new(cancel_tx, done_rx)
    }
}

impl PluginInner {
    fn ensure_coordinator(this: &Arc<Self>, messenger: &Arc<Messenger>) -> LifecycleCoordinator {
        let mut slot = this.coordinator.write();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let channel = MethodChannel::new(Arc::clone(messenger), UTILS_CHANNEL);
        let handler = Arc::new(UtilsHandler {
            plugin: Arc::downgrade(this),
        });
        let coordinator = LifecycleCoordinator::new(channel, handler);
        *slot = Some(coordinator.clone());
        coordinator
    }

    fn register_view_factory(&self, views: &Arc<ViewRegistry>, coordinator: &LifecycleCoordinator) {
        let factory = Arc::new(MapViewFactory::new(
            Arc::clone(&self.backend),
            coordinator.phase_handle(),
        ));
        if !views.register(MAP_VIEW_TYPE, factory) {
            debug!(view_type = MAP_VIEW_TYPE, "view factory already registered");
        }
    }

    fn warm_up_request(&self) -> Result<WarmUpRequest, WarmUpError> {
        let surfaces = self
            .surfaces
            .read()
            .clone()
            .ok_or(WarmUpError::NoSurfaceHost)?;
        Ok(WarmUpRequest {
            surfaces,
            backend: Arc::clone(&self.backend),
            ready_timeout: self.config.warm_up.ready_timeout(),
        })
    }
}

/// Handler for the utils channel.
struct UtilsHandler {
    plugin: Weak<PluginInner>,
}

#[async_trait]
impl MethodHandler for UtilsHandler {
    async fn handle(&self, call: MethodCall) -> MethodReply {
        match call.method.as_str() {
            "warmUp" => {
                let Some(plugin) = self.plugin.upgrade() else {
                    return MethodReply::error(
                        WARM_UP_ERROR_CODE,
                        "Plugin released before the call ran",
                        None,
                    );
                };
                let request = match plugin.warm_up_request() {
                    Ok(request) => request,
                    Err(err) => return warm_up_error_reply(&err),
                };
                // No cancellation over the channel; the call either
                // completes or times out on its own.
                let (_cancel_tx, cancel_rx) = oneshot::channel();
                match request.run(cancel_rx).await {
                    Ok(()) => MethodReply::ok(),
                    Err(err) => {
                        warn!(error = %err, "warm-up failed");
                        warm_up_error_reply(&err)
                    }
                }
            }
            _ => MethodReply::NotImplemented,
        }
    }
}

fn warm_up_error_reply(err: &WarmUpError) -> MethodReply {
    let details = match err {
        WarmUpError::Create(cause)
        | WarmUpError::Attach(cause)
        | WarmUpError::Teardown(cause) => Some(serde_json::json!(format!("{cause:#}"))),
        _ => None,
    };
    MethodReply::error(WARM_UP_ERROR_CODE, err.to_string(), details)
}
