//! Platform view creation.
//!
//! A plugin registers one [`PlatformViewFactory`] per view type string;
//! the host asks the [`ViewRegistry`] to create views by type, and the
//! registry stamps each created view with a sequential [`ViewId`].

use crate::{RenderMode, ViewId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// View registry error
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("No factory registered for view type: {0}")]
    UnknownViewType(String),
}

/// A created, embeddable view instance.
pub trait PlatformView: Send + Sync {
    fn id(&self) -> ViewId;
    fn render_mode(&self) -> RenderMode;
}

// Opaque `Debug` so `Result`s carrying boxed views can be unwrapped in tests.
impl std::fmt::Debug for dyn PlatformView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformView").field("id", &self.id()).finish()
    }
}

/// Creates views for one registered view type.
pub trait PlatformViewFactory: Send + Sync {
    /// Build a view. `args` carries the creation parameters the caller
    /// supplied, `Null` when there were none.
    fn create_view(
        &self,
        id: ViewId,
        args: serde_json::Value,
    ) -> anyhow::Result<Box<dyn PlatformView>>;
}

/// Registry of view factories keyed by view type.
pub struct ViewRegistry {
    factories: RwLock<HashMap<String, Arc<dyn PlatformViewFactory>>>,
    next_view_id: AtomicI64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            next_view_id: AtomicI64::new(0),
        }
    }

    /// Register a factory for `view_type`. Returns false when the type is
    /// already taken; the existing factory stays in place.
    pub fn register(&self, view_type: &str, factory: Arc<dyn PlatformViewFactory>) -> bool {
        let mut factories = self.factories.write();
        if factories.contains_key(view_type) {
            return false;
        }
        factories.insert(view_type.to_string(), factory);
        debug!(view_type, "view factory registered");
        true
    }

    pub fn is_registered(&self, view_type: &str) -> bool {
        self.factories.read().contains_key(view_type)
    }

    /// Create a view of `view_type`, allocating its id.
    pub fn create_view(
        &self,
        view_type: &str,
        args: serde_json::Value,
    ) -> anyhow::Result<Box<dyn PlatformView>> {
        let factory = self
            .factories
            .read()
            .get(view_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownViewType(view_type.to_string()))?;
        let id = ViewId(self.next_view_id.fetch_add(1, Ordering::SeqCst));
        factory.create_view(id, args)
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}
