//! Surfaces and the tag-addressed view tree.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Surface readiness error
#[derive(Debug, Clone, thiserror::Error)]
pub enum SurfaceError {
    #[error("Surface abandoned before becoming ready")]
    Abandoned,
    #[error("Surface failed: {0}")]
    Failed(String),
}

/// View tree error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TreeError {
    #[error("Tag already attached: {0}")]
    DuplicateTag(String),
    #[error("No surface attached under tag: {0}")]
    UnknownTag(String),
}

/// A view instance that can hang in the host's view tree.
///
/// `wait_ready` resolves once the backing engine has finished bringing
/// the surface up, at most once per surface. It reports
/// [`SurfaceError::Abandoned`] when the engine side is dropped first.
#[async_trait]
pub trait Surface: Send + Sync {
    async fn wait_ready(&self) -> Result<(), SurfaceError>;
}

// Opaque `Debug` so `Result`s carrying surfaces can be unwrapped in tests.
impl std::fmt::Debug for dyn Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Surface")
    }
}

/// Attachment point for surfaces.
///
/// [`ViewTree`] is the in-process implementation; embedders with native
/// view plumbing of their own supply theirs.
pub trait SurfaceHost: Send + Sync {
    fn attach(&self, tag: &str, surface: Arc<dyn Surface>) -> anyhow::Result<()>;
    fn detach(&self, tag: &str) -> anyhow::Result<()>;
}

/// Tag-addressed registry of attached surfaces.
///
/// Tags are unique: attaching under an occupied tag is refused rather
/// than silently replacing the occupant.
pub struct ViewTree {
    surfaces: RwLock<HashMap<String, Arc<dyn Surface>>>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self {
            surfaces: RwLock::new(HashMap::new()),
        }
    }

    pub fn attach(&self, tag: &str, surface: Arc<dyn Surface>) -> Result<(), TreeError> {
        let mut surfaces = self.surfaces.write();
        if surfaces.contains_key(tag) {
            return Err(TreeError::DuplicateTag(tag.to_string()));
        }
        surfaces.insert(tag.to_string(), surface);
        debug!(tag, "surface attached");
        Ok(())
    }

    /// Remove and return the surface under `tag`.
    pub fn detach(&self, tag: &str) -> Result<Arc<dyn Surface>, TreeError> {
        let surface = self
            .surfaces
            .write()
            .remove(tag)
            .ok_or_else(|| TreeError::UnknownTag(tag.to_string()))?;
        debug!(tag, "surface detached");
        Ok(surface)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.surfaces.read().contains_key(tag)
    }

    pub fn attached_count(&self) -> usize {
        self.surfaces.read().len()
    }

    pub fn tags(&self) -> Vec<String> {
        self.surfaces.read().keys().cloned().collect()
    }
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceHost for ViewTree {
    fn attach(&self, tag: &str, surface: Arc<dyn Surface>) -> anyhow::Result<()> {
        ViewTree::attach(self, tag, surface)?;
        Ok(())
    }

    fn detach(&self, tag: &str) -> anyhow::Result<()> {
        ViewTree::detach(self, tag)?;
        Ok(())
    }
}
