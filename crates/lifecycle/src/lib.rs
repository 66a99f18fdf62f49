//! # Mapframe Lifecycle
//!
//! Window lifecycle primitives shared by the plugin and the host glue.
//! A [`Phase`] describes where a window currently sits in its lifecycle,
//! a [`PhaseCell`] publishes the latest phase to concurrent readers, and
//! the [`source`] module carries phase events from the host to whoever
//! registered for them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

mod phase;
pub mod source;

pub use phase::{Phase, PhaseCell, PhaseHandle};
pub use source::{
    ActivityBroadcast, BroadcastSubscription, ObserverId, PhaseObserver, WindowLifecycle,
    WindowPhaseListener,
};

/// Stable identity of a host window.
///
/// Lifecycle events on the shared broadcast carry the id of the window
/// they concern; listeners compare it against the window they are bound
/// to and ignore everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub Uuid);

impl WindowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
