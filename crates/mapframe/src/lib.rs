//! # Mapframe
//!
//! Plugin that embeds vendor map views in a windowed host. Map overlays
//! track the host window's lifecycle: the [`LifecycleCoordinator`] keeps
//! one authoritative phase value fed by whichever notification source
//! the host wires up, and the plugin's utils channel offers a `warmUp`
//! call that primes the vendor stack ahead of the first real map view.

pub mod backend;
pub mod binding;
pub mod config;
pub mod coordinator;
pub mod plugin;
pub mod warmup;

pub use backend::{MapBackend, MapView, MapViewFactory};
pub use binding::{EngineBinding, Registrar, WindowBinding, WindowHandle};
pub use config::{PluginConfig, WarmUpSettings};
pub use coordinator::{CoordinatorError, LifecycleCoordinator};
pub use plugin::MapFramePlugin;
pub use warmup::{WarmUpError, WarmUpHandle};

/// Channel carrying plugin-level utility calls.
pub const UTILS_CHANNEL: &str = "mapframe/utils";

/// View type the map view factory is registered under.
pub const MAP_VIEW_TYPE: &str = "mapframe/map_views";

/// Error code reported for failed `warmUp` calls.
pub const WARM_UP_ERROR_CODE: &str = "WarmUp error";
