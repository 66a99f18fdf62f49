use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of a host window.
///
/// The discriminants match the order in which a window normally walks
/// through its lifecycle. [`Phase::Uninitialized`] is never reported by a
/// host; it is the value a [`PhaseCell`] holds before the first event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    Uninitialized = 0,
    Created = 1,
    Started = 2,
    Resumed = 3,
    Paused = 4,
    Stopped = 5,
    /// Terminal for the window the value was observed on. A coordinator
    /// can still be rebound to a fresh window afterwards.
    Destroyed = 6,
}

impl Phase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Phase::Created,
            2 => Phase::Started,
            3 => Phase::Resumed,
            4 => Phase::Paused,
            5 => Phase::Stopped,
            6 => Phase::Destroyed,
            _ => Phase::Uninitialized,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Created => "created",
            Phase::Started => "started",
            Phase::Resumed => "resumed",
            Phase::Paused => "paused",
            Phase::Stopped => "stopped",
            Phase::Destroyed => "destroyed",
        };
        write!(f, "{name}")
    }
}

/// Latest observed [`Phase`], shared between the lifecycle thread and
/// readers on other threads.
///
/// Host lifecycle events arrive serialized on the host's event loop, so
/// every store simply overwrites the previous value. The atomic is there
/// for visibility, not for ordering between writers.
#[derive(Debug)]
pub struct PhaseCell {
    raw: AtomicU8,
}

impl PhaseCell {
    pub fn new() -> Self {
        Self {
            raw: AtomicU8::new(Phase::Uninitialized as u8),
        }
    }

    /// Overwrite the current phase.
    pub fn set(&self, phase: Phase) {
        self.raw.store(phase as u8, Ordering::SeqCst);
    }

    /// Snapshot of the current phase.
    pub fn get(&self) -> Phase {
        Phase::from_raw(self.raw.load(Ordering::SeqCst))
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable read-only view of a [`PhaseCell`].
///
/// Handed out to collaborators that need to consult the current phase at
/// their own moments, without being able to write it and without any
/// change notification.
#[derive(Debug, Clone)]
pub struct PhaseHandle {
    cell: Arc<PhaseCell>,
}

impl PhaseHandle {
    pub fn new(cell: Arc<PhaseCell>) -> Self {
        Self { cell }
    }

    /// Snapshot of the current phase.
    pub fn get(&self) -> Phase {
        self.cell.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cell_starts_uninitialized() {
        let cell = PhaseCell::new();
        assert_eq!(cell.get(), Phase::Uninitialized);
    }

    #[test]
    fn test_last_write_wins() {
        let cell = PhaseCell::new();
        cell.set(Phase::Created);
        cell.set(Phase::Started);
        cell.set(Phase::Resumed);
        assert_eq!(cell.get(), Phase::Resumed);

        cell.set(Phase::Paused);
        assert_eq!(cell.get(), Phase::Paused);
    }

    #[test]
    fn test_writes_visible_across_threads() {
        let cell = Arc::new(PhaseCell::new());

        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.set(Phase::Destroyed))
        };
        writer.join().unwrap();

        let reader = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.get())
        };
        assert_eq!(reader.join().unwrap(), Phase::Destroyed);
    }

    #[test]
    fn test_handle_tracks_cell() {
        let cell = Arc::new(PhaseCell::new());
        let handle = PhaseHandle::new(Arc::clone(&cell));
        assert_eq!(handle.get(), Phase::Uninitialized);

        cell.set(Phase::Resumed);
        assert_eq!(handle.get(), Phase::Resumed);

        let second = handle.clone();
        cell.set(Phase::Stopped);
        assert_eq!(second.get(), Phase::Stopped);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Phase::Resumed.to_string(), "resumed");
        assert_eq!(Phase::Uninitialized.to_string(), "uninitialized");
        assert_eq!(Phase::Destroyed.to_string(), "destroyed");
    }
}
