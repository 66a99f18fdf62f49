//! Lifecycle notification sources.
//!
//! Phase events reach the plugin over one of two channels:
//!
//! - [`WindowLifecycle`], the scoped source. Each window owns one, and an
//!   observer registered on it only ever hears about that window.
//! - [`ActivityBroadcast`], the legacy process-wide source. Announcements
//!   carry the [`WindowId`] they concern and every listener sees every
//!   announcement, so listeners filter for the window they care about.
//!
//! Subscribing to the broadcast returns a [`BroadcastSubscription`] guard;
//! dropping the guard deregisters the listener. Both sources snapshot
//! their listener list before dispatching, so a listener may drop its own
//! subscription from inside the callback.

use crate::{Phase, WindowId};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static GLOBAL_BROADCAST: Lazy<Arc<ActivityBroadcast>> =
    Lazy::new(|| Arc::new(ActivityBroadcast::new()));

/// Observer of a single window's phase events.
pub trait PhaseObserver: Send + Sync {
    fn on_phase(&self, phase: Phase);
}

/// Listener on the process-wide broadcast. Events name the window they
/// concern.
pub trait WindowPhaseListener: Send + Sync {
    fn on_window_phase(&self, window: WindowId, phase: Phase);
}

/// Registration handle returned by [`WindowLifecycle::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Scoped lifecycle source owned by a single window.
///
/// The host emits phase events serially on its event loop; observers are
/// invoked in registration order on the emitting thread.
pub struct WindowLifecycle {
    window: WindowId,
    observers: RwLock<Vec<(ObserverId, Arc<dyn PhaseObserver>)>>,
    next_id: AtomicU64,
}

impl WindowLifecycle {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The window this source reports for.
    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn add_observer(&self, observer: Arc<dyn PhaseObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().push((id, observer));
        id
    }

    /// Returns false if the observer was already removed.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() < before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver a phase event to every registered observer.
    pub fn emit(&self, phase: Phase) {
        trace!(window = %self.window, %phase, "window lifecycle event");
        let observers: Vec<Arc<dyn PhaseObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_phase(phase);
        }
    }
}

type ListenerMap = Arc<RwLock<HashMap<u64, Arc<dyn WindowPhaseListener>>>>;

/// Process-wide lifecycle broadcast shared by every window.
///
/// The legacy registration path subscribes here because older hosts only
/// expose one lifecycle feed for the whole process.
pub struct ActivityBroadcast {
    listeners: ListenerMap,
    next_id: AtomicU64,
}

impl ActivityBroadcast {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-global broadcast used by legacy registration.
    pub fn global() -> Arc<ActivityBroadcast> {
        Arc::clone(&GLOBAL_BROADCAST)
    }

    /// Register a listener. The subscription deregisters it when dropped.
    pub fn subscribe(&self, listener: Arc<dyn WindowPhaseListener>) -> BroadcastSubscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().insert(id, listener);
        trace!(subscription = id, "broadcast listener registered");
        BroadcastSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an announcement to every listener, whatever window it is
    /// interested in.
    pub fn announce(&self, window: WindowId, phase: Phase) {
        let listeners: Vec<Arc<dyn WindowPhaseListener>> =
            self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener.on_window_phase(window, phase);
        }
    }
}

impl Default for ActivityBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for an [`ActivityBroadcast`] registration.
///
/// Dropping the guard removes the listener; announcements already in
/// flight on another thread may still be delivered once.
pub struct BroadcastSubscription {
    id: u64,
    listeners: ListenerMap,
}

impl BroadcastSubscription {
    /// Deregister now rather than at drop time.
    pub fn cancel(self) {}
}

impl Drop for BroadcastSubscription {
    fn drop(&mut self) {
        self.listeners.write().remove(&self.id);
        trace!(subscription = self.id, "broadcast listener removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        phases: Mutex<Vec<Phase>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                phases: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Phase> {
            self.phases.lock().clone()
        }
    }

    impl PhaseObserver for Recorder {
        fn on_phase(&self, phase: Phase) {
            self.phases.lock().push(phase);
        }
    }

    struct WindowRecorder {
        events: Mutex<Vec<(WindowId, Phase)>>,
    }

    impl WindowRecorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }
    }

    impl WindowPhaseListener for WindowRecorder {
        fn on_window_phase(&self, window: WindowId, phase: Phase) {
            self.events.lock().push((window, phase));
        }
    }

    #[test]
    fn test_observers_receive_events_in_order() {
        let lifecycle = WindowLifecycle::new(WindowId::new());
        let recorder = Recorder::new();
        lifecycle.add_observer(recorder.clone());

        lifecycle.emit(Phase::Created);
        lifecycle.emit(Phase::Started);
        lifecycle.emit(Phase::Resumed);

        assert_eq!(
            recorder.seen(),
            vec![Phase::Created, Phase::Started, Phase::Resumed]
        );
    }

    #[test]
    fn test_removed_observer_stops_receiving() {
        let lifecycle = WindowLifecycle::new(WindowId::new());
        let recorder = Recorder::new();
        let id = lifecycle.add_observer(recorder.clone());

        lifecycle.emit(Phase::Created);
        assert!(lifecycle.remove_observer(id));
        assert!(!lifecycle.remove_observer(id));
        lifecycle.emit(Phase::Started);

        assert_eq!(recorder.seen(), vec![Phase::Created]);
        assert_eq!(lifecycle.observer_count(), 0);
    }

    #[test]
    fn test_broadcast_reaches_every_listener() {
        let broadcast = Arc::new(ActivityBroadcast::new());
        let first = WindowRecorder::new();
        let second = WindowRecorder::new();
        let _a = broadcast.subscribe(first.clone());
        let _b = broadcast.subscribe(second.clone());

        let window = WindowId::new();
        broadcast.announce(window, Phase::Paused);

        assert_eq!(first.events.lock().as_slice(), &[(window, Phase::Paused)]);
        assert_eq!(second.events.lock().as_slice(), &[(window, Phase::Paused)]);
    }

    #[test]
    fn test_dropping_subscription_deregisters() {
        let broadcast = Arc::new(ActivityBroadcast::new());
        let recorder = WindowRecorder::new();
        let subscription = broadcast.subscribe(recorder.clone());
        assert_eq!(broadcast.listener_count(), 1);

        drop(subscription);
        assert_eq!(broadcast.listener_count(), 0);

        broadcast.announce(WindowId::new(), Phase::Created);
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_cancel_deregisters() {
        let broadcast = Arc::new(ActivityBroadcast::new());
        let subscription = broadcast.subscribe(WindowRecorder::new());
        subscription.cancel();
        assert_eq!(broadcast.listener_count(), 0);
    }

    struct SelfRemover {
        subscription: Mutex<Option<BroadcastSubscription>>,
        calls: AtomicUsize,
    }

    impl WindowPhaseListener for SelfRemover {
        fn on_window_phase(&self, _window: WindowId, _phase: Phase) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Dropping our own subscription mid-callback must not deadlock.
            drop(self.subscription.lock().take());
        }
    }

    #[test]
    fn test_listener_may_drop_own_subscription_in_callback() {
        let broadcast = Arc::new(ActivityBroadcast::new());
        let listener = Arc::new(SelfRemover {
            subscription: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let subscription = broadcast.subscribe(listener.clone());
        *listener.subscription.lock() = Some(subscription);

        let window = WindowId::new();
        broadcast.announce(window, Phase::Destroyed);
        broadcast.announce(window, Phase::Destroyed);

        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(broadcast.listener_count(), 0);
    }

    #[test]
    fn test_global_broadcast_is_shared() {
        let a = ActivityBroadcast::global();
        let b = ActivityBroadcast::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
