//! Lifecycle coordination between a host window and the plugin.
//!
//! One coordinator tracks one authoritative [`Phase`] value. The host
//! drives it through exactly one of two sources: a scoped
//! [`WindowLifecycle`], or the process-wide [`ActivityBroadcast`] with
//! identity filtering. Both sources funnel into a single `apply_phase`
//! entry point, which also gates the utils channel handler: bound on
//! `Resumed`, unbound on `Paused`, untouched by every other phase.

use lifecycle::{
    ActivityBroadcast, BroadcastSubscription, ObserverId, Phase, PhaseCell, PhaseHandle,
    PhaseObserver, WindowId, WindowLifecycle, WindowPhaseListener,
};
use method_channel::{MethodChannel, MethodHandler};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, trace};

/// Coordinator binding error
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Coordinator is already bound to a lifecycle source")]
    AlreadyBound,
}

enum Attachment {
    Unbound,
    Observed {
        lifecycle: Arc<WindowLifecycle>,
        observer: ObserverId,
    },
    Broadcast {
        subscription: BroadcastSubscription,
    },
}

/// Tracks the bound window's lifecycle phase and gates the utils channel
/// handler on it.
///
/// Phase writes are unconditional last-write-wins; the host is trusted
/// to deliver a coherent event sequence and duplicates or out-of-order
/// events are tolerated rather than rejected. Unbinding keeps the phase
/// value so a configuration-change rebind continues where the old
/// window left off.
#[derive(Clone)]
pub struct LifecycleCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    phase: Arc<PhaseCell>,
    channel: MethodChannel,
    handler: Arc<dyn MethodHandler>,
    window: RwLock<Option<WindowId>>,
    attachment: Mutex<Attachment>,
}

impl LifecycleCoordinator {
    pub fn new(channel: MethodChannel, handler: Arc<dyn MethodHandler>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                phase: Arc::new(PhaseCell::new()),
                channel,
                handler,
                window: RwLock::new(None),
                attachment: Mutex::new(Attachment::Unbound),
            }),
        }
    }

    /// Snapshot of the current phase.
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Read-only phase handle for collaborators that sample the phase at
    /// their own moments, such as the view factory.
    pub fn phase_handle(&self) -> PhaseHandle {
        PhaseHandle::new(Arc::clone(&self.inner.phase))
    }

    /// The window currently driving this coordinator, if any.
    pub fn window(&self) -> Option<WindowId> {
        *self.inner.window.read()
    }

    pub fn is_bound(&self) -> bool {
        !matches!(*self.inner.attachment.lock(), Attachment::Unbound)
    }

    /// Follow `source`, a lifecycle scoped to one window.
    ///
    /// The channel handler is bound right away; from here on phase
    /// events keep it bound or unbound.
    pub fn bind_observed(&self, source: &Arc<WindowLifecycle>) -> Result<(), CoordinatorError> {
        let mut attachment = self.inner.attachment.lock();
        if !matches!(*attachment, Attachment::Unbound) {
            return Err(CoordinatorError::AlreadyBound);
        }
        *self.inner.window.write() = Some(source.window());
        let observer = source.add_observer(Arc::new(ObservedAdapter {
            inner: Arc::clone(&self.inner),
        }));
        *attachment = Attachment::Observed {
            lifecycle: Arc::clone(source),
            observer,
        };
        drop(attachment);
        self.inner.channel.set_handler(Arc::clone(&self.inner.handler));
        debug!(window = %source.window(), "bound to window lifecycle");
        Ok(())
    }

    /// Follow the shared broadcast, applying only events for `window`.
    ///
    /// Events for any other window are discarded without touching the
    /// phase. A `Destroyed` event for `window` additionally drops the
    /// broadcast subscription for good; only a fresh bind call can
    /// attach this coordinator again.
    pub fn bind_broadcast(
        &self,
        window: WindowId,
        broadcast: &ActivityBroadcast,
    ) -> Result<(), CoordinatorError> {
        let mut attachment = self.inner.attachment.lock();
        if !matches!(*attachment, Attachment::Unbound) {
            return Err(CoordinatorError::AlreadyBound);
        }
        *self.inner.window.write() = Some(window);
        let subscription = broadcast.subscribe(Arc::new(BroadcastAdapter {
            inner: Arc::clone(&self.inner),
        }));
        *attachment = Attachment::Broadcast { subscription };
        drop(attachment);
        self.inner.channel.set_handler(Arc::clone(&self.inner.handler));
        debug!(%window, "bound to activity broadcast");
        Ok(())
    }

    /// Stop following the current source and unbind the channel handler.
    ///
    /// The phase value is retained. Calling while unbound is a no-op.
    pub fn unbind(&self) {
        let attachment =
            std::mem::replace(&mut *self.inner.attachment.lock(), Attachment::Unbound);
        match attachment {
            Attachment::Unbound => return,
            Attachment::Observed {
                lifecycle,
                observer,
            } => {
                lifecycle.remove_observer(observer);
            }
            Attachment::Broadcast { subscription } => drop(subscription),
        }
        *self.inner.window.write() = None;
        self.inner.channel.clear_handler();
        debug!("unbound from lifecycle source");
    }
}

impl CoordinatorInner {
    /// Single entry point for phase transitions from either source.
    fn apply_phase(&self, phase: Phase) {
        self.phase.set(phase);
        match phase {
            Phase::Resumed => self.channel.set_handler(Arc::clone(&self.handler)),
            Phase::Paused => self.channel.clear_handler(),
            _ => {}
        }
        debug!(%phase, "phase applied");
    }

    fn take_broadcast_subscription(&self) -> Option<BroadcastSubscription> {
        let mut attachment = self.attachment.lock();
        match std::mem::replace(&mut *attachment, Attachment::Unbound) {
            Attachment::Broadcast { subscription } => Some(subscription),
            other => {
                *attachment = other;
                None
            }
        }
    }
}

struct ObservedAdapter {
    inner: Arc<CoordinatorInner>,
}

impl PhaseObserver for ObservedAdapter {
    fn on_phase(&self, phase: Phase) {
        self.inner.apply_phase(phase);
    }
}

struct BroadcastAdapter {
    inner: Arc<CoordinatorInner>,
}

impl WindowPhaseListener for BroadcastAdapter {
    fn on_window_phase(&self, window: WindowId, phase: Phase) {
        let bound = *self.inner.window.read();
        if bound != Some(window) {
            trace!(%window, %phase, "discarding lifecycle event for unrelated window");
            return;
        }
        if phase == Phase::Destroyed {
            // The broadcast outlives any one window; once ours is gone
            // there is nothing left to hear. Taken at most once, so a
            // duplicate Destroyed deregisters nothing further.
            drop(self.inner.take_broadcast_subscription());
        }
        self.inner.apply_phase(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use method_channel::{MethodCall, MethodReply, Messenger};

    struct NullHandler;

    #[async_trait]
    impl MethodHandler for NullHandler {
        async fn handle(&self, _call: MethodCall) -> MethodReply {
            MethodReply::NotImplemented
        }
    }

    fn coordinator() -> (LifecycleCoordinator, Arc<Messenger>) {
        let messenger = Arc::new(Messenger::new());
        let channel = MethodChannel::new(Arc::clone(&messenger), "test/utils");
        (
            LifecycleCoordinator::new(channel, Arc::new(NullHandler)),
            messenger,
        )
    }

    #[test]
    fn test_observed_events_drive_phase() {
        let (coordinator, _messenger) = coordinator();
        let source = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&source).unwrap();
        assert_eq!(coordinator.window(), Some(source.window()));

        for phase in [Phase::Created, Phase::Started, Phase::Resumed, Phase::Paused] {
            source.emit(phase);
            assert_eq!(coordinator.phase(), phase);
        }
    }

    #[test]
    fn test_broadcast_last_write_wins_across_windows() {
        let (coordinator, _messenger) = coordinator();
        let broadcast = Arc::new(ActivityBroadcast::new());
        let ours = WindowId::new();
        let other = WindowId::new();
        coordinator.bind_broadcast(ours, &broadcast).unwrap();

        broadcast.announce(ours, Phase::Created);
        broadcast.announce(other, Phase::Resumed);
        broadcast.announce(ours, Phase::Started);
        broadcast.announce(other, Phase::Destroyed);

        assert_eq!(coordinator.phase(), Phase::Started);
    }

    #[test]
    fn test_unrelated_window_events_discarded() {
        let (coordinator, _messenger) = coordinator();
        let broadcast = Arc::new(ActivityBroadcast::new());
        let ours = WindowId::new();
        coordinator.bind_broadcast(ours, &broadcast).unwrap();
        broadcast.announce(ours, Phase::Resumed);

        let before = coordinator.phase();
        broadcast.announce(WindowId::new(), Phase::Destroyed);
        assert_eq!(coordinator.phase(), before);
        // The unrelated Destroyed must not deregister us either.
        assert_eq!(broadcast.listener_count(), 1);
    }

    #[test]
    fn test_handler_gating_is_pure_function_of_last_events() {
        let (coordinator, messenger) = coordinator();
        let source = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&source).unwrap();
        // Bound eagerly at bind time.
        assert!(messenger.has_handler("test/utils"));

        source.emit(Phase::Resumed);
        source.emit(Phase::Paused);
        assert!(!messenger.has_handler("test/utils"));

        source.emit(Phase::Paused);
        source.emit(Phase::Resumed);
        assert!(messenger.has_handler("test/utils"));

        // No other phase touches the binding.
        source.emit(Phase::Stopped);
        assert!(messenger.has_handler("test/utils"));
        source.emit(Phase::Paused);
        source.emit(Phase::Started);
        assert!(!messenger.has_handler("test/utils"));
    }

    #[test]
    fn test_destroyed_deregisters_exactly_once() {
        let (coordinator, _messenger) = coordinator();
        let broadcast = Arc::new(ActivityBroadcast::new());
        let ours = WindowId::new();
        coordinator.bind_broadcast(ours, &broadcast).unwrap();
        assert_eq!(broadcast.listener_count(), 1);

        broadcast.announce(ours, Phase::Destroyed);
        assert_eq!(coordinator.phase(), Phase::Destroyed);
        assert_eq!(broadcast.listener_count(), 0);

        // Duplicate delivery deregisters nothing further and, with the
        // listener gone, cannot resurrect the phase either.
        broadcast.announce(ours, Phase::Destroyed);
        broadcast.announce(ours, Phase::Resumed);
        assert_eq!(broadcast.listener_count(), 0);
        assert_eq!(coordinator.phase(), Phase::Destroyed);
    }

    #[test]
    fn test_unbind_is_idempotent_and_keeps_phase() {
        let (coordinator, messenger) = coordinator();
        let source = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&source).unwrap();
        source.emit(Phase::Resumed);

        coordinator.unbind();
        assert!(!coordinator.is_bound());
        assert_eq!(coordinator.window(), None);
        assert!(!messenger.has_handler("test/utils"));
        assert_eq!(coordinator.phase(), Phase::Resumed);
        assert_eq!(source.observer_count(), 0);

        coordinator.unbind();
        assert_eq!(coordinator.phase(), Phase::Resumed);
    }

    #[test]
    fn test_reattach_preserves_phase() {
        let (coordinator, messenger) = coordinator();
        let first = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&first).unwrap();
        first.emit(Phase::Resumed);

        coordinator.unbind();
        assert_eq!(coordinator.phase(), Phase::Resumed);

        let second = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&second).unwrap();
        assert_eq!(coordinator.phase(), Phase::Resumed);
        assert!(messenger.has_handler("test/utils"));
        assert_eq!(coordinator.window(), Some(second.window()));

        second.emit(Phase::Paused);
        assert_eq!(coordinator.phase(), Phase::Paused);
    }

    #[test]
    fn test_second_bind_is_rejected() {
        let (coordinator, _messenger) = coordinator();
        let source = Arc::new(WindowLifecycle::new(WindowId::new()));
        let broadcast = Arc::new(ActivityBroadcast::new());
        coordinator.bind_observed(&source).unwrap();

        let err = coordinator.bind_observed(&source).unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyBound));
        let err = coordinator
            .bind_broadcast(WindowId::new(), &broadcast)
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyBound));
        // The failed binds must not have registered anything.
        assert_eq!(source.observer_count(), 1);
        assert_eq!(broadcast.listener_count(), 0);
    }

    #[test]
    fn test_phase_handle_tracks_coordinator() {
        let (coordinator, _messenger) = coordinator();
        let handle = coordinator.phase_handle();
        assert_eq!(handle.get(), Phase::Uninitialized);

        let source = Arc::new(WindowLifecycle::new(WindowId::new()));
        coordinator.bind_observed(&source).unwrap();
        source.emit(Phase::Created);
        assert_eq!(handle.get(), Phase::Created);
    }
}
