//! Subscriber registry: tracks "allowed-state changed" listeners,
//! delivers best-effort, and silently drops failed sinks.
//!
//! Lives entirely on the orchestrator's task — foreign-thread
//! register/unregister calls arrive as messages
//! (`RegisterSubscriber`/`UnregisterSubscriber`) rather than through a
//! shared mutex, keeping fan-out on the same thread as the rest of the
//! state machine.

use indexmap::IndexMap;
use shared::deps::SubId;

/// Opaque handle returned by `register`, used later to `unregister`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(u64);

/// A listener for state-change notifications. Implementors decide what
/// "delivery failure" means for their channel (a closed `mpsc`, a dead
/// FFI callback, ...) and report it via the return value.
pub trait NotifySink: Send {
    /// Returns `false` on delivery failure, causing this subscriber to
    /// be removed.
    fn notify(&self, sub_id: SubId, allowed: bool) -> bool;
}

struct Subscription {
    sub_id: SubId,
    sink: Box<dyn NotifySink>,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    next_handle: u64,
    subscriptions: IndexMap<SubscriberHandle, Subscription>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sub_id: SubId, sink: Box<dyn NotifySink>) -> SubscriberHandle {
        let handle = SubscriberHandle(self.next_handle);
        self.next_handle += 1;
        self.subscriptions.insert(handle, Subscription { sub_id, sink });
        handle
    }

    pub fn unregister(&mut self, handle: SubscriberHandle) {
        self.subscriptions.shift_remove(&handle);
    }

    /// Delivers `allowed` to every subscriber registered for `sub_id`,
    /// in registration order, removing any that fail.
    pub fn notify(&mut self, sub_id: SubId, allowed: bool) {
        let failed: Vec<SubscriberHandle> = self
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.sub_id == sub_id)
            .filter(|(_, sub)| !sub.sink.notify(sub_id, allowed))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in failed {
            tracing::debug!(?handle, "removing subscriber after failed delivery");
            self.subscriptions.shift_remove(&handle);
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
