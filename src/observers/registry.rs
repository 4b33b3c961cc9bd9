//! Observer registry for broadcasting auth-state changes.

use super::types::{AuthEvent, IdentityStream, ObserverHandle, ObserverId};
use crate::types::Identity;
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Observer callback. Receives the new identity, or `None` when signed out.
pub type Callback = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

/// Shared registry state. Handles keep a weak reference to it.
pub(super) struct Registry {
    /// Observers ordered by id, i.e. by registration order.
    observers: RwLock<BTreeMap<ObserverId, Callback>>,
    /// Counter for generating observer ids.
    next_id: AtomicU64,
}

impl Registry {
    pub(super) fn remove(&self, id: ObserverId) -> bool {
        self.observers.write().remove(&id).is_some()
    }

    pub(super) fn contains(&self, id: ObserverId) -> bool {
        self.observers.read().contains_key(&id)
    }
}

/// Registry of auth-state observers.
pub struct ObserverRegistry {
    inner: Arc<Registry>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                observers: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn next_id(&self) -> ObserverId {
        ObserverId(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn handle(&self, id: ObserverId) -> ObserverHandle {
        ObserverHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Register a callback and immediately replay `current` to it.
    pub fn subscribe<F>(&self, current: Option<&Identity>, callback: F) -> ObserverHandle
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.register(id, Arc::new(callback), current)
    }

    /// Register a bounded channel observer.
    ///
    /// The replay of `current` is the first event on the channel. If the
    /// buffer is full or the receiver is gone when an event is delivered,
    /// the observer is removed.
    pub fn subscribe_channel(&self, current: Option<&Identity>, buffer_size: usize) -> IdentityStream {
        let id = self.next_id();
        let (sender, receiver) = bounded(buffer_size.max(1));
        let registry: Weak<Registry> = Arc::downgrade(&self.inner);

        let callback: Callback = Arc::new(move |identity: Option<&Identity>| {
            match sender.try_send(AuthEvent::from_identity(identity)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!(observer = id.0, "Dropping slow or closed channel observer");
                    if let Some(registry) = registry.upgrade() {
                        registry.remove(id);
                    }
                }
            }
        });

        let handle = self.register(id, callback, current);
        IdentityStream { handle, receiver }
    }

    fn register(&self, id: ObserverId, callback: Callback, current: Option<&Identity>) -> ObserverHandle {
        self.inner.observers.write().insert(id, Arc::clone(&callback));
        invoke(id, &callback, current);
        self.handle(id)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.inner.remove(id)
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }

    /// Deliver `identity` to every registered observer in registration order.
    ///
    /// Runs against a snapshot taken before the first callback, with no lock
    /// held while callbacks run. An observer removed during the pass is not
    /// called afterwards; one added during the pass only sees its replay.
    pub fn notify_all(&self, identity: Option<&Identity>) {
        let snapshot: Vec<(ObserverId, Callback)> = self
            .inner
            .observers
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in snapshot {
            if !self.inner.contains(id) {
                continue;
            }
            invoke(id, &callback, identity);
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one callback, containing any panic to this observer.
fn invoke(id: ObserverId, callback: &Callback, identity: Option<&Identity>) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(identity))) {
        tracing::error!(
            observer = id.0,
            message = %panic_message(panic.as_ref()),
            "Observer panicked during notification"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectId;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn identity(id: &str) -> Identity {
        Identity::new(SubjectId::new(id), format!("{}@x.com", id))
    }

    /// Callback that appends "<tag>:<subject or ->" to a shared log.
    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl Fn(Option<&Identity>) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |identity: Option<&Identity>| {
            let subject = identity.map(|i| i.subject_id.to_string()).unwrap_or_else(|| "-".into());
            log.lock().push(format!("{}:{}", tag, subject));
        }
    }

    #[test]
    fn test_subscribe_replays_current() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let current = identity("u1");
        registry.subscribe(Some(&current), recorder(&log, "a"));
        registry.subscribe(None, recorder(&log, "b"));

        assert_eq!(*log.lock(), vec!["a:u1", "b:-"]);
        assert_eq!(registry.observer_count(), 2);
    }

    #[test]
    fn test_notify_in_registration_order() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            registry.subscribe(None, recorder(&log, tag));
        }
        log.lock().clear();

        registry.notify_all(Some(&identity("u1")));
        registry.notify_all(None);

        assert_eq!(
            *log.lock(),
            vec!["a:u1", "b:u1", "c:u1", "a:-", "b:-", "c:-"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handle = registry.subscribe(None, recorder(&log, "a"));
        assert!(handle.is_active());
        handle.unsubscribe();
        handle.unsubscribe();
        assert!(!handle.is_active());

        registry.notify_all(Some(&identity("u1")));
        assert_eq!(*log.lock(), vec!["a:-"]);
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn test_self_unsubscribe_during_notify() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let own_handle: Arc<Mutex<Option<ObserverHandle>>> = Arc::new(Mutex::new(None));

        registry.subscribe(None, recorder(&log, "a"));
        let slot = Arc::clone(&own_handle);
        let inner_log = Arc::clone(&log);
        let handle = registry.subscribe(None, move |identity: Option<&Identity>| {
            if identity.is_some() {
                inner_log.lock().push("b:once".to_string());
                if let Some(handle) = slot.lock().as_ref() {
                    handle.unsubscribe();
                }
            }
        });
        *own_handle.lock() = Some(handle);
        registry.subscribe(None, recorder(&log, "c"));
        log.lock().clear();

        registry.notify_all(Some(&identity("u1")));
        registry.notify_all(Some(&identity("u2")));

        // b ran once, and its removal did not skip c
        assert_eq!(*log.lock(), vec!["a:u1", "b:once", "c:u1", "a:u2", "c:u2"]);
    }

    #[test]
    fn test_removed_mid_pass_is_not_called() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<ObserverHandle>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim);
        registry.subscribe(None, move |_| {
            if let Some(handle) = slot.lock().as_ref() {
                handle.unsubscribe();
            }
        });
        let handle = registry.subscribe(None, recorder(&log, "b"));
        *victim.lock() = Some(handle);
        log.lock().clear();

        registry.notify_all(Some(&identity("u1")));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(None, recorder(&log, "a"));
        registry.subscribe(None, |identity: Option<&Identity>| {
            if identity.is_some() {
                panic!("observer bug");
            }
        });
        registry.subscribe(None, recorder(&log, "c"));
        log.lock().clear();

        registry.notify_all(Some(&identity("u1")));
        assert_eq!(*log.lock(), vec!["a:u1", "c:u1"]);
        // Still registered
        assert_eq!(registry.observer_count(), 3);
    }

    #[test]
    fn test_channel_observer() {
        let registry = ObserverRegistry::new();
        let stream = registry.subscribe_channel(None, 16);

        let replay = stream.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(replay, AuthEvent::SignedOut);

        let u1 = identity("u1");
        registry.notify_all(Some(&u1));
        let event = stream.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.identity(), Some(&u1));

        stream.unsubscribe();
        registry.notify_all(None);
        assert!(stream.try_recv().is_err());
    }

    #[test]
    fn test_drop_slow_channel_observer() {
        let registry = ObserverRegistry::new();
        let _stream = registry.subscribe_channel(None, 2);

        for i in 0..10 {
            registry.notify_all(Some(&identity(&format!("u{}", i))));
        }

        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn test_handle_outlives_registry() {
        let registry = ObserverRegistry::new();
        let handle = registry.subscribe(None, |_| {});
        drop(registry);

        assert!(!handle.is_active());
        handle.unsubscribe();
    }
}
