use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::{BoxError, ConnectionError};

/// A registered transport-error callback.
pub type ErrorHandler = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<(u64, ErrorHandler)>,
}

/// Ordered collection of error callbacks keyed by registration identity.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl HandlerRegistry {
    pub(crate) fn register(&self, handler: ErrorHandler) -> ErrorSubscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, handler));
        ErrorSubscription {
            registry: Arc::downgrade(&self.inner),
            id,
            released: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    /// Invoke every callback in registration order, stopping at the first
    /// failure.
    ///
    /// The list is snapshotted first and the lock is not held while
    /// callbacks run, so a callback may release subscriptions. Removals take
    /// effect from the next notification.
    pub(crate) fn notify(&self) -> Result<(), ConnectionError> {
        let handlers: Vec<ErrorHandler> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler().map_err(ConnectionError::Handler)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Revocable handle for one registered error callback.
///
/// Releasing it, explicitly or by dropping it, removes exactly that callback
/// from its connection. Releasing after the connection is gone is a no-op.
#[must_use = "dropping the subscription unregisters the error handler"]
pub struct ErrorSubscription {
    registry: Weak<Mutex<RegistryInner>>,
    id: u64,
    released: bool,
}

impl ErrorSubscription {
    /// Unregister the callback now.
    pub fn release(mut self) {
        self.revoke();
    }

    /// Whether the callback is still registered with a live connection.
    pub fn is_active(&self) -> bool {
        if self.released {
            return false;
        }
        match self.registry.upgrade() {
            Some(inner) => lock(&inner).entries.iter().any(|(id, _)| *id == self.id),
            None => false,
        }
    }

    fn revoke(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for ErrorSubscription {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for ErrorSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSubscription")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting(counter: &Arc<AtomicUsize>) -> ErrorHandler {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        })
    }

    #[test]
    fn release_removes_only_its_entry() {
        let registry = HandlerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let a = registry.register(counting(&hits));
        let b = registry.register(counting(&hits));
        assert_eq!(registry.len(), 2);

        b.release();
        assert_eq!(registry.len(), 1);
        assert!(a.is_active());

        registry.notify().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_closure_registered_twice_is_two_entries() {
        let registry = HandlerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = counting(&hits);
        let first = registry.register(Arc::clone(&handler));
        let _second = registry.register(handler);

        drop(first);
        registry.notify().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_after_registry_dropped_is_noop() {
        let registry = HandlerRegistry::default();
        let sub = registry.register(Arc::new(|| Ok::<(), BoxError>(())));
        drop(registry);

        assert!(!sub.is_active());
        sub.release();
    }

    #[test]
    fn callback_may_release_during_notify() {
        let registry = HandlerRegistry::default();
        let slot: Arc<Mutex<Option<ErrorSubscription>>> = Arc::new(Mutex::new(None));
        let slot_in_handler = Arc::clone(&slot);
        let sub = registry.register(Arc::new(move || {
            drop(slot_in_handler.lock().unwrap().take());
            Ok::<(), BoxError>(())
        }));
        *slot.lock().unwrap() = Some(sub);

        registry.notify().unwrap();
        assert_eq!(registry.len(), 0);
    }
}
