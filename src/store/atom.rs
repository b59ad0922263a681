use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Shared reactive cell; clones observe the same value
pub struct Atom<T> {
    inner: Arc<AtomInner<T>>,
}

struct AtomInner<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Atom<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> Atom<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(AtomInner {
                value: RwLock::new(value),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    pub fn set(&self, value: T) {
        let snapshot = {
            let mut current = self.inner.value.write().unwrap_or_else(PoisonError::into_inner);
            *current = value;
            current.clone()
        };
        self.notify(&snapshot);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.try_update(|value| {
            f(value);
            true
        });
    }

    /// Mutate in place; listeners only hear about it when `f` returns true
    pub fn try_update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let snapshot = {
            let mut current = self.inner.value.write().unwrap_or_else(PoisonError::into_inner);
            if !f(&mut *current) {
                return false;
            }
            current.clone()
        };
        self.notify(&snapshot);
        true
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener<T>)>> {
        self.inner.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, value: &T) {
        // Listeners may touch this atom again, so call them outside the lock
        let listeners: Vec<Listener<T>> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }
}
