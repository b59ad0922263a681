use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::ClientError;
use crate::store::atom::{Atom, SubscriptionId};

/// Identity of a query in the cache, e.g. `["reviews", "<product id>"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Snapshot of a query cell
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<ClientError>,
    pub is_loading: bool,
    /// When `data` was last replaced by a successful fetch
    pub updated_at: Option<Instant>,
    /// Fetch generation that produced the current data; an equal refetch keeps it
    pub generation: u64,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            updated_at: None,
            generation: 0,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_success(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.data.is_some()
    }
}

pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

/// Lazily fetched, cached reactive cell
pub struct QueryAtom<T> {
    inner: Arc<QueryInner<T>>,
}

struct QueryInner<T> {
    key: QueryKey,
    state: Atom<QueryState<T>>,
    fetcher: Fetcher<T>,
    stale_time: Duration,
    generation: AtomicU64,
    invalidated: AtomicBool,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl<T> Clone for QueryAtom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning handle, used by subscriptions that must not keep a query alive
pub struct WeakQueryAtom<T> {
    inner: Weak<QueryInner<T>>,
}

impl<T> WeakQueryAtom<T> {
    pub fn upgrade(&self) -> Option<QueryAtom<T>> {
        self.inner.upgrade().map(|inner| QueryAtom { inner })
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> QueryAtom<T> {
    pub fn new<F, Fut>(key: QueryKey, stale_time: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetch().boxed());
        Self {
            inner: Arc::new(QueryInner {
                key,
                state: Atom::new(QueryState::default()),
                fetcher,
                stale_time,
                generation: AtomicU64::new(0),
                invalidated: AtomicBool::new(false),
                fetch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.inner.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.inner.state.get()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.with(|state| state.data.clone())
    }

    pub fn downgrade(&self) -> WeakQueryAtom<T> {
        WeakQueryAtom {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Fresh means: fetched successfully, within stale time, not invalidated since
    pub fn is_fresh(&self) -> bool {
        if self.inner.invalidated.load(Ordering::SeqCst) {
            return false;
        }
        let stale_time = self.inner.stale_time;
        self.inner.state.with(|state| {
            state.error.is_none()
                && state.data.is_some()
                && state
                    .updated_at
                    .map(|at| at.elapsed() < stale_time)
                    .unwrap_or(false)
        })
    }

    /// Serve the cached result if fresh, otherwise fetch; concurrent loads share one fetch
    pub async fn load(&self) -> QueryState<T> {
        if self.is_fresh() {
            return self.state();
        }

        let _guard = self.inner.fetch_lock.lock().await;
        if self.is_fresh() {
            return self.state();
        }
        self.fetch_locked().await
    }

    /// Always fetch, keeping previous data visible while loading
    pub async fn refetch(&self) -> QueryState<T> {
        let _guard = self.inner.fetch_lock.lock().await;
        self.fetch_locked().await
    }

    /// Mark stale; the next `load` refetches but current data stays readable
    pub fn invalidate(&self) {
        self.inner.invalidated.store(true, Ordering::SeqCst);
        tracing::debug!(key = %self.inner.key, "query invalidated");
    }

    /// Drop cached data and discard any in-flight result
    pub fn reset(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.invalidated.store(false, Ordering::SeqCst);
        self.inner.state.set(QueryState {
            generation,
            ..QueryState::default()
        });
        tracing::debug!(key = %self.inner.key, generation, "query reset");
    }

    pub fn subscribe(&self, listener: impl Fn(&QueryState<T>) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.state.unsubscribe(id)
    }

    async fn fetch_locked(&self) -> QueryState<T> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.invalidated.store(false, Ordering::SeqCst);
        self.inner.state.update(|state| state.is_loading = true);

        tracing::debug!(key = %self.inner.key, generation, "query fetch started");
        let result = (self.inner.fetcher)().await;

        let current = &self.inner.generation;
        let applied = self.inner.state.try_update(|state| {
            // A reset while we were waiting makes this result stale
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.is_loading = false;
            match result {
                Ok(data) => {
                    if state.data.as_ref() != Some(&data) {
                        state.data = Some(data);
                        state.generation = generation;
                    } else {
                        tracing::trace!(key = %self.inner.key, generation, "query result unchanged");
                    }
                    state.error = None;
                    state.updated_at = Some(Instant::now());
                }
                Err(err) => {
                    tracing::warn!(key = %self.inner.key, "query failed: {}", err);
                    state.error = Some(err);
                }
            }
            true
        });

        if !applied {
            tracing::debug!(key = %self.inner.key, generation, "discarding superseded query result");
        }

        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn counting_query(stale_time: Duration) -> (QueryAtom<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let query = QueryAtom::new(QueryKey::new(["count"]), stale_time, move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });
        (query, calls)
    }

    #[tokio::test]
    async fn test_load_reuses_fresh_result() {
        let (query, calls) = counting_query(Duration::from_secs(60));

        assert_eq!(query.load().await.data, Some(1));
        assert_eq!(query.load().await.data, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_refetches() {
        let (query, calls) = counting_query(Duration::ZERO);

        query.load().await;
        query.load().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_keeps_data_until_next_load() {
        let (query, _) = counting_query(Duration::from_secs(60));
        query.load().await;

        query.invalidate();
        assert_eq!(query.data(), Some(1));
        assert!(!query.is_fresh());

        assert_eq!(query.load().await.data, Some(2));
    }

    #[tokio::test]
    async fn test_refetch_bypasses_cache() {
        let (query, calls) = counting_query(Duration::from_secs(60));
        query.load().await;
        let state = query.refetch().await;

        assert_eq!(state.data, Some(2));
        assert_eq!(state.generation, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_equal_refetch_keeps_generation() {
        let query = QueryAtom::new(QueryKey::new(["menu"]), Duration::ZERO, || async {
            Ok(vec!["espresso".to_string(), "latte".to_string()])
        });

        let first = query.load().await;
        let second = query.load().await;
        let third = query.refetch().await;

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 1);
        assert_eq!(third.generation, 1);
        assert!(third.updated_at >= first.updated_at);
        assert!(third.is_success());
    }

    #[tokio::test]
    async fn test_error_between_equal_results_keeps_generation() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let query = QueryAtom::new(QueryKey::new(["flaky-menu"]), Duration::ZERO, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                    Err(ClientError::transport("connection reset"))
                } else {
                    Ok("menu".to_string())
                }
            }
        });

        assert_eq!(query.load().await.generation, 1);
        let failed = query.load().await;
        assert!(failed.error.is_some());
        assert_eq!(failed.generation, 1);

        let recovered = query.load().await;
        assert!(recovered.is_success());
        assert_eq!(recovered.generation, 1);
    }

    #[tokio::test]
    async fn test_error_is_exposed_and_retried_on_next_load() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let query = QueryAtom::new(QueryKey::new(["flaky"]), Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ClientError::transport("connection reset"))
                } else {
                    Ok("ok".to_string())
                }
            }
        });

        let failed = query.load().await;
        assert!(failed.error.is_some());
        assert!(!failed.is_loading);
        assert!(failed.data.is_none());

        let recovered = query.load().await;
        assert!(recovered.is_success());
        assert_eq!(recovered.data.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_subscribers_see_loading_then_result() {
        let (query, _) = counting_query(Duration::from_secs(60));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        query.subscribe(move |state| sink.lock().unwrap().push((state.is_loading, state.data)));
        query.load().await;

        assert_eq!(*seen.lock().unwrap(), vec![(true, None), (false, Some(1))]);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let (tx, rx) = oneshot::channel::<usize>();
        let rx = Arc::new(Mutex::new(Some(rx)));
        let query = QueryAtom::new(QueryKey::new(["slow"]), Duration::from_secs(60), move || {
            let rx = rx.lock().unwrap().take();
            async move {
                match rx {
                    Some(rx) => rx.await.map_err(|e| ClientError::transport(e.to_string())),
                    None => Ok(0),
                }
            }
        });

        let loader = query.clone();
        let pending = tokio::spawn(async move { loader.load().await });
        tokio::task::yield_now().await;
        while !query.state().is_loading {
            tokio::task::yield_now().await;
        }

        query.reset();
        tx.send(42).unwrap();
        let finished = pending.await.unwrap();

        assert_eq!(finished.data, None);
        assert_eq!(query.data(), None);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let (query, calls) = counting_query(Duration::from_secs(60));

        let (a, b) = tokio::join!(query.load(), query.load());
        assert_eq!(a.data, Some(1));
        assert_eq!(b.data, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_display() {
        let key = QueryKey::new(["reviews", "abc"]);
        assert_eq!(key.to_string(), "[reviews, abc]");
        assert_eq!(key.parts().len(), 2);
    }
}
