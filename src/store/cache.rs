use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ClientError;
use crate::store::query::{QueryAtom, QueryKey};

/// Type-erased view of a cached query
trait CachedQuery: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Clone + PartialEq + Send + Sync + 'static> CachedQuery for QueryAtom<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Process-wide query cache: equal keys resolve to the same `QueryAtom`
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryClientInner>,
}

struct QueryClientInner {
    queries: Mutex<HashMap<QueryKey, Box<dyn CachedQuery>>>,
    stale_time: Duration,
}

impl QueryClient {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            inner: Arc::new(QueryClientInner {
                queries: Mutex::new(HashMap::new()),
                stale_time,
            }),
        }
    }

    /// Get the cached query for `key`, creating it with `fetch` on first use
    pub fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryAtom<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let mut queries = self.queries();
        if let Some(existing) = queries
            .get(&key)
            .and_then(|cached| cached.as_any().downcast_ref::<QueryAtom<T>>())
        {
            return existing.clone();
        }

        if queries.contains_key(&key) {
            tracing::warn!(key = %key, "query key reused with a different data type, replacing");
        }

        let query = QueryAtom::new(key.clone(), self.inner.stale_time, fetch);
        queries.insert(key, Box::new(query.clone()));
        query
    }

    /// Forget a query; holders of the atom keep it, later lookups start cold
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.queries().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.queries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn queries(&self) -> MutexGuard<'_, HashMap<QueryKey, Box<dyn CachedQuery>>> {
        self.inner.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
