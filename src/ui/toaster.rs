use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::store::atom::Atom;

const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

/// A transient notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub kind: ToastKind,
    #[serde(skip)]
    pub created_at: Instant,
}

#[derive(Clone)]
pub struct Toaster {
    toasts: Atom<Vec<Toast>>,
    ttl: Duration,
    next_id: Arc<AtomicU64>,
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Toaster {
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: Atom::new(Vec::new()),
            ttl,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn create(&self, title: impl Into<String>, kind: ToastKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            title: title.into(),
            kind,
            created_at: Instant::now(),
        };
        tracing::debug!(id, kind = ?toast.kind, title = %toast.title, "toast");
        self.toasts.update(|toasts| toasts.push(toast));
        id
    }

    pub fn error(&self, title: impl Into<String>) -> u64 {
        self.create(title, ToastKind::Error)
    }

    /// Notifications still within their time to live
    pub fn active(&self) -> Vec<Toast> {
        let ttl = self.ttl;
        self.toasts.try_update(|toasts| {
            let before = toasts.len();
            toasts.retain(|toast| toast.created_at.elapsed() < ttl);
            toasts.len() != before
        });
        self.toasts.get()
    }

    pub fn dismiss(&self, id: u64) {
        self.toasts.try_update(|toasts| {
            let before = toasts.len();
            toasts.retain(|toast| toast.id != id);
            toasts.len() != before
        });
    }

    /// Take every active notification, leaving none behind
    pub fn drain(&self) -> Vec<Toast> {
        let active = self.active();
        if !active.is_empty() {
            self.toasts.set(Vec::new());
        }
        active
    }
}
