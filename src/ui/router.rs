use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::store::atom::{Atom, SubscriptionId};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

/// Static route table: index → storefront, `/login` → login form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Storefront,
    Login,
    NotFound,
}

impl Route {
    pub fn resolve(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Storefront,
            LOGIN_PATH => Route::Login,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> Option<&'static str> {
        match self {
            Route::Storefront => Some(HOME_PATH),
            Route::Login => Some(LOGIN_PATH),
            Route::NotFound => None,
        }
    }
}

/// Current location plus the trail of visited paths
#[derive(Clone)]
pub struct Navigator {
    location: Atom<String>,
    history: Arc<Mutex<Vec<String>>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(HOME_PATH)
    }
}

impl Navigator {
    pub fn new(initial: &str) -> Self {
        Self {
            location: Atom::new(initial.to_string()),
            history: Arc::new(Mutex::new(vec![initial.to_string()])),
        }
    }

    pub fn navigate(&self, path: &str) {
        if self.pathname() == path {
            return;
        }
        tracing::debug!(from = %self.pathname(), to = %path, "navigate");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
        self.location.set(path.to_string());
    }

    pub fn pathname(&self) -> String {
        self.location.get()
    }

    pub fn route(&self) -> Route {
        self.location.with(|path| Route::resolve(path))
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> SubscriptionId {
        self.location.subscribe(listener)
    }
}
