use std::sync::Arc;

use crate::api::client::{ApiClient, ProductsQuery};
use crate::error::{ClientError, StorageError};
use crate::storage::{Storage, ACCESS_TOKEN_KEY, CURRENT_USER_KEY, DARK_MODE_KEY};
use crate::store::cache::QueryClient;
use crate::store::persisted::{AtomUpdate, PersistedAtom};
use crate::store::query::{QueryAtom, QueryKey, QueryState};
use crate::types::{Products, User};

pub type AccessToken = PersistedAtom<Option<String>>;

/// Load the persisted access-token slot
pub fn access_token_atom(storage: Arc<dyn Storage>) -> AccessToken {
    PersistedAtom::new(ACCESS_TOKEN_KEY, None, storage)
}

/// The session atoms: token, current user, product listing and display preference
#[derive(Clone)]
pub struct Session {
    pub access_token: AccessToken,
    pub dark_mode: PersistedAtom<bool>,
    /// Last user fetched; shown in place of the live one while `/users/me` is unreachable
    pub cached_user: PersistedAtom<Option<User>>,
    pub current_user: QueryAtom<Option<User>>,
    pub products: QueryAtom<Products>,
}

impl Session {
    /// Wire the session atoms; `access_token` must be the same atom the client's auth middleware reads
    pub fn new(
        storage: Arc<dyn Storage>,
        access_token: AccessToken,
        client: &ApiClient,
        queries: &QueryClient,
    ) -> Self {
        let dark_mode = PersistedAtom::new(DARK_MODE_KEY, false, storage.clone());
        let cached_user: PersistedAtom<Option<User>> = PersistedAtom::new(CURRENT_USER_KEY, None, storage);

        let current_user = {
            let client = client.clone();
            let token = access_token.clone();
            let cached_user = cached_user.clone();
            queries.query(QueryKey::new(["users", "me"]), move || {
                let client = client.clone();
                let token = token.clone();
                let cached_user = cached_user.clone();
                async move {
                    // No token, no user: resolve without a request
                    if token.get().is_none() {
                        return Ok(None);
                    }
                    let user = client.read_user_me().await?;
                    if let Err(e) = cached_user.set(Some(user.clone())) {
                        tracing::warn!("Failed to persist current user: {}", e);
                    }
                    Ok(Some(user))
                }
            })
        };

        let products = {
            let client = client.clone();
            queries.query(QueryKey::new(["products"]), move || {
                let client = client.clone();
                async move { client.read_products(ProductsQuery::default()).await }
            })
        };

        // Any token change makes the cached user stale and re-scopes the listing
        let user_handle = current_user.downgrade();
        let products_handle = products.downgrade();
        access_token.subscribe(move |token| {
            tracing::info!(authenticated = token.is_some(), "access token changed");
            if let Some(user) = user_handle.upgrade() {
                user.reset();
            }
            if let Some(products) = products_handle.upgrade() {
                products.invalidate();
            }
        });

        Self {
            access_token,
            dark_mode,
            cached_user,
            current_user,
            products,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.get().is_some()
    }

    /// Store a freshly issued token
    pub fn sign_in(&self, token: impl Into<String>) -> Result<(), StorageError> {
        self.access_token.set(Some(token.into()))
    }

    /// Clear the token and re-resolve the current user so no stale user is shown
    pub async fn logout(&self) -> Result<QueryState<Option<User>>, ClientError> {
        self.access_token.apply(AtomUpdate::Reset)?;
        self.cached_user.reset()?;
        tracing::info!("logged out");
        Ok(self.current_user.refetch().await)
    }

    /// The user to show for a resolved `/users/me` query.
    ///
    /// Falls back to the persisted user when a signed-in session cannot
    /// reach the API. A rejected token shows no user.
    pub fn display_user(&self, state: &QueryState<Option<User>>) -> Option<User> {
        if let Some(user) = state.data.as_ref().and_then(Option::as_ref) {
            return Some(user.clone());
        }
        match &state.error {
            Some(ClientError::Transport(e)) if self.is_authenticated() => {
                tracing::debug!("showing cached user while offline: {}", e);
                self.cached_user.get()
            }
            _ => None,
        }
    }

    pub async fn load_current_user(&self) -> QueryState<Option<User>> {
        self.current_user.load().await
    }

    pub async fn load_products(&self) -> QueryState<Products> {
        self.products.load().await
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<(), StorageError> {
        self.dark_mode.set(enabled)
    }
}
