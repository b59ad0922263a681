//! Application shell: wires storage, client, session and UI components
//! together and renders the page for the current location.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::client::ApiClient;
use crate::api::transport::{HttpTransport, Transport};
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::storage::{FileStorage, Storage};
use crate::store::cache::QueryClient;
use crate::store::session::{access_token_atom, Session};
use crate::types::LoginRequest;
use crate::ui::layout::{header_for, HeaderView, MenuItem};
use crate::ui::login::{redirect_if_authenticated, LoginContext, LoginForm, LoginPhase, LoginView};
use crate::ui::router::{Navigator, Route, LOGIN_PATH};
use crate::ui::storefront::{Storefront, StorefrontView};
use crate::ui::toaster::{Toast, Toaster};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageBody {
    Storefront(StorefrontView),
    Login(LoginView),
    NotFound { path: String },
}

/// Everything visible for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub pathname: String,
    pub route: Route,
    pub dark_mode: bool,
    pub header: Option<HeaderView>,
    pub body: PageBody,
    pub notifications: Vec<Toast>,
}

pub struct App {
    config: AppConfig,
    client: ApiClient,
    queries: QueryClient,
    session: Session,
    navigator: Navigator,
    toaster: Toaster,
    login: Mutex<LoginForm>,
    storefront: Mutex<Option<Storefront>>,
}

impl App {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let access_token = access_token_atom(storage.clone());
        let client = ApiClient::from_config(&config, transport, Arc::new(access_token.clone()))?;
        let queries = QueryClient::new(config.query.stale_time());
        let session = Session::new(storage, access_token, &client, &queries);

        tracing::debug!(base_url = %client.base_url(), "app initialized");
        Ok(Self {
            config,
            client,
            queries,
            session,
            navigator: Navigator::default(),
            toaster: Toaster::default(),
            login: Mutex::new(LoginForm::new()),
            storefront: Mutex::new(None),
        })
    }

    /// File-backed storage and the HTTP transport
    pub fn from_config(config: AppConfig) -> Result<Self, ClientError> {
        let storage = FileStorage::from_config(&config)?;
        tracing::debug!(path = %storage.path().display(), "using storage file");
        Self::new(config, Arc::new(storage), Arc::new(HttpTransport::new()))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn toaster(&self) -> &Toaster {
        &self.toaster
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        self.client.health_check().await
    }

    pub async fn visit(&self, path: &str) -> Page {
        self.navigator.navigate(path);
        self.render().await
    }

    pub async fn render(&self) -> Page {
        let user = self.session.load_current_user().await;
        if self.navigator.route() == Route::Login {
            redirect_if_authenticated(&user, &self.navigator);
        }

        let pathname = self.navigator.pathname();
        let route = Route::resolve(&pathname);
        let shown_user = self.session.display_user(&user);
        let header = header_for(&pathname, shown_user.as_ref());

        let body = match route {
            Route::Storefront => {
                let mut slot = self.storefront.lock().await;
                let storefront = slot
                    .get_or_insert_with(|| Storefront::mount(&self.client, &self.queries, &self.session));
                PageBody::Storefront(storefront.render().await)
            }
            Route::Login => {
                self.unmount_storefront().await;
                PageBody::Login(self.login.lock().await.view())
            }
            Route::NotFound => {
                self.unmount_storefront().await;
                PageBody::NotFound {
                    path: pathname.clone(),
                }
            }
        };

        Page {
            pathname,
            route,
            dark_mode: self.session.dark_mode.get(),
            header,
            body,
            notifications: self.toaster.active(),
        }
    }

    /// Fill in and submit the login form
    pub async fn submit_login(&self, credentials: LoginRequest) -> LoginPhase {
        let mut form = self.login.lock().await;
        form.set_username(credentials.username);
        form.set_password(credentials.password);
        form.set_scope(credentials.scope);

        let ctx = LoginContext {
            client: &self.client,
            session: &self.session,
            navigator: &self.navigator,
            toaster: &self.toaster,
        };
        form.submit(&ctx).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await?;
        Ok(())
    }

    pub async fn select_menu_item(&self, item: MenuItem) -> Result<(), ClientError> {
        match item {
            MenuItem::Logout => self.logout().await,
            MenuItem::Settings => {
                tracing::debug!("settings selected");
                Ok(())
            }
        }
    }

    pub fn click_guest_avatar(&self) {
        self.navigator.navigate(LOGIN_PATH);
    }

    async fn unmount_storefront(&self) {
        if self.storefront.lock().await.take().is_some() {
            tracing::debug!("unmounted storefront");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{LOGIN_ACCESS_TOKEN_PATH, PRODUCTS_PATH, REVIEWS_PATH, USERS_ME_PATH};
    use crate::storage::{MemoryStorage, ACCESS_TOKEN_KEY, CURRENT_USER_KEY};
    use crate::testing::{products_body, reviews_body, sample_product, sample_user, ScriptedTransport};
    use crate::ui::layout::Avatar;
    use crate::ui::router::HOME_PATH;
    use reqwest::Method;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn app(token: Option<&str>) -> (Arc<ScriptedTransport>, Arc<MemoryStorage>, App) {
        let storage = MemoryStorage::shared();
        if let Some(token) = token {
            storage.set_item(ACCESS_TOKEN_KEY, json!(token)).unwrap();
        }
        let transport = ScriptedTransport::shared();
        let app = App::new(
            AppConfig::with_base_url("http://api.test"),
            storage.clone(),
            transport.clone(),
        )
        .unwrap();
        (transport, storage, app)
    }

    #[tokio::test]
    async fn test_guest_storefront() {
        let (transport, _, app) = app(None);
        let product = sample_product("Espresso", Decimal::new(1250, 2));
        transport.respond(Method::GET, PRODUCTS_PATH, 200, products_body(&[product]));
        transport.respond(Method::GET, REVIEWS_PATH, 200, reviews_body(&[]));

        let page = app.visit("/").await;

        assert_eq!(page.route, Route::Storefront);
        assert_eq!(page.header.unwrap().avatar, Avatar::Guest { href: LOGIN_PATH });
        assert!(matches!(page.body, PageBody::Storefront(_)));
        assert!(!page.dark_mode);
    }

    #[tokio::test]
    async fn test_login_page_has_no_header() {
        let (_, _, app) = app(None);
        let page = app.visit("/login").await;

        assert_eq!(page.route, Route::Login);
        assert!(page.header.is_none());
        assert!(matches!(page.body, PageBody::Login(_)));
    }

    #[tokio::test]
    async fn test_authenticated_visitor_redirected_from_login() {
        let (transport, _, app) = app(Some("abc"));
        transport.respond(Method::GET, USERS_ME_PATH, 200, json!(sample_user("Ada Lovelace")));

        let page = app.visit("/login").await;

        assert_eq!(page.pathname, HOME_PATH);
        assert_eq!(page.route, Route::Storefront);
        match page.header.unwrap().avatar {
            Avatar::User { name, .. } => assert_eq!(name, "Ada Lovelace"),
            other => panic!("expected user avatar, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let (transport, storage, app) = app(None);
        transport.respond(
            Method::POST,
            LOGIN_ACCESS_TOKEN_PATH,
            200,
            json!({"access_token": "jwt-123", "token_type": "bearer"}),
        );
        transport.respond(Method::GET, USERS_ME_PATH, 200, json!(sample_user("Ada Lovelace")));

        app.click_guest_avatar();
        let phase = app
            .submit_login(LoginRequest::new("alice@example.com", "correct-horse"))
            .await;
        assert_eq!(phase, LoginPhase::Succeeded);

        let page = app.render().await;
        assert_eq!(page.pathname, HOME_PATH);
        assert!(matches!(page.header.unwrap().avatar, Avatar::User { .. }));

        app.select_menu_item(MenuItem::Logout).await.unwrap();
        assert!(storage.get_item(ACCESS_TOKEN_KEY).unwrap().is_none());
        let page = app.render().await;
        assert_eq!(page.header.unwrap().avatar, Avatar::Guest { href: LOGIN_PATH });
    }

    #[tokio::test]
    async fn test_header_keeps_cached_user_when_offline() {
        let (transport, storage, app) = app(Some("abc"));
        transport.respond(Method::GET, USERS_ME_PATH, 200, json!(sample_user("Ada Lovelace")));
        app.visit("/cart").await;
        assert!(storage.get_item(CURRENT_USER_KEY).unwrap().is_some());

        // Same storage, but the API can no longer be reached
        let offline = App::new(
            AppConfig::with_base_url("http://api.test"),
            storage.clone(),
            ScriptedTransport::shared(),
        )
        .unwrap();
        let page = offline.visit("/cart").await;

        match page.header.unwrap().avatar {
            Avatar::User { name, .. } => assert_eq!(name, "Ada Lovelace"),
            other => panic!("expected user avatar, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (_, _, app) = app(None);
        let page = app.visit("/cart").await;

        assert_eq!(page.body, PageBody::NotFound { path: "/cart".to_string() });
        assert!(page.header.is_some());
    }
}
