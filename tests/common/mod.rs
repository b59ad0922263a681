//! Stub Coffeeshop API served by axum on a free local port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use coffeeshop_storefront::api::HttpTransport;
use coffeeshop_storefront::app::App;
use coffeeshop_storefront::config::AppConfig;
use coffeeshop_storefront::storage::{MemoryStorage, Storage};
use coffeeshop_storefront::types::TokenClaims;

pub const USERNAME: &str = "alice@example.com";
pub const PASSWORD: &str = "correct-horse";
pub const FULL_NAME: &str = "Alice Barista";

pub struct Catalog {
    pub products: Vec<Value>,
    pub reviews: Vec<Value>,
}

impl Catalog {
    /// Espresso with ratings 5 and 4, Latte with rating 3, Matcha without reviews
    pub fn sample() -> Self {
        let espresso = Uuid::new_v4();
        let latte = Uuid::new_v4();
        let matcha = Uuid::new_v4();
        Self {
            products: vec![
                product(espresso, "Espresso", "3.50", &["https://img.test/espresso.png"], "orange"),
                product(latte, "Latte", "4.25", &[], "blue"),
                product(matcha, "Matcha", "5.00", &[], "green"),
            ],
            reviews: vec![review(espresso, 5.0), review(espresso, 4.0), review(latte, 3.0)],
        }
    }
}

fn product(id: Uuid, name: &str, price: &str, images: &[&str], color: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "currency": "USD",
        "price": price,
        "available_quantity": 12,
        "images": images,
        "categories": [{"id": Uuid::new_v4(), "name": "drinks", "description": null, "color": color}],
        "created_at": 1_700_000_000,
        "updated_at": null
    })
}

fn review(product_id: Uuid, rating: f64) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "product_id": product_id,
        "customer_id": Uuid::new_v4(),
        "rating": rating,
        "content": "good",
        "created_at": 1_700_000_000,
        "updated_at": null
    })
}

struct StubState {
    token: String,
    user_id: Uuid,
    catalog: Catalog,
    authorization: Mutex<Vec<(String, Option<String>)>>,
}

impl StubState {
    fn record(&self, path: &str, headers: &HeaderMap) -> Option<String> {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.authorization
            .lock()
            .unwrap()
            .push((path.to_string(), auth.clone()));
        auth
    }
}

fn detail(status: StatusCode, detail: Value) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!(true))
}

async fn login(State(state): State<Arc<StubState>>, Form(form): Form<HashMap<String, String>>) -> Response {
    let username = form.get("username").cloned().unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();

    let mut issues = Vec::new();
    if username.is_empty() {
        issues.push(json!({"loc": ["body", "username"], "msg": "Field required", "type": "missing"}));
    }
    if password.len() < 8 {
        issues.push(json!({
            "loc": ["body", "password"],
            "msg": "String should have at least 8 characters",
            "type": "string_too_short"
        }));
    }
    if !issues.is_empty() {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, Value::Array(issues));
    }

    if username != USERNAME || password != PASSWORD {
        return detail(StatusCode::BAD_REQUEST, json!("Incorrect email or password"));
    }

    Json(json!({ "access_token": state.token, "token_type": "bearer" })).into_response()
}

async fn users_me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    let auth = state.record("/api/v1/users/me", &headers);
    if auth.as_deref() != Some(format!("Bearer {}", state.token).as_str()) {
        return detail(StatusCode::FORBIDDEN, json!("Could not validate credentials"));
    }

    Json(json!({
        "id": state.user_id,
        "email": USERNAME,
        "is_active": true,
        "is_superuser": false,
        "full_name": FULL_NAME,
        "created_at": 1_700_000_000,
        "updated_at": null
    }))
    .into_response()
}

async fn products(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.record("/api/v1/products/", &headers);
    let data = &state.catalog.products;
    Json(json!({ "data": data, "count": data.len() })).into_response()
}

async fn reviews(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record("/api/v1/reviews/", &headers);
    if params.contains_key("product") && params.contains_key("user") {
        return detail(StatusCode::BAD_REQUEST, json!("Cannot specify both user and product"));
    }

    let data: Vec<&Value> = state
        .catalog
        .reviews
        .iter()
        .filter(|review| match params.get("product") {
            Some(product) => review["product_id"].as_str() == Some(product.as_str()),
            None => true,
        })
        .collect();
    Json(json!({ "data": data, "count": data.len() })).into_response()
}

pub fn mint_token(user_id: Uuid) -> String {
    let claims = TokenClaims {
        exp: chrono::Utc::now().timestamp() + 3600,
        sub: Some(user_id.to_string()),
        scopes: vec![],
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"stub-secret")).unwrap()
}

pub struct StubApi {
    pub port: u16,
    pub base_url: String,
    pub token: String,
    state: Arc<StubState>,
}

impl StubApi {
    pub async fn start() -> Result<Self> {
        Self::with_catalog(Catalog::sample()).await
    }

    pub async fn with_catalog(catalog: Catalog) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let user_id = Uuid::new_v4();
        let state = Arc::new(StubState {
            token: mint_token(user_id),
            user_id,
            catalog,
            authorization: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/api/v1/utils/health-check/", get(health))
            .route("/api/v1/login/access-token", post(login))
            .route("/api/v1/users/me", get(users_me))
            .route("/api/v1/products/", get(products))
            .route("/api/v1/reviews/", get(reviews))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind stub API")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let stub = Self {
            port,
            base_url,
            token: state.token.clone(),
            state,
        };
        stub.wait_ready(Duration::from_secs(5)).await?;
        Ok(stub)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            let url = format!("{}/api/v1/utils/health-check/", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("stub API did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn config(&self) -> AppConfig {
        AppConfig::with_base_url(&self.base_url)
    }

    pub fn app(&self, storage: Arc<dyn Storage>) -> Result<App> {
        Ok(App::new(self.config(), storage, Arc::new(HttpTransport::new()))?)
    }

    pub fn guest_app(&self) -> Result<(Arc<MemoryStorage>, App)> {
        let storage = MemoryStorage::shared();
        let app = self.app(storage.clone())?;
        Ok((storage, app))
    }

    /// Authorization headers seen for `path`, in order
    pub fn authorization_for(&self, path: &str) -> Vec<Option<String>> {
        self.state
            .authorization
            .lock()
            .unwrap()
            .iter()
            .filter(|(seen, _)| seen == path)
            .map(|(_, auth)| auth.clone())
            .collect()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.authorization_for(path).len()
    }
}
