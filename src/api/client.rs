use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::api::middleware::{
    AcceptJson, AuthMiddleware, MiddlewarePipeline, RequestLogging, TokenSource,
};
use crate::api::request::{ApiRequest, ApiResponse};
use crate::api::transport::Transport;
use crate::config::AppConfig;
use crate::error::{ApiError, ClientError};
use crate::types::{LoginRequest, Products, Reviews, Token, User};

pub const HEALTH_CHECK_PATH: &str = "/api/v1/utils/health-check/";
pub const USERS_ME_PATH: &str = "/api/v1/users/me";
pub const PRODUCTS_PATH: &str = "/api/v1/products/";
pub const REVIEWS_PATH: &str = "/api/v1/reviews/";
pub const LOGIN_ACCESS_TOKEN_PATH: &str = "/api/v1/login/access-token";

/// Query parameters of the product listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductsQuery {
    pub skip: u32,
    pub limit: u32,
}

impl Default for ProductsQuery {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

/// Query parameters of the review listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewsQuery {
    pub product: Option<Uuid>,
    pub user: Option<Uuid>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for ReviewsQuery {
    fn default() -> Self {
        Self {
            product: None,
            user: None,
            skip: 0,
            limit: 100,
        }
    }
}

impl ReviewsQuery {
    pub fn for_product(product: Uuid) -> Self {
        Self {
            product: Some(product),
            ..Self::default()
        }
    }
}

/// Typed client for the storefront REST API
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    pipeline: MiddlewarePipeline,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        pipeline: MiddlewarePipeline,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                transport,
                pipeline,
            }),
        })
    }

    /// Client with the standard pipeline: auth, accept-json, and request logging when enabled
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ClientError> {
        let mut pipeline = MiddlewarePipeline::new()
            .with(Arc::new(AuthMiddleware::new(tokens)))
            .with(Arc::new(AcceptJson));
        if config.api.enable_request_logging {
            pipeline.register(Arc::new(RequestLogging));
        }

        Self::new(&config.api.base_url, transport, pipeline)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Run the middleware chain and send; non-2xx responses are returned as-is
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.inner.pipeline.apply(&mut request)?;

        let response = self
            .inner
            .transport
            .send(&self.inner.base_url, &request)
            .await?;

        self.inner.pipeline.observe(&request, &response);
        Ok(response)
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let path = request.path.clone();
        let response = self.execute(request).await?;

        if !response.is_success() {
            return Err(ApiError::from_body(response.status, &response.body).into());
        }

        serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(format!("{}: {}", path, e)))
    }

    pub async fn health_check(&self) -> Result<bool, ClientError> {
        self.call(ApiRequest::get(HEALTH_CHECK_PATH)).await
    }

    pub async fn read_user_me(&self) -> Result<User, ClientError> {
        self.call(ApiRequest::get(USERS_ME_PATH)).await
    }

    pub async fn read_products(&self, query: ProductsQuery) -> Result<Products, ClientError> {
        let request = ApiRequest::get(PRODUCTS_PATH)
            .query("skip", query.skip)
            .query("limit", query.limit);
        self.call(request).await
    }

    pub async fn read_reviews(&self, query: ReviewsQuery) -> Result<Reviews, ClientError> {
        if query.product.is_some() && query.user.is_some() {
            return Err(ClientError::invalid_request(
                "Cannot specify both user and product filters",
            ));
        }

        let mut request = ApiRequest::get(REVIEWS_PATH)
            .query("skip", query.skip)
            .query("limit", query.limit);
        if let Some(product) = query.product {
            request = request.query("product", product);
        }
        if let Some(user) = query.user {
            request = request.query("user", user);
        }
        self.call(request).await
    }

    /// Exchange credentials for an access token (form-encoded body)
    pub async fn login_access_token(&self, credentials: &LoginRequest) -> Result<Token, ClientError> {
        let request = ApiRequest::post(LOGIN_ACCESS_TOKEN_PATH).form(vec![
            ("username".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password.clone()),
            ("scope".to_string(), credentials.scope.clone()),
        ]);
        self.call(request).await
    }
}
