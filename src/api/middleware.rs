// Request middleware pipeline
// Every outgoing request runs through the registered middleware in priority order

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::api::request::{ApiRequest, ApiResponse};
use crate::error::ClientError;

/// Supplies the access token for outgoing requests
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// A request-transform step applied before transmission
pub trait Middleware: Send + Sync {
    /// Middleware name for logging and debugging
    fn name(&self) -> &'static str;

    /// Lower numbers run first
    fn priority(&self) -> u8 {
        50
    }

    fn on_request(&self, request: &mut ApiRequest) -> Result<(), ClientError>;

    fn on_response(&self, _request: &ApiRequest, _response: &ApiResponse) {}
}

pub type MiddlewareBox = Arc<dyn Middleware>;

/// Ordered list of middleware
#[derive(Clone, Default)]
pub struct MiddlewarePipeline {
    middleware: Vec<MiddlewareBox>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware; ties keep registration order
    pub fn register(&mut self, middleware: MiddlewareBox) {
        let name = middleware.name();
        let priority = middleware.priority();
        let position = self
            .middleware
            .iter()
            .position(|existing| existing.priority() > priority)
            .unwrap_or(self.middleware.len());
        self.middleware.insert(position, middleware);

        tracing::debug!("Registered middleware '{}' with priority {}", name, priority);
    }

    pub fn with(mut self, middleware: MiddlewareBox) -> Self {
        self.register(middleware);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub fn apply(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        for middleware in &self.middleware {
            middleware.on_request(request).map_err(|e| {
                tracing::warn!("Middleware '{}' rejected {} {}: {}", middleware.name(), request.method, request.path, e);
                e
            })?;
        }
        Ok(())
    }

    pub fn observe(&self, request: &ApiRequest, response: &ApiResponse) {
        for middleware in &self.middleware {
            middleware.on_response(request, response);
        }
    }
}

/// Attaches `Authorization: Bearer <token>` when a token is stored
pub struct AuthMiddleware {
    tokens: Arc<dyn TokenSource>,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self { tokens }
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn priority(&self) -> u8 {
        10
    }

    fn on_request(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        match self.tokens.access_token() {
            Some(token) if !token.is_empty() => {
                request.set_header(AUTHORIZATION, &format!("Bearer {}", token))
            }
            _ => Ok(()),
        }
    }
}

pub struct AcceptJson;

impl Middleware for AcceptJson {
    fn name(&self) -> &'static str {
        "accept_json"
    }

    fn priority(&self) -> u8 {
        20
    }

    fn on_request(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        if !request.headers.contains_key(ACCEPT) {
            request.set_header(ACCEPT, "application/json")?;
        }
        Ok(())
    }
}

/// Emits a tracing event per request and per response
pub struct RequestLogging;

impl Middleware for RequestLogging {
    fn name(&self) -> &'static str {
        "request_logging"
    }

    fn priority(&self) -> u8 {
        90
    }

    fn on_request(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated = request.headers.contains_key(AUTHORIZATION),
            "API request"
        );
        Ok(())
    }

    fn on_response(&self, request: &ApiRequest, response: &ApiResponse) {
        if response.is_success() {
            tracing::debug!(method = %request.method, path = %request.path, status = response.status, "API response");
        } else {
            tracing::warn!(method = %request.method, path = %request.path, status = response.status, "API error response");
        }
    }
}
