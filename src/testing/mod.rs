use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::api::request::{ApiRequest, ApiResponse};
use crate::api::transport::Transport;
use crate::error::ClientError;
use crate::types::{Category, Product, Review, User};

/// In-memory transport with canned responses per (method, path)
///
/// Responses queue up per route; the last one keeps being served once the
/// queue is drained. Every request is recorded after middleware ran.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Vec<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry((method, path.to_string()))
            .or_default()
            .push(ApiResponse::json(status, &body));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    pub fn last_request(&self, path: &str) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.path == path)
            .cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _base_url: &Url, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let key = (request.method.clone(), request.path.clone());
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
            Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
            _ => Err(ClientError::transport(format!(
                "connection refused: {} {}",
                request.method, request.path
            ))),
        }
    }
}

pub fn sample_user(full_name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: "ada@example.com".to_string(),
        is_active: true,
        is_superuser: false,
        full_name: Some(full_name.to_string()),
        created_at: 1_700_000_000,
        updated_at: None,
    }
}

pub fn sample_product(name: &str, price: Decimal) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        currency: "USD".to_string(),
        price,
        available_quantity: Some(10),
        images: vec![],
        categories: vec![Category {
            id: None,
            name: "coffee".to_string(),
            description: None,
            color: Some("orange".to_string()),
        }],
        created_at: 1_700_000_000,
        updated_at: None,
    }
}

pub fn sample_review(product_id: Uuid, rating: f64) -> Review {
    Review {
        id: Uuid::new_v4(),
        product_id,
        customer_id: None,
        rating,
        content: None,
        created_at: 1_700_000_000,
        updated_at: None,
    }
}

pub fn reviews_body(reviews: &[Review]) -> Value {
    json!({ "data": reviews, "count": reviews.len() })
}

pub fn products_body(products: &[Product]) -> Value {
    json!({ "data": products, "count": products.len() })
}
