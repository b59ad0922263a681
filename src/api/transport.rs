use async_trait::async_trait;
use url::Url;

use crate::api::request::{ApiRequest, ApiResponse, RequestBody};
use crate::error::ClientError;

/// Sends a fully decorated request; the seam between the client and the network
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, base_url: &Url, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// reqwest-backed transport; no retry or timeout beyond reqwest defaults
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, base_url: &Url, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = resolve_url(base_url, &request.path, &request.query)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ApiResponse { status, body })
    }
}

/// Join an absolute API path onto the base URL, keeping any base path prefix
pub fn resolve_url(base_url: &Url, path: &str, query: &[(String, String)]) -> Result<Url, ClientError> {
    let base = base_url.as_str().trim_end_matches('/');
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let mut url = Url::parse(&format!("{}{}", base, path))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_plain_host() {
        let base = Url::parse("http://localhost:8000").unwrap();
        let url = resolve_url(&base, "/api/v1/products/", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/products/");
    }

    #[test]
    fn test_resolve_url_keeps_prefix_and_query() {
        let base = Url::parse("https://shop.example.com/backend/").unwrap();
        let query = vec![("product".to_string(), "abc".to_string())];
        let url = resolve_url(&base, "/api/v1/reviews/", &query).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/backend/api/v1/reviews/?product=abc");
    }
}
