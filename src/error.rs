// Client error types
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One entry of a 422 validation payload: `{"loc": [...], "msg": "...", "type": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// The `detail` member of an API error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationIssue>),
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

/// Non-2xx response from the API with its parsed error payload
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub detail: ErrorDetail,
}

impl ApiError {
    pub fn new(status: u16, detail: ErrorDetail) -> Self {
        Self { status, detail }
    }

    /// Parse a response body into an error; bodies without `detail` keep the raw text
    pub fn from_body(status: u16, body: &str) -> Self {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.detail,
            Err(_) if body.trim().is_empty() => ErrorDetail::Message(default_reason(status).to_string()),
            Err(_) => ErrorDetail::Other(Value::String(body.to_string())),
        };
        Self { status, detail }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.detail, ErrorDetail::Validation(_))
    }

    /// Every user-facing message carried by the payload, one per validation issue
    pub fn messages(&self) -> Vec<String> {
        match &self.detail {
            ErrorDetail::Message(msg) => vec![msg.clone()],
            ErrorDetail::Validation(issues) => issues.iter().map(|issue| issue.msg.clone()).collect(),
            ErrorDetail::Other(Value::String(text)) => vec![text.clone()],
            ErrorDetail::Other(_) => vec![default_reason(self.status).to_string()],
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self.status {
            400 => "BAD_REQUEST",
            401 => "UNAUTHORIZED",
            403 => "FORBIDDEN",
            404 => "NOT_FOUND",
            409 => "CONFLICT",
            422 => "UNPROCESSABLE_ENTITY",
            429 => "TOO_MANY_REQUESTS",
            500..=599 => "SERVER_ERROR",
            _ => "API_ERROR",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.messages().join("; "), self.status)
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Not authenticated",
        403 => "Not enough permissions",
        404 => "Not found",
        422 => "Validation error",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}

/// Errors surfaced by the API client and the query layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ClientError::InvalidRequest(message.into())
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Messages suitable for transient notifications
    pub fn messages(&self) -> Vec<String> {
        match self {
            ClientError::Api(err) => err.messages(),
            other => vec![other.to_string()],
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::Api(err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

/// Persistent storage errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Corrupt storage document: {0}")]
    Corrupt(String),

    #[error("Value for key '{key}' could not be (de)serialized: {message}")]
    Value { key: String, message: String },

    #[error("Storage location unavailable: {0}")]
    Unavailable(String),
}
