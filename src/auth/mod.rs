use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Serialize;

use crate::types::TokenClaims;

/// Token issued by the API, inspected locally without the signing key.
///
/// The server stays the authority on validity; this is only for showing
/// who the token belongs to and when it runs out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

#[derive(Debug)]
pub enum JwtError {
    Malformed(String),
    MissingExpiry,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Malformed(msg) => write!(f, "Malformed access token: {}", msg),
            JwtError::MissingExpiry => write!(f, "Access token has no expiry claim"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Read the claims without verifying the signature
pub fn decode_claims(token: &str) -> Result<TokenClaims, JwtError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => JwtError::MissingExpiry,
            _ => JwtError::Malformed(e.to_string()),
        })
}

pub fn inspect(token: &str, now: DateTime<Utc>) -> Result<TokenInfo, JwtError> {
    let claims = decode_claims(token)?;
    Ok(TokenInfo {
        expires_at: claims.expires_at(),
        expired: claims.is_expired(now),
        subject: claims.sub,
        scopes: claims.scopes,
    })
}
