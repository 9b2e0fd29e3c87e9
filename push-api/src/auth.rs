use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use push_core::PushError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing;

use crate::error::ApiError;
use crate::server::ApiState;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Administrator identity taken from a verified token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub subject: String,
}

/// Extract JWT token from Authorization header
fn extract_token(auth_header: Option<&str>) -> Option<String> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
}

/// Issue an HS256 token for `subject`.
pub fn generate_token(subject: &str, secret: &str, expires_in_days: u64) -> Result<String, ApiError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| PushError::Internal(e.into()))?
        .as_secs() as usize;

    let exp = now + (expires_in_days * 24 * 60 * 60) as usize;

    let claims = Claims {
        sub: subject.to_string(),
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| {
            tracing::error!("Failed to generate JWT token: {}", e);
            ApiError::Push(PushError::Internal(e.into()))
        })
}

/// Verify JWT token and return its subject
pub fn verify_token(token: &str, secret: &str) -> Result<String, ApiError> {
    let decoding_key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::default();

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(token_data) => Ok(token_data.claims.sub),
        Err(e) => {
            tracing::debug!("JWT verification failed: {}", e);
            Err(ApiError::Unauthorized("Invalid or expired token".to_string()))
        }
    }
}

/// Axum middleware guarding the admin routes
pub async fn auth_middleware(mut req: Request, next: axum::middleware::Next) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = extract_token(auth_header)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let secret = req
        .extensions()
        .get::<ApiState>()
        .map(|state| state.config.server.jwt_secret.clone())
        .ok_or_else(|| PushError::Internal(anyhow::anyhow!("API state missing from request")))?;

    let subject = verify_token(&token, &secret)?;
    tracing::debug!("Authenticated admin: {}", subject);

    req.extensions_mut().insert(AuthenticatedAdmin { subject });

    Ok(next.run(req).await)
}
