//! Bearer token authentication and role checks.

use crate::config::AuthConfig;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Roles granting access to the send endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SendAll,
    SendSms,
    SendEmail,
}

impl Role {
    fn name(&self) -> &'static str {
        match self {
            Role::SendAll => "sender.all",
            Role::SendSms => "sender.sms",
            Role::SendEmail => "sender.email",
        }
    }

    /// Matches `sender.sms` as well as the app-scoped `dotflyer.sender.sms`.
    fn matches(&self, claimed: &str) -> bool {
        let claimed = claimed.strip_prefix("dotflyer.").unwrap_or(claimed);
        claimed == self.name()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
}

impl Claims {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.roles
            .iter()
            .any(|claimed| roles.iter().any(|role| role.matches(claimed)))
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            tracing::debug!(sub = %self.sub, roles = ?self.roles, "Caller lacks a required role");
            Err(ApiError::Forbidden("Caller is not allowed to send this message type".into()))
        }
    }
}

/// HS256 token verifier.
#[derive(Clone)]
pub struct JwtAuth {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtAuth {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token and stores its [`Claims`] in the request
/// extensions.
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| {
        tracing::debug!("No bearer token in Authorization header");
        ApiError::Unauthorized("No token provided".into())
    })?;

    let claims = auth.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "JWT verification failed");
        ApiError::Unauthorized("Invalid token".into())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
