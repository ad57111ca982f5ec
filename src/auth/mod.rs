/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWTs (HS256) identify the caller and carry its capabilities. The
 * auth middleware turns a valid token into a [`Principal`]; the capability
 * middleware asks the configured [`AccessGate`] whether the principal may
 * reach a route.
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

mod gate;
pub mod permissions;

pub use gate::{AccessGate, CapabilityGate, Decision, MatchMode};
pub use permissions::consts;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (principal id, recorded as author_id)
    pub permissions: Vec<String>, // Capabilities
    pub jti: String,              // JWT ID
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub capabilities: Vec<String>,
}

impl Principal {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Mints an access token. Tokens normally come from the identity provider;
    /// this exists for tests and operator tooling.
    pub fn issue_token(&self, subject: &str, capabilities: &[String]) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            permissions: capabilities.to_vec(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_TOKEN",
                "No authentication token provided".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Capabilities a route requires, matched with `mode`.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub capabilities: Vec<&'static str>,
    pub mode: MatchMode,
}

/// Capability middleware: asks the access gate about the authenticated principal.
pub async fn capability_middleware(
    State(requirement): State<Requirement>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(AuthError::MissingToken)?;
    let gate = request
        .extensions()
        .get::<Arc<dyn AccessGate>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("Access gate not available".to_string()))?;

    match gate.authorize(&principal, &requirement.capabilities, requirement.mode) {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Deny => {
            debug!(
                principal = %principal.id,
                required = ?requirement.capabilities,
                mode = ?requirement.mode,
                "access denied"
            );
            Err(AuthError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware: resolves the bearer token into a [`Principal`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match principal_from_headers(request.headers(), &auth_service) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn principal_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<Principal, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    let claims = auth_service.validate_token(token)?;
    Ok(Principal {
        id: claims.sub,
        capabilities: claims.permissions,
    })
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    /// Requires all of `capabilities`.
    fn with_capabilities(self, capabilities: &[&'static str]) -> Self;
    /// Requires at least one of `capabilities`.
    fn with_any_capability(self, capabilities: &[&'static str]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_capabilities(self, capabilities: &[&'static str]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            Requirement {
                capabilities: capabilities.to_vec(),
                mode: MatchMode::All,
            },
            capability_middleware,
        ))
        .with_auth()
    }

    fn with_any_capability(self, capabilities: &[&'static str]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            Requirement {
                capabilities: capabilities.to_vec(),
                mode: MatchMode::Any,
            },
            capability_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "a-test-secret-that-is-long-enough-for-hs256".to_string(),
            "stock-ledger".to_string(),
            "stock-ledger-auth".to_string(),
            Duration::from_secs(300),
        ))
    }

    #[test]
    fn issued_token_round_trips_to_claims() {
        let auth = service();
        let token = auth
            .issue_token("user-42", &[consts::ORG_DEVICE_WRITE.to_string()])
            .unwrap();

        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.permissions, vec![consts::ORG_DEVICE_WRITE]);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig {
            jwt_secret: "some-other-secret-that-is-also-long-enough".to_string(),
            ..service().config
        });
        let token = other.issue_token("user-42", &[]).unwrap();

        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn missing_bearer_prefix_is_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(matches!(
            principal_from_headers(&headers, &service()),
            Err(AuthError::MissingToken)
        ));
    }
}
