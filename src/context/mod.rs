use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::QueryCounter;

/// Bearer-token claims for callers of the integrating application.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, email: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self { sub, email, exp, iat: now.timestamp() }
    }
}

/// The authenticated caller for one request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, email: claims.email }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("no authenticated user in request context")]
    Anonymous,
}

/// Everything scoped to one in-flight request: who is calling, a request
/// id for log correlation, and the query counter.
///
/// Created per request by the context middleware and carried in request
/// extensions; handlers receive it via `Extension<RequestContext>`. There
/// is no process-global or thread-keyed current-user store: reused worker
/// threads must never leak identity between requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    user: Option<CurrentUser>,
    queries: QueryCounter,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user: None,
            queries: QueryCounter::new(),
        }
    }

    pub fn authenticated(user: CurrentUser) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user: Some(user),
            queries: QueryCounter::new(),
        }
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// The current user, or an error for handlers that need a principal.
    pub fn require_user(&self) -> Result<&CurrentUser, ContextError> {
        self.user.as_ref().ok_or(ContextError::Anonymous)
    }

    pub fn queries(&self) -> &QueryCounter {
        &self.queries
    }
}

/// Sign a token for the given claims with the configured secret.
pub fn generate_token(claims: &Claims) -> Result<String, ContextError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(ContextError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| ContextError::TokenGeneration(e.to_string()))
}
