use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config;
use crate::context::{Claims, CurrentUser, RequestContext};
use crate::error::ApiError;

/// Builds the per-request context and injects it into request extensions.
///
/// Requests without an Authorization header proceed anonymously; a bearer
/// token is decoded into the current user, and an invalid one is rejected
/// with 401. Downstream middleware and handlers read the context via
/// `Extension<RequestContext>`, never from a global store.
pub async fn request_context_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let token = extract_bearer(&headers).map_err(|msg| {
        let api_error = ApiError::unauthorized(msg);
        (
            StatusCode::from_u16(api_error.status_code()).unwrap(),
            Json(api_error.to_json()),
        )
    })?;

    let context = match token {
        Some(token) => {
            let claims = validate_token(&token).map_err(|msg| {
                let api_error = ApiError::unauthorized(msg);
                (
                    StatusCode::from_u16(api_error.status_code()).unwrap(),
                    Json(api_error.to_json()),
                )
            })?;
            RequestContext::authenticated(CurrentUser::from(claims))
        }
        None => RequestContext::anonymous(),
    };

    tracing::debug!(
        "request context {} ({})",
        context.request_id,
        context.user().map(|u| u.email.as_str()).unwrap_or("anonymous")
    );

    request.extensions_mut().insert(context);

    Ok::<_, (StatusCode, Json<serde_json::Value>)>(next.run(request).await)
}

/// Extract a bearer token from the Authorization header, if present.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
    else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(Some(token.to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate a bearer token and extract its claims.
fn validate_token(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid bearer token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(extract_bearer(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = header_map("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers).unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let headers = header_map("Basic dXNlcjpwdw==");
        assert!(extract_bearer(&headers).is_err());
    }

    #[test]
    fn test_empty_bearer_rejected() {
        let headers = header_map("Bearer ");
        assert!(extract_bearer(&headers).is_err());
    }
}
