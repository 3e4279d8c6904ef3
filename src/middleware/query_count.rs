use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::config;
use crate::context::RequestContext;

/// Warns when a request blows through its query budget.
///
/// Reads the counter created by the context middleware, runs the request,
/// then compares the total against the configured threshold. The count is
/// optionally exposed as an `x-query-count` response header so excessive
/// fetching shows up in browser tooling during development.
pub async fn query_count_middleware(request: Request, next: Next) -> Response {
    let context = request.extensions().get::<RequestContext>().cloned();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    let Some(context) = context else {
        tracing::debug!("no request context for {}; skipping query accounting", path);
        return response;
    };

    let count = context.queries().count();
    let middleware_config = &config::config().middleware;

    if count > middleware_config.query_warning_threshold {
        tracing::warn!(
            "request {} to {} issued {} queries (budget {})",
            context.request_id,
            path,
            count,
            middleware_config.query_warning_threshold
        );
    }

    if middleware_config.expose_query_count_header {
        if let Ok(value) = HeaderValue::from_str(&count.to_string()) {
            response.headers_mut().insert("x-query-count", value);
        }
    }

    response
}
