pub mod query_count;
pub mod request_context;

pub use query_count::query_count_middleware;
pub use request_context::request_context_middleware;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Apply the standard layer stack to an application router: CORS, HTTP
/// tracing, the request context, and query-count accounting.
///
/// Layer order matters: the context middleware must run before the
/// query-count middleware so the counter it creates is visible there.
pub fn with_standard_layers(router: Router) -> Router {
    router
        .layer(axum::middleware::from_fn(query_count::query_count_middleware))
        .layer(axum::middleware::from_fn(request_context::request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
