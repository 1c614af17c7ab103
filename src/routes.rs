use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::correlation::correlation_id_middleware;
use crate::handlers::{self, AppState};
use crate::metrics;
use crate::openapi;

/// Default request body cap.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the full application router.
///
/// Layer order, outermost first: correlation id, request trace, metrics,
/// body limit. Metrics therefore see the final status of every request,
/// including rejected and unmatched ones.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        // Infra
        .route("/health", get(handlers::health))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/openapi.json", get(openapi::serve_openapi_spec))
        .route("/docs", get(openapi::serve_swagger_ui))
        // Customers
        .route(
            "/v1/customers",
            post(handlers::create_customer).get(handlers::list_customers),
        )
        .route(
            "/v1/customers/:id",
            get(handlers::get_customer)
                .patch(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        // Addresses
        .route(
            "/v1/customers/:id/addresses",
            get(handlers::list_addresses).post(handlers::create_address),
        )
        // Internal, used by order-service
        .route(
            "/internal/v1/customers/:id/validate-address",
            get(handlers::validate_customer_address),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}
