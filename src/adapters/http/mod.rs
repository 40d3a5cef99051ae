//! HTTP adapters - REST API implementations.

pub mod billing;
pub mod middleware;

pub use billing::BillingAppState;
pub use middleware::{AuthState, JwtAuthenticator};

use axum::http::{header, HeaderValue, Method};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assemble the complete application router.
///
/// - `/api/webhooks/*` - signature-verified, no bearer auth
/// - `/api/*` - bearer-JWT protected billing endpoints
/// - `/health` - liveness probe
pub fn app_router(state: BillingAppState, auth: AuthState, cors_origins: &[String]) -> Router {
    let api = billing::billing_routes()
        .layer(from_fn_with_state(auth, middleware::auth_middleware));

    Router::new()
        .nest("/api", api)
        .nest("/api/webhooks", billing::webhook_routes())
        .route("/health", get(billing::handlers::health))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The extension popup and the account page call the API from their own
/// origins; everything they need is GET/POST with a bearer token.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
