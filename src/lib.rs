pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use state::AppState;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::middleware::bearer_auth_middleware;

/// Builds the full router: public routes plus the bearer-protected tier.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(handlers::public::root_get))
        .route("/health", get(handlers::public::health_get))
        // Protected
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, history, prompts, variables};

    Router::new()
        .route("/enhance", post(handlers::protected::enhance_post))
        .route("/auth/whoami", get(auth::whoami_get))
        // Prompts
        .route("/prompts", get(prompts::collection_get).post(prompts::collection_post))
        .route(
            "/prompts/:id",
            get(prompts::record_get)
                .put(prompts::record_put)
                .delete(prompts::record_delete),
        )
        .route("/prompts/search/:query", get(prompts::search_get))
        // History
        .route("/history", get(history::collection_get).delete(history::collection_delete))
        .route("/history/recent", get(history::collection_recent))
        .route("/history/:id", get(history::record_get).delete(history::record_delete))
        .route("/history/search/:query", get(history::search_get))
        // Variables
        .route("/variables", get(variables::collection_get).post(variables::collection_post))
        .route(
            "/variables/:id",
            get(variables::record_get)
                .put(variables::record_put)
                .delete(variables::record_delete),
        )
        .route_layer(from_fn_with_state(state, bearer_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
