//! Axum router configuration with middleware.
//!
//! Routes live under `/api/`; `/health` sits outside it and needs no
//! identity. Middleware: CORS (when enabled in config) and request tracing.

use axum::Router;
use axum::http::HeaderName;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::handlers::chat::CONVERSATION_ID_HEADER;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::send_message))
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversation::list_messages),
        )
        .route("/messages/{id}", delete(handlers::message::delete_message));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check));

    if state.config.server.permissive_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(CONVERSATION_ID_HEADER)]);
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// GET /health - Liveness check (no identity required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
