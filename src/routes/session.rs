use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::welcome))
        // GET /health
        // Liveness check; does not touch the store.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Signs the submitted user object into a 24 hour bearer token.
        .route("/login", post(handlers::login))
}
