use crate::{AppState, handlers};
use axum::{Router, routing::get};

pub fn package_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /ToolsPackage
        .route(
            "/ToolsPackage",
            get(handlers::list_packages).post(handlers::create_package),
        )
        // GET/DELETE /ToolsPackage/{id}
        // A malformed id is a 400; an unknown one is a `null` body or a zero delete count.
        .route(
            "/ToolsPackage/{id}",
            get(handlers::get_package).delete(handlers::delete_package),
        )
}
