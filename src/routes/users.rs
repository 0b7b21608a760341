use crate::{AppState, handlers};
use axum::{Router, routing::get};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET /users lists, POST /users registers, PUT /users upserts by email.
        .route(
            "/users",
            get(handlers::list_users)
                .post(handlers::create_user)
                .put(handlers::upsert_user),
        )
        // PUT /users/admin
        // The static segment takes priority over `/users/{email}` below, so its GET
        // is wired to the same admin-status lookup.
        .route(
            "/users/admin",
            get(handlers::get_admin_status_of_admin).put(handlers::make_admin),
        )
        // GET /users/{email}
        // Answers `{ admin: bool }` by comparing the stored user's role.
        .route("/users/{email}", get(handlers::get_admin_status))
}
