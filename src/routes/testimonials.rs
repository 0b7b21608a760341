use crate::{AppState, handlers};
use axum::{Router, routing::get};

pub fn testimonial_routes() -> Router<AppState> {
    Router::new().route(
        "/testimonials",
        get(handlers::list_testimonials).post(handlers::create_testimonial),
    )
}
