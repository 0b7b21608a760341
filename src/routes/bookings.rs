use crate::{AppState, handlers};
use axum::{Router, routing::get};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        // GET /bookings?email=...
        .route(
            "/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        // PUT /bookings/{id} upserts `data`; the id is reused when the booking is created.
        .route(
            "/bookings/{id}",
            get(handlers::get_booking)
                .put(handlers::update_booking_data)
                .delete(handlers::delete_booking),
        )
}
