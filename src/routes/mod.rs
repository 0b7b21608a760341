//! Router Module Index
//!
//! One router per resource. None of them applies access control itself: the
//! bearer-token gate is layered over the merged router in `create_router` and
//! consults the configured protected-route list, so protection stays a
//! reviewable configuration rather than a property of where a route is declared.

/// `/ToolsPackage`: the product catalogue.
pub mod packages;

/// `/users`: registration, login sync and admin promotion.
pub mod users;

/// `/bookings`: purchase requests and their status payload.
pub mod bookings;

/// `/testimonials`: customer reviews (create and list only).
pub mod testimonials;

/// `/login`: bearer token issuance.
pub mod session;
