use axum::{
    Router,
    extract::{FromRef, MatchedPath, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod collections;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// One router per resource; protection is applied in `create_router`.
pub mod routes;
use routes::{bookings, packages, session, testimonials, users};

// --- Public Re-exports ---

pub use auth::TokenService;
pub use collections::CollectionHandle;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

use models::{Booking, Package, Testimonial, User};

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json` and browsable
/// through the Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::welcome, handlers::list_packages, handlers::get_package,
        handlers::create_package, handlers::delete_package, handlers::list_users,
        handlers::get_admin_status, handlers::create_user, handlers::upsert_user,
        handlers::make_admin, handlers::list_bookings, handlers::get_booking,
        handlers::create_booking, handlers::update_booking_data, handlers::delete_booking,
        handlers::list_testimonials, handlers::create_testimonial, handlers::login
    ),
    components(
        schemas(
            models::Package, models::Booking, models::Testimonial, models::User,
            models::BookingDataUpdate, models::AdminRequest, models::AdminStatus,
            models::LoginResponse, models::InsertResult, models::UpdateResult,
            models::DeleteResult,
        )
    ),
    tags(
        (name = "tools-house", description = "Tools House data-access API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler: the store handle opened
/// during startup, the token service and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Document store (Postgres in production, in-memory for tests and local runs).
    pub repo: RepositoryState,
    /// Bearer token issuance and verification.
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::new(config.token_secret.clone()),
            config,
        }
    }

    // --- Collection Accessors ---

    pub fn packages(&self) -> CollectionHandle<Package> {
        CollectionHandle::new(self.repo.clone())
    }

    pub fn bookings(&self) -> CollectionHandle<Booking> {
        CollectionHandle::new(self.repo.clone())
    }

    pub fn testimonials(&self) -> CollectionHandle<Testimonial> {
        CollectionHandle::new(self.repo.clone())
    }

    pub fn users(&self) -> CollectionHandle<User> {
        CollectionHandle::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// access_gate
///
/// Bearer-token gate over every route. Routes absent from
/// `AppConfig::protected_routes` pass straight through. For a protected route a
/// missing `Authorization` header is rejected with 401, any header that does not
/// verify as a bearer token with 403, and valid claims are attached to the
/// request extensions.
async fn access_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let protected = request
        .extensions()
        .get::<MatchedPath>()
        .is_some_and(|path| {
            state
                .config
                .protected_routes
                .iter()
                .any(|route| route.matches(request.method(), path.as_str()))
        });

    if protected {
        let claims = auth::authorize(request.headers(), &state.tokens)?;
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles every resource router, applies the access gate and the global
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(session::session_routes())
        .merge(packages::package_routes())
        .merge(users::user_routes())
        .merge(bookings::booking_routes())
        .merge(testimonials::testimonial_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), access_gate));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request, correlated by the `x-request-id` set upstream.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
