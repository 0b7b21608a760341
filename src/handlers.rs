use crate::{
    AppState,
    collections::parse_id,
    error::{ApiError, ApiResult},
    models::{
        AdminRequest, AdminStatus, Booking, BookingDataUpdate, DeleteResult, InsertResult,
        LoginResponse, Package, Stored, Testimonial, UpdateResult, User, Validate,
    },
    repository::{DocumentBody, Filter, Selector},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Map, Value};

// --- Filter Structs ---

/// BookingFilter
///
/// Query parameters for GET /bookings. Without `email` every booking is returned.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct BookingFilter {
    /// Only return bookings placed by this email.
    pub email: Option<String>,
}

fn email_filter(email: impl Into<Value>) -> Filter {
    let mut filter = Filter::new();
    filter.insert("email".to_string(), email.into());
    filter
}

// --- Root ---

/// welcome
///
/// [Public Route] Plain-text greeting.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Greeting", body = String))
)]
pub async fn welcome() -> &'static str {
    "Welcome to Tools World"
}

// --- Tools Packages ---

#[utoipa::path(
    get,
    path = "/ToolsPackage",
    responses((status = 200, description = "All packages", body = [Package]))
)]
pub async fn list_packages(State(state): State<AppState>) -> ApiResult<Json<Vec<Stored>>> {
    Ok(Json(state.packages().list_all().await?))
}

/// get_package
///
/// [Public Route] A single package, or `null` when the id is well formed but unknown.
#[utoipa::path(
    get,
    path = "/ToolsPackage/{id}",
    params(("id" = String, Path, description = "Package ID")),
    responses(
        (status = 200, description = "Package or null", body = Package),
        (status = 400, description = "Malformed id")
    )
)]
pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Stored>>> {
    Ok(Json(state.packages().get_by_id(&id).await?))
}

/// create_package
///
/// [Public Route] Stores the submitted object as is; fields beyond the documented ones are kept.
#[utoipa::path(
    post,
    path = "/ToolsPackage",
    request_body = Package,
    responses((status = 200, description = "Inserted", body = InsertResult))
)]
pub async fn create_package(
    State(state): State<AppState>,
    Json(package): Json<DocumentBody>,
) -> ApiResult<Json<InsertResult>> {
    Ok(Json(state.packages().insert(package).await?))
}

#[utoipa::path(
    delete,
    path = "/ToolsPackage/{id}",
    params(("id" = String, Path, description = "Package ID")),
    responses((status = 200, description = "Deleted (count may be 0)", body = DeleteResult))
)]
pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    Ok(Json(state.packages().delete_by_id(&id).await?))
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<Stored>>> {
    Ok(Json(state.users().list_all().await?))
}

/// get_admin_status
///
/// [Public Route] `{ admin: true }` only when a user with this email exists and holds
/// the admin role. An unknown email is simply `{ admin: false }`.
#[utoipa::path(
    get,
    path = "/users/{email}",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Admin flag", body = AdminStatus))
)]
pub async fn get_admin_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<AdminStatus>> {
    admin_status(&state, email).await
}

/// get_admin_status_of_admin
///
/// `GET /users/admin` shares its path with the promotion route, so it is routed
/// here and answers as a lookup of the literal email `admin`.
pub async fn get_admin_status_of_admin(State(state): State<AppState>) -> ApiResult<Json<AdminStatus>> {
    admin_status(&state, "admin".to_string()).await
}

async fn admin_status(state: &AppState, email: String) -> ApiResult<Json<AdminStatus>> {
    let user = state.users().find_one(email_filter(email)).await?;
    let admin = user.is_some_and(|stored| User::is_admin(&stored.doc));
    Ok(Json(AdminStatus { admin }))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = User,
    responses(
        (status = 200, description = "Inserted", body = InsertResult),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(user): Json<DocumentBody>,
) -> ApiResult<Json<InsertResult>> {
    let result = state.users().insert(user).await?;
    tracing::info!(id = %result.inserted_id, "user registered");
    Ok(Json(result))
}

/// upsert_user
///
/// [Public Route] Login/registration sync: sets every submitted field on the user
/// with this email, creating the user on first sight.
#[utoipa::path(
    put,
    path = "/users",
    request_body = User,
    responses(
        (status = 200, description = "Upserted", body = UpdateResult),
        (status = 422, description = "Missing email")
    )
)]
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(user): Json<DocumentBody>,
) -> ApiResult<Json<UpdateResult>> {
    User::validate_document(&user).map_err(ApiError::Validation)?;
    let email = user.get("email").cloned().unwrap_or_default();
    let selector = Selector::Fields(email_filter(email));
    Ok(Json(state.users().upsert(selector, user).await?))
}

/// make_admin
///
/// [Public Route] Promotes an existing user. Unknown emails are not created.
#[utoipa::path(
    put,
    path = "/users/admin",
    request_body = AdminRequest,
    responses(
        (status = 200, description = "Updated", body = UpdateResult),
        (status = 422, description = "Missing email")
    )
)]
pub async fn make_admin(
    State(state): State<AppState>,
    Json(request): Json<AdminRequest>,
) -> ApiResult<Json<UpdateResult>> {
    request.validate().map_err(ApiError::Validation)?;

    let mut patch = DocumentBody::new();
    patch.insert("role".to_string(), Value::from(User::ADMIN_ROLE));

    let result = state
        .users()
        .update(Selector::Fields(email_filter(request.email)), patch)
        .await?;
    Ok(Json(result))
}

// --- Bookings ---

#[utoipa::path(
    get,
    path = "/bookings",
    params(BookingFilter),
    responses((status = 200, description = "Bookings", body = [Booking]))
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> ApiResult<Json<Vec<Stored>>> {
    let filter = match filter.email {
        Some(email) if !email.is_empty() => email_filter(email),
        _ => Filter::new(),
    };
    Ok(Json(state.bookings().list_by_filter(filter).await?))
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking ID")),
    responses((status = 200, description = "Booking or null", body = Booking))
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Stored>>> {
    Ok(Json(state.bookings().get_by_id(&id).await?))
}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body = Booking,
    responses((status = 200, description = "Inserted", body = InsertResult))
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(booking): Json<DocumentBody>,
) -> ApiResult<Json<InsertResult>> {
    Ok(Json(state.bookings().insert(booking).await?))
}

/// update_booking_data
///
/// [Public Route] Stores `newData` under the booking's `data` field. A booking that
/// does not exist yet is created under the given id.
#[utoipa::path(
    put,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking ID")),
    request_body = BookingDataUpdate,
    responses((status = 200, description = "Upserted", body = UpdateResult))
)]
pub async fn update_booking_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<BookingDataUpdate>,
) -> ApiResult<Json<UpdateResult>> {
    let id = parse_id(&id)?;
    let mut patch = DocumentBody::new();
    patch.insert("data".to_string(), update.new_data);

    Ok(Json(state.bookings().upsert(Selector::Id(id), patch).await?))
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking ID")),
    responses((status = 200, description = "Deleted (count may be 0)", body = DeleteResult))
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResult>> {
    Ok(Json(state.bookings().delete_by_id(&id).await?))
}

// --- Testimonials ---

#[utoipa::path(
    get,
    path = "/testimonials",
    responses((status = 200, description = "Testimonials", body = [Testimonial]))
)]
pub async fn list_testimonials(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Stored>>> {
    Ok(Json(state.testimonials().list_all().await?))
}

#[utoipa::path(
    post,
    path = "/testimonials",
    request_body = Testimonial,
    responses((status = 200, description = "Inserted", body = InsertResult))
)]
pub async fn create_testimonial(
    State(state): State<AppState>,
    Json(testimonial): Json<DocumentBody>,
) -> ApiResult<Json<InsertResult>> {
    Ok(Json(state.testimonials().insert(testimonial).await?))
}

// --- Session ---

/// login
///
/// [Public Route] Signs the submitted user object into a bearer token valid for 24 hours.
/// The payload shape is not checked.
#[utoipa::path(
    post,
    path = "/login",
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 500, description = "Signing secret missing")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<LoginResponse>> {
    let access_token = state.tokens.issue(payload)?;
    Ok(Json(LoginResponse { access_token }))
}
