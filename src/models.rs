use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::repository::{Collection, DocumentBody};

// --- Entity Schemas ---
//
// Documents are stored exactly as submitted. The structs below describe the
// fields clients are known to send; they are the OpenAPI and TypeScript view of
// each collection and never filter what is written.

/// Validate
///
/// Boundary check for request payloads that carry a business key.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Entity
///
/// Binds an entity schema to the collection it lives in, so `CollectionHandle<T>`
/// always addresses the right table.
pub trait Entity: Send + Sync + 'static {
    const COLLECTION: Collection;
}

fn require_text(field: &str, value: Option<&Value>) -> Result<(), String> {
    match value.and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(()),
        Some(_) => Err(format!("`{field}` must not be empty")),
        None => Err(format!("`{field}` is required and must be a string")),
    }
}

/// Package
///
/// A purchasable tool/service offering, served under `/ToolsPackage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Package {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Number>,
    // Image URL shown on the storefront.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<u64>)]
    pub minimum_quantity: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<u64>)]
    pub available_quantity: Option<Number>,
}

impl Entity for Package {
    const COLLECTION: Collection = Collection::Packages;
}

/// Booking
///
/// A purchaser's request for a package. A booking created through the `data`
/// upsert may carry only `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Booking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    // Identifier of the booked package. Not checked against the packages collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<u64>)]
    pub quantity: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    // Free-form status payload attached by `PUT /bookings/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub data: Option<Value>,
}

impl Entity for Booking {
    const COLLECTION: Collection = Collection::Bookings;
}

/// Testimonial
///
/// Free-form customer review. Create and list only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Testimonial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number")]
    #[schema(value_type = Option<f64>)]
    pub rating: Option<Number>,
}

impl Entity for Testimonial {
    const COLLECTION: Collection = Collection::Testimonials;
}

/// User
///
/// A registered customer. `email` is the business key (unique in the store);
/// `role == "admin"` grants elevated access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    pub const ADMIN_ROLE: &'static str = "admin";

    /// Checks that a submitted user object carries its business key.
    pub fn validate_document(doc: &DocumentBody) -> Result<(), String> {
        require_text("email", doc.get("email"))
    }

    /// Reads the role straight off a stored user document.
    pub fn is_admin(doc: &DocumentBody) -> bool {
        doc.get("role").and_then(Value::as_str) == Some(Self::ADMIN_ROLE)
    }
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;
}

/// Stored
///
/// A document as returned by the API: its `_id` plus the body exactly as stored.
/// Reading into an entity struct instead gives a typed view of the known fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T = DocumentBody> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub doc: T,
}

// --- Request Payloads ---

/// BookingDataUpdate
///
/// Body of `PUT /bookings/{id}`. The whole `newData` value is stored under `data`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookingDataUpdate {
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub new_data: Value,
}

/// AdminRequest
///
/// Body of `PUT /users/admin`: the user to promote.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminRequest {
    #[serde(default)]
    pub email: String,
}

impl Validate for AdminRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("`email` must not be empty".to_string());
        }
        Ok(())
    }
}

// --- Response Payloads ---

/// AdminStatus
///
/// Response of `GET /users/{email}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminStatus {
    pub admin: bool,
}

/// LoginResponse
///
/// Response of `POST /login`: a bearer token valid for 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
}

/// InsertResult
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

/// UpdateResult
///
/// Outcome of an update. `upserted_id` is set only when the update created the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            ..Self::default()
        }
    }

    pub fn upserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            upserted_count: 1,
            upserted_id: Some(id),
            ..Self::default()
        }
    }

    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            ..Self::default()
        }
    }
}

/// DeleteResult
///
/// Deleting an id that does not exist is still a success, with a zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> DocumentBody {
        match value {
            Value::Object(map) => map,
            _ => panic!("document must be an object"),
        }
    }

    #[test]
    fn user_document_needs_an_email_string() {
        assert!(User::validate_document(&doc(json!({ "email": "a@b.com", "x": 1 }))).is_ok());
        assert!(User::validate_document(&doc(json!({ "name": "No Email" }))).is_err());
        assert!(User::validate_document(&doc(json!({ "email": "  " }))).is_err());
        assert!(User::validate_document(&doc(json!({ "email": 42 }))).is_err());
    }

    #[test]
    fn admin_role_is_read_from_the_raw_document() {
        assert!(User::is_admin(&doc(json!({ "email": "a@b.com", "role": "admin" }))));
        assert!(!User::is_admin(&doc(json!({ "email": "a@b.com", "role": "buyer" }))));
        assert!(!User::is_admin(&doc(json!({ "email": "a@b.com", "role": ["admin"] }))));
        assert!(!User::is_admin(&doc(json!({ "email": "a@b.com" }))));
    }

    #[test]
    fn admin_request_requires_email() {
        let request: AdminRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.validate().is_err());

        let request: AdminRequest = serde_json::from_value(json!({ "email": "a@b.com" })).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn stored_document_exposes_underscore_id() {
        let id = Uuid::new_v4();
        let stored = Stored {
            id,
            doc: doc(json!({ "email": "a@b.com", "role": "admin", "points": 7 })),
        };

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(
            json,
            json!({ "_id": id, "email": "a@b.com", "role": "admin", "points": 7 })
        );
    }

    #[test]
    fn booking_update_uses_new_data_key() {
        let update: BookingDataUpdate =
            serde_json::from_value(json!({ "newData": { "status": "approved" } })).unwrap();
        assert_eq!(update.new_data, json!({ "status": "approved" }));
    }

    #[test]
    fn result_shapes_use_camel_case() {
        let json = serde_json::to_value(DeleteResult {
            acknowledged: true,
            deleted_count: 0,
        })
        .unwrap();
        assert_eq!(json, json!({ "acknowledged": true, "deletedCount": 0 }));
    }
}
