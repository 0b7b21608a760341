use serde_json::{Number, Value, json};
use tools_house_api::models::{
    AdminRequest, Booking, InsertResult, Package, Stored, Testimonial, UpdateResult, User,
    Validate,
};
use uuid::Uuid;

// --- Tests ---

#[test]
fn test_stored_document_keeps_unknown_fields_and_number_form() {
    let id = Uuid::new_v4();
    let raw = json!({
        "_id": id,
        "name": "Saw",
        "img": "http://x/saw.png",
        "rating": 4.5,
        "price": 120
    });

    let stored: Stored = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(stored.id, id);
    assert!(!stored.doc.contains_key("_id"));
    assert_eq!(serde_json::to_value(&stored).unwrap(), raw);
}

#[test]
fn test_package_view_reads_storefront_field_names() {
    let package: Package = serde_json::from_value(json!({
        "name": "Impact Driver",
        "price": 120,
        "minimumQuantity": 10,
        "availableQuantity": 250,
        "img": "ignored by the view"
    }))
    .unwrap();

    assert_eq!(package.price, Some(Number::from(120)));
    assert_eq!(package.minimum_quantity, Some(Number::from(10)));
    assert_eq!(package.available_quantity, Some(Number::from(250)));
}

#[test]
fn test_views_tolerate_missing_fields() {
    let package: Package = serde_json::from_value(json!({ "title": "Drill" })).unwrap();
    assert_eq!(package, Package::default());

    let testimonial: Testimonial = serde_json::from_value(json!({ "stars": 3 })).unwrap();
    assert_eq!(testimonial.review, None);
}

#[test]
fn test_booking_view_of_upserted_document() {
    let id = Uuid::new_v4();
    let stored: Stored<Booking> = serde_json::from_value(json!({
        "_id": id,
        "data": { "status": "shipped", "tracking": ["A1", "B2"] }
    }))
    .unwrap();

    assert_eq!(stored.id, id);
    assert_eq!(stored.doc.email, None);
    assert_eq!(
        stored.doc.data,
        Some(json!({ "status": "shipped", "tracking": ["A1", "B2"] }))
    );
}

#[test]
fn test_user_business_key_checks() {
    let user = |value: Value| match value {
        Value::Object(map) => map,
        _ => panic!("user must be an object"),
    };

    assert!(User::validate_document(&user(json!({ "email": "a@b.com", "photoURL": "p" }))).is_ok());
    assert!(User::validate_document(&user(json!({ "displayName": "No Email" }))).is_err());

    let request = AdminRequest {
        email: String::new(),
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_write_results_serialize_like_driver_acknowledgements() {
    let id = Uuid::new_v4();

    assert_eq!(
        serde_json::to_value(InsertResult::new(id)).unwrap(),
        json!({ "acknowledged": true, "insertedId": id })
    );
    assert_eq!(
        serde_json::to_value(UpdateResult::upserted(id)).unwrap(),
        json!({
            "acknowledged": true,
            "matchedCount": 0,
            "modifiedCount": 0,
            "upsertedCount": 1,
            "upsertedId": id
        })
    );
    assert_eq!(
        serde_json::to_value(UpdateResult::unmatched()).unwrap()["upsertedId"],
        json!(null)
    );
}
