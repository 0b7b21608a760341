use serde_json::{Number, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tools_house_api::{
    AppConfig, AppState, create_router,
    models::{Booking, InsertResult, Stored},
    repository::{MemoryRepository, RepositoryState},
};

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves the full router on an ephemeral local port, backed by the in-memory store.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let router = create_router(AppState::new(repo, AppConfig::default()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let inserted: InsertResult = client
        .post(format!("{}/bookings", app.address))
        .json(&json!({ "email": "buyer@tools.com", "packageName": "Grinder", "quantity": 3 }))
        .send()
        .await
        .expect("post fail")
        .json()
        .await
        .unwrap();
    assert!(inserted.acknowledged);

    // Approve
    let response = client
        .put(format!("{}/bookings/{}", app.address, inserted.inserted_id))
        .json(&json!({ "newData": { "status": "approved" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Read back through the email filter
    let bookings: Vec<Stored<Booking>> = client
        .get(format!("{}/bookings", app.address))
        .query(&[("email", "buyer@tools.com")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, inserted.inserted_id);
    assert_eq!(bookings[0].doc.quantity, Some(Number::from(3)));
    assert_eq!(bookings[0].doc.data, Some(json!({ "status": "approved" })));

    // Delete
    let deleted: Value = client
        .delete(format!("{}/bookings/{}", app.address, inserted.inserted_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["deletedCount"], json!(1));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/testimonials", app.address))
        .header("Origin", "http://storefront.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/bookings/{id}"].is_object());
    assert!(doc["paths"]["/login"].is_object());
}
