//! Integration tests for the bearer-token boundary.

mod common;

use common::{issue_token, spawn_app};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn health_needs_no_token() {
    let app = spawn_app().await;
    let response = app.client.get(format!("{}/health", app.address)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = app.client.get(format!("{}/items", app.address)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get_with("/items", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_permission_string_is_unauthorized() {
    let app = spawn_app().await;
    let token = issue_token(app.company_id, "employee", &["read-everything"]);
    let response = app.get_with("/items", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_permission_is_forbidden() {
    let app = spawn_app().await;
    let token = issue_token(app.company_id, "employee", &["read-items"]);

    let response = app.get_with("/items", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_with("/items", &json!({ "name": "Widget", "sale_price": "9.99" }), &token)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn contact_permissions_follow_the_contact_type() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let token = issue_token(app.company_id, "manager", &["create-purchases-vendors"]);

    let response = app
        .post_with(
            "/contacts",
            &json!({ "contact_type": "vendor", "name": "Paper Co", "currency_code": "USD" }),
            &token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_with(
            "/contacts",
            &json!({ "contact_type": "customer", "name": "Acme", "currency_code": "USD" }),
            &token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn companies_cannot_see_each_other() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "100").await;
    let path = format!("/accounts/{}", account["account_id"].as_str().unwrap());

    let response = app.get(&path).await;
    assert_eq!(response.status(), StatusCode::OK);

    let other = issue_token(Uuid::new_v4(), "admin", &[]);
    let response = app.get_with(&path, &other).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
