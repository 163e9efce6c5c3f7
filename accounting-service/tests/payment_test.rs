//! Integration tests for document payments.

mod common;

use common::{d, dec, spawn_app, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// A sent USD invoice for 110.00 and a USD account to pay it into.
async fn sent_invoice(app: &TestApp, number: &str) -> (String, Value) {
    app.create_currency("USD", "1").await;
    let customer = app.create_customer("USD").await;
    let tax = app.create_tax("10").await;
    let account = app.create_account("USD", "0").await;
    let document = app
        .create_invoice(&customer["contact_id"], number, "2", "50.00", &[&tax["tax_id"]])
        .await;
    let id = document["document_id"].as_str().unwrap().to_string();

    let response = app.post(&format!("/documents/{}/send", id), &json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    (id, account)
}

async fn pay(app: &TestApp, document_id: &str, account: &Value, amount: &str) -> reqwest::Response {
    app.post(
        &format!("/documents/{}/payments", document_id),
        &json!({
            "account_id": account["account_id"],
            "amount": amount,
            "paid_at": "2025-03-15T09:00:00Z",
        }),
    )
    .await
}

#[tokio::test]
async fn paying_the_full_amount_marks_paid() {
    let app = spawn_app().await;
    let (id, account) = sent_invoice(&app, "INV-1001").await;

    let response = pay(&app, &id, &account, "110.00").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["document"]["status"], "paid");
    assert_eq!(body["transaction"]["transaction_type"], "income");
    assert_eq!(body["transaction"]["document_id"], id.as_str());
    assert_eq!(dec(&body["transaction"]["amount"]), d("110"));

    let balance: Value = app
        .get(&format!(
            "/accounts/{}/balance",
            account["account_id"].as_str().unwrap()
        ))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&balance["balance"]), d("110"));
}

#[tokio::test]
async fn paying_less_marks_partial_until_settled() {
    let app = spawn_app().await;
    let (id, account) = sent_invoice(&app, "INV-1002").await;

    let body: Value = pay(&app, &id, &account, "50.00").await.json().await.unwrap();
    assert_eq!(body["document"]["status"], "partial");

    let dashboard: Value = app
        .get("/reports/dashboard?from=2025-01-01&to=2025-12-31")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&dashboard["receivables"]), d("60"));
    assert_eq!(dashboard["open_invoices"], 1);

    let body: Value = pay(&app, &id, &account, "60.00").await.json().await.unwrap();
    assert_eq!(body["document"]["status"], "paid");
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let app = spawn_app().await;
    let (id, account) = sent_invoice(&app, "INV-1003").await;

    let response = pay(&app, &id, &account, "110.01").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "amount");

    let document: Value = app
        .get(&format!("/documents/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(document["status"], "sent");
}

#[tokio::test]
async fn drafts_and_cancelled_documents_take_no_payments() {
    let app = spawn_app().await;
    let (id, account) = sent_invoice(&app, "INV-1004").await;

    let response = app.post(&format!("/documents/{}/cancel", id), &json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = pay(&app, &id, &account, "10.00").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn payment_account_must_share_the_document_currency() {
    let app = spawn_app().await;
    let (id, _) = sent_invoice(&app, "INV-1005").await;
    app.create_currency("EUR", "0.9").await;
    let eur_account = app.create_account("EUR", "0").await;

    let response = pay(&app, &id, &eur_account, "110.00").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "account_id");
}

#[tokio::test]
async fn payments_pin_their_document() {
    let app = spawn_app().await;
    let (id, account) = sent_invoice(&app, "INV-1006").await;
    let body: Value = pay(&app, &id, &account, "50.00").await.json().await.unwrap();

    let response = app
        .delete(&format!(
            "/transactions/{}",
            body["transaction"]["transaction_id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.delete(&format!("/documents/{}", id)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
