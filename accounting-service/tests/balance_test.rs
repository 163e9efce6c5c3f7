//! Integration tests for accounts, transactions and transfers.

mod common;

use common::{d, dec, spawn_app};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn balance_is_opening_plus_income_minus_expense() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "1000.00").await;
    let account_id = &account["account_id"];

    for (kind, amount) in [("income", "500.00"), ("expense", "200.25")] {
        app.create(
            "/transactions",
            json!({
                "transaction_type": kind,
                "account_id": account_id,
                "paid_at": "2025-03-10T12:00:00Z",
                "amount": amount,
            }),
        )
        .await;
    }

    let response = app
        .get(&format!("/accounts/{}/balance", account_id.as_str().unwrap()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(dec(&body["balance"]), d("1299.75"));
    assert_eq!(dec(&body["totals"]["income"]), d("500"));
    assert_eq!(dec(&body["totals"]["expense"]), d("200.25"));
    assert_eq!(body["formatted"], "$1,299.75");
}

#[tokio::test]
async fn transaction_taxes_are_computed_and_frozen() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "0").await;
    let tax = app.create_tax("7.5").await;

    let created = app
        .create(
            "/transactions",
            json!({
                "transaction_type": "income",
                "account_id": account["account_id"],
                "paid_at": "2025-03-10T12:00:00Z",
                "amount": "99.99",
                "tax_ids": [tax["tax_id"]],
            }),
        )
        .await;
    assert_eq!(dec(&created["tax_total"]), d("7.50"));
    assert_eq!(created["currency_code"], "USD");

    let response = app
        .patch(
            &format!("/taxes/{}", tax["tax_id"].as_str().unwrap()),
            &json!({ "rate": "20" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let fetched: Value = app
        .get(&format!(
            "/transactions/{}",
            created["transaction_id"].as_str().unwrap()
        ))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&fetched["taxes"][0]["rate"]), d("7.5"));
    assert_eq!(dec(&fetched["tax_total"]), d("7.50"));
}

#[tokio::test]
async fn amounts_finer_than_the_currency_are_rejected() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "0").await;

    let response = app
        .post(
            "/transactions",
            &json!({
                "transaction_type": "expense",
                "account_id": account["account_id"],
                "paid_at": "2025-03-10T12:00:00Z",
                "amount": "10.005",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "amount");
}

#[tokio::test]
async fn monetary_fields_cannot_be_edited() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "0").await;
    let created = app
        .create(
            "/transactions",
            json!({
                "transaction_type": "income",
                "account_id": account["account_id"],
                "paid_at": "2025-03-10T12:00:00Z",
                "amount": "10",
            }),
        )
        .await;
    let path = format!(
        "/transactions/{}",
        created["transaction_id"].as_str().unwrap()
    );

    let response = app.patch(&path, &json!({ "amount": "99" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.patch(&path, &json!({ "description": "Coffee" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["description"], "Coffee");
    assert_eq!(dec(&body["amount"]), d("10"));
}

#[tokio::test]
async fn transfer_moves_money_through_the_base_currency() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    app.create_currency("EUR", "0.9").await;
    let usd = app.create_account("USD", "500").await;
    let eur = app.create_account("EUR", "0").await;

    let transfer = app
        .create(
            "/transfers",
            json!({
                "from_account_id": usd["account_id"],
                "to_account_id": eur["account_id"],
                "amount": "100.00",
                "paid_at": "2025-03-10T12:00:00Z",
            }),
        )
        .await;
    assert_eq!(dec(&transfer["outgoing"]["amount"]), d("100"));
    assert_eq!(dec(&transfer["incoming"]["amount"]), d("90"));

    let usd_balance: Value = app
        .get(&format!("/accounts/{}/balance", usd["account_id"].as_str().unwrap()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&usd_balance["balance"]), d("400"));
    assert_eq!(dec(&usd_balance["totals"]["transfer_out"]), d("100"));

    let eur_balance: Value = app
        .get(&format!("/accounts/{}/balance", eur["account_id"].as_str().unwrap()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&eur_balance["balance"]), d("90"));

    // Deleting one leg removes the pair.
    let response = app
        .delete(&format!(
            "/transactions/{}",
            transfer["incoming"]["transaction_id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let usd_balance: Value = app
        .get(&format!("/accounts/{}/balance", usd["account_id"].as_str().unwrap()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(dec(&usd_balance["balance"]), d("500"));
}

#[tokio::test]
async fn transfers_need_their_own_endpoint() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "0").await;

    let response = app
        .post(
            "/transactions",
            &json!({
                "transaction_type": "transfer",
                "account_id": account["account_id"],
                "paid_at": "2025-03-10T12:00:00Z",
                "amount": "10",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post(
            "/transfers",
            &json!({
                "from_account_id": account["account_id"],
                "to_account_id": account["account_id"],
                "amount": "10",
                "paid_at": "2025-03-10T12:00:00Z",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn account_with_transactions_cannot_be_deleted() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    let account = app.create_account("USD", "0").await;
    app.create(
        "/transactions",
        json!({
            "transaction_type": "income",
            "account_id": account["account_id"],
            "paid_at": "2025-03-10T12:00:00Z",
            "amount": "10",
        }),
    )
    .await;

    let response = app
        .delete(&format!("/accounts/{}", account["account_id"].as_str().unwrap()))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
