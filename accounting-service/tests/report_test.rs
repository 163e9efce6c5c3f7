//! Integration tests for reports.

mod common;

use common::{d, dec, spawn_app};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn profit_and_loss_excludes_transfers() {
    let app = spawn_app().await;
    app.create_currency("USD", "1").await;
    app.create_currency("EUR", "0.5").await;
    let usd = app.create_account("USD", "0").await;
    let eur = app.create_account("EUR", "0").await;
    let sales = app
        .create("/categories", json!({ "name": "Sales", "category_type": "income" }))
        .await;

    let entries = [
        ("income", &usd, "500.00", "2025-03-05T10:00:00Z"),
        ("expense", &usd, "200.00", "2025-03-06T10:00:00Z"),
        ("income", &eur, "100.00", "2025-04-02T10:00:00Z"),
        // Outside the range.
        ("income", &usd, "999.00", "2025-06-01T10:00:00Z"),
    ];
    for (kind, account, amount, paid_at) in entries {
        app.create(
            "/transactions",
            json!({
                "transaction_type": kind,
                "account_id": account["account_id"],
                "paid_at": paid_at,
                "amount": amount,
                "category_id": if kind == "income" { sales["category_id"].clone() } else { Value::Null },
            }),
        )
        .await;
    }
    app.create(
        "/transfers",
        json!({
            "from_account_id": usd["account_id"],
            "to_account_id": eur["account_id"],
            "amount": "50.00",
            "paid_at": "2025-03-07T10:00:00Z",
        }),
    )
    .await;

    let response = app
        .get("/reports/profit-loss?from=2025-03-01&to=2025-04-30")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["currency_code"], "USD");
    // 100 EUR at 0.5 is 200 in the base currency.
    assert_eq!(dec(&report["income"]), d("700"));
    assert_eq!(dec(&report["expense"]), d("200"));
    assert_eq!(dec(&report["net_profit"]), d("500"));
    assert_eq!(report["income_by_category"][0]["category_id"], sales["category_id"]);

    let summary: Value = app
        .get("/reports/income-summary?from=2025-03-01&to=2025-05-31")
        .await
        .json()
        .await
        .unwrap();
    let months: Vec<(String, rust_decimal::Decimal)> = summary["months"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["month"].as_str().unwrap().to_string(), dec(&m["amount"])))
        .collect();
    assert_eq!(
        months,
        vec![
            ("2025-03".to_string(), d("500")),
            ("2025-04".to_string(), d("200")),
            ("2025-05".to_string(), d("0")),
        ]
    );
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let app = spawn_app().await;
    let response = app
        .get("/reports/expense-summary?from=2025-05-01&to=2025-04-01")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn ranges_longer_than_ten_years_are_rejected() {
    let app = spawn_app().await;
    let response = app
        .get("/reports/income-summary?from=0001-01-01&to=9999-12-31")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "to");
}
