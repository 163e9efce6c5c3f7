//! Common test utilities for accounting-service integration tests.

use std::str::FromStr;
use std::sync::Once;

use accounting_service::auth::{Claims, TokenVerifier};
use accounting_service::config::{AccountingConfig, AuthConfig, DatabaseConfig};
use accounting_service::startup::Application;
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use uuid::Uuid;

static INIT: Once = Once::new();

const JWT_SECRET: &str = "integration-test-secret-with-32-bytes!";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,accounting_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config() -> AccountingConfig {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run integration tests");

    AccountingConfig {
        common: CommonConfig::ephemeral(),
        service_name: "accounting-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new(database_url),
            max_connections: 2,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: Secret::new(JWT_SECRET.to_string()),
        },
        base_currency: "USD".to_string(),
    }
}

/// Running service plus an admin token for a fresh company.
#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub company_id: Uuid,
    pub token: String,
}

/// Spawn the service on a random port with a unique company.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    // Migrations take an advisory lock, so concurrent tests can all build.
    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let client = Client::new();
    let mut attempts = 0;
    loop {
        match client.get(format!("{}/health", address)).send().await {
            Ok(_) => break,
            Err(_) if attempts < 20 => {
                attempts += 1;
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            }
            Err(e) => panic!("Service did not start after 20 attempts: {}", e),
        }
    }

    let company_id = Uuid::new_v4();
    let token = issue_token(company_id, "admin", &[]);
    TestApp {
        address,
        client,
        company_id,
        token,
    }
}

/// Sign a token for the company with the test secret.
pub fn issue_token(company_id: Uuid, role: &str, permissions: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        company_id,
        role: role.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: now + 3600,
        iat: now,
    };
    TokenVerifier::new(JWT_SECRET.as_bytes())
        .issue(&claims)
        .expect("Failed to sign token")
}

/// Parse a decimal the API rendered as a JSON string.
pub fn dec(value: &Value) -> Decimal {
    let text = value
        .as_str()
        .unwrap_or_else(|| panic!("expected a decimal string, got {}", value));
    Decimal::from_str(text).expect("invalid decimal")
}

pub fn d(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

#[allow(dead_code)]
impl TestApp {
    pub async fn get_with(&self, path: &str, token: &str) -> Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.get_with(path, &self.token).await
    }

    pub async fn post_with(&self, path: &str, body: &Value, token: &str) -> Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.post_with(path, body, &self.token).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// POST and return the created body, asserting 201.
    pub async fn create(&self, path: &str, body: Value) -> Value {
        let response = self.post(path, &body).await;
        let status = response.status();
        let body: Value = response.json().await.expect("Failed to read body");
        assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", path, body);
        body
    }

    pub async fn create_currency(&self, code: &str, rate: &str) -> Value {
        self.create(
            "/currencies",
            json!({ "name": code, "code": code, "rate": rate, "symbol": "$" }),
        )
        .await
    }

    pub async fn create_account(&self, currency_code: &str, opening_balance: &str) -> Value {
        self.create(
            "/accounts",
            json!({
                "name": format!("{} cash", currency_code),
                "account_type": "bank",
                "currency_code": currency_code,
                "opening_balance": opening_balance,
            }),
        )
        .await
    }

    pub async fn create_customer(&self, currency_code: &str) -> Value {
        self.create(
            "/contacts",
            json!({
                "contact_type": "customer",
                "name": "Acme Ltd",
                "email": "billing@acme.test",
                "currency_code": currency_code,
            }),
        )
        .await
    }

    pub async fn create_tax(&self, rate: &str) -> Value {
        self.create("/taxes", json!({ "name": format!("VAT {}%", rate), "rate": rate }))
            .await
    }

    /// Invoice with one line `quantity × price` under the given taxes.
    pub async fn create_invoice(
        &self,
        contact_id: &Value,
        number: &str,
        quantity: &str,
        price: &str,
        tax_ids: &[&Value],
    ) -> Value {
        self.create(
            "/documents",
            json!({
                "document_type": "invoice",
                "document_number": number,
                "issued_at": "2025-03-01",
                "due_at": "2025-03-31",
                "currency_code": "USD",
                "contact_id": contact_id,
                "items": [{
                    "name": "Consulting",
                    "quantity": quantity,
                    "price": price,
                    "tax_ids": tax_ids,
                }],
            }),
        )
        .await
    }
}
