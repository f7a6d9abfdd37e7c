//! Test utilities and fixtures for Cardbase integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};

pub use cardbase::checksum;
pub use cardbase::db::{init_db, queries, AppState};
pub use cardbase::models::*;
pub use cardbase::payment::{GatewayConfig, GatewayEnvironment};
pub use cardbase::plans::{self, Plan};

/// 16-byte merchant key for AES-128 (ONLY for testing)
pub const TEST_MERCHANT_KEY: &str = "0123456789abcdef";

pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: "TESTMID001".to_string(),
        merchant_key: TEST_MERCHANT_KEY.to_string(),
        website: "WEBSTAGING".to_string(),
        industry_type: "Retail".to_string(),
        channel_id: "WEB".to_string(),
        environment: GatewayEnvironment::Staging,
    }
}

/// Create app state backed by an in-memory database.
/// Pool size 1 so every handle sees the same in-memory database.
pub fn create_test_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to create test pool");
    {
        let conn = pool.get().expect("Failed to get test connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    AppState {
        db: pool,
        base_url: "http://localhost:3000".to_string(),
        gateway: test_gateway_config(),
    }
}

/// Route tree without rate limiting (no connect info in oneshot tests).
pub fn app(state: AppState) -> Router {
    cardbase::handlers::routes().with_state(state)
}

/// Same route tree with the per-request plan expiry sweep attached.
pub fn app_with_expiry_sweep(state: AppState) -> Router {
    cardbase::handlers::routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cardbase::middleware::sweep_expired_plans,
        ))
        .with_state(state)
}

pub fn create_test_company(conn: &Connection, name: &str) -> Company {
    let slug = name.to_lowercase().replace(' ', "-");
    queries::create_company(
        conn,
        &CreateCompany {
            name: name.to_string(),
            slug,
            email: Some("admin@example.com".to_string()),
            phone: Some("9876543210".to_string()),
        },
    )
    .expect("Failed to create test company")
}

/// Force a company's plan state directly, bypassing the applier.
pub fn set_company_plan(
    conn: &Connection,
    company_id: i64,
    plan: &str,
    expiry: Option<i64>,
    cards_limit: i64,
    white_label: bool,
) {
    conn.execute(
        "UPDATE companies SET plan = ?1, plan_expiry_date = ?2, cards_limit = ?3, white_label_enabled = ?4
         WHERE id = ?5",
        params![plan, expiry, cards_limit, white_label as i64, company_id],
    )
    .expect("Failed to set company plan");
}

pub fn get_company(conn: &Connection, company_id: i64) -> Company {
    queries::get_company_by_id(conn, company_id)
        .expect("Failed to query company")
        .expect("Company not found")
}

pub fn get_payment(conn: &Connection, order_id: &str) -> Payment {
    queries::get_payment_by_order_id(conn, order_id)
        .expect("Failed to query payment")
        .expect("Payment not found")
}

/// Build a gateway callback form with a valid checksum for `key`.
pub fn signed_callback_form(
    order_id: &str,
    txn_id: &str,
    status: &str,
    key: &str,
) -> BTreeMap<String, String> {
    let mut form = BTreeMap::new();
    form.insert("ORDERID".to_string(), order_id.to_string());
    form.insert("TXNID".to_string(), txn_id.to_string());
    form.insert("STATUS".to_string(), status.to_string());
    form.insert("PAYMENTMODE".to_string(), "UPI".to_string());
    form.insert("BANKNAME".to_string(), "Test Bank".to_string());
    form.insert("BANKTXNID".to_string(), "BTXN123".to_string());

    let signature = checksum::sign(&form, key).expect("Failed to sign callback form");
    form.insert(checksum::SIGNATURE_FIELD.to_string(), signature);
    form
}

/// Encode a parameter bag as a urlencoded form body.
pub fn form_body(form: &BTreeMap<String, String>) -> String {
    form.iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build a form POST request.
pub fn form_request(uri: &str, form: &BTreeMap<String, String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_body(form)))
        .unwrap()
}

/// Build a JSON POST request.
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}
