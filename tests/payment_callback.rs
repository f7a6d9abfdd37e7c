//! Tests for the payment callback reconciliation flow.
//!
//! The callback endpoint is unauthenticated HTTP from the gateway; the
//! checksum is the only proof of origin. These tests exercise the full
//! decision table: status and signature jointly gate the success
//! transition, terminal states are idempotent, and entitlements apply
//! exactly once.

use axum::{body::Body, http::Request, http::StatusCode};
use chrono::Utc;
use tower::ServiceExt;

mod common;
use common::*;

/// INV + YYYYMMDD + zero-padded 6-digit payment id
fn assert_invoice_number_shape(invoice: &str) {
    assert!(invoice.starts_with("INV"), "bad prefix: {}", invoice);
    assert_eq!(invoice.len(), 3 + 8 + 6, "bad length: {}", invoice);
    assert!(
        invoice[3..].chars().all(|c| c.is_ascii_digit()),
        "non-digit in invoice: {}",
        invoice
    );
}

#[tokio::test]
async fn callback_unknown_order_returns_not_found() {
    let state = create_test_state();
    let app = app(state);

    let form = signed_callback_form("ORD-DOES-NOT-EXIST", "TXN1", "TXN_SUCCESS", TEST_MERCHANT_KEY);
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_missing_order_id_is_bad_request() {
    let state = create_test_state();
    let app = app(state);

    let mut form = std::collections::BTreeMap::new();
    form.insert("STATUS".to_string(), "TXN_SUCCESS".to_string());

    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verified_success_upgrades_plan_and_assigns_invoice() {
    let state = create_test_state();
    let order_id;
    let company_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment =
            queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
        company_id = company.id;
    }

    let before = Utc::now().timestamp();
    let app = app(state.clone());
    let form = signed_callback_form(&order_id, "TXN1001", "TXN_SUCCESS", TEST_MERCHANT_KEY);
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "success");
    let invoice = body["invoice_number"].as_str().expect("invoice missing");
    assert_invoice_number_shape(invoice);

    let conn = state.db.get().unwrap();
    let payment = get_payment(&conn, &order_id);
    assert_eq!(payment.status, PaymentStatus::Success);
    assert!(payment.checksum_verified);
    assert_eq!(payment.transaction_id.as_deref(), Some("TXN1001"));
    assert_eq!(payment.payment_mode.as_deref(), Some("UPI"));
    assert!(payment.completed_at.is_some());
    assert!(payment.gateway_response.is_some(), "raw callback not stored");

    let company = get_company(&conn, company_id);
    assert_eq!(company.plan, Plan::Basic);
    assert_eq!(company.cards_limit, 10);
    assert!(!company.white_label_enabled);

    let expiry = company.plan_expiry_date.expect("expiry not set");
    let expected = before + 30 * 86400;
    assert!(
        (expiry - expected).abs() <= 5,
        "expiry {} not ~{}",
        expiry,
        expected
    );
}

#[tokio::test]
async fn success_status_with_invalid_checksum_is_checksum_failed() {
    let state = create_test_state();
    let order_id;
    let company_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Pro, 4999.0).unwrap();
        order_id = payment.order_id;
        company_id = company.id;
    }

    // Signed under a different key: gateway status says success, but the
    // checksum does not verify. This must never upgrade the plan.
    let app = app(state.clone());
    let form = signed_callback_form(&order_id, "TXN-FORGED", "TXN_SUCCESS", "ffffffffffffffff");
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "checksum_failed");
    assert!(body.get("invoice_number").is_none());

    let conn = state.db.get().unwrap();
    let payment = get_payment(&conn, &order_id);
    assert_eq!(payment.status, PaymentStatus::ChecksumFailed);
    assert!(!payment.checksum_verified);
    assert!(payment.invoice_number.is_none());

    let company = get_company(&conn, company_id);
    assert_eq!(company.plan, Plan::Free, "forged callback upgraded the plan");
    assert_eq!(company.cards_limit, 2);
    assert!(!company.white_label_enabled);
    assert!(company.plan_expiry_date.is_none());
}

#[tokio::test]
async fn duplicate_success_callback_applies_entitlements_once() {
    let state = create_test_state();
    let order_id;
    let company_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
        company_id = company.id;
    }

    let form = signed_callback_form(&order_id, "TXN1001", "TXN_SUCCESS", TEST_MERCHANT_KEY);

    let first = app(state.clone())
        .oneshot(form_request("/payment/callback", &form))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = response_json(first).await;
    let invoice = first_body["invoice_number"].as_str().unwrap().to_string();

    let (expiry_after_first, completed_after_first) = {
        let conn = state.db.get().unwrap();
        (
            get_company(&conn, company_id).plan_expiry_date.unwrap(),
            get_payment(&conn, &order_id).completed_at.unwrap(),
        )
    };

    // Replay the exact same callback.
    let second = app(state.clone())
        .oneshot(form_request("/payment/callback", &form))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_body = response_json(second).await;
    assert_eq!(second_body["status"], "success");
    assert_eq!(second_body["message"], "Payment was already processed.");

    let conn = state.db.get().unwrap();
    let payment = get_payment(&conn, &order_id);
    assert_eq!(payment.invoice_number.as_deref(), Some(invoice.as_str()));
    assert_eq!(payment.completed_at, Some(completed_after_first));

    let company = get_company(&conn, company_id);
    assert_eq!(
        company.plan_expiry_date,
        Some(expiry_after_first),
        "replayed callback pushed the expiry forward"
    );
}

#[tokio::test]
async fn terminal_failed_state_is_not_overwritten_by_success() {
    let state = create_test_state();
    let order_id;
    let company_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
        company_id = company.id;
    }

    let failure = signed_callback_form(&order_id, "TXN1", "TXN_FAILURE", TEST_MERCHANT_KEY);
    app(state.clone())
        .oneshot(form_request("/payment/callback", &failure))
        .await
        .unwrap();

    // A later (possibly replayed) success for the same order must not
    // flip the terminal state or grant entitlements.
    let success = signed_callback_form(&order_id, "TXN2", "TXN_SUCCESS", TEST_MERCHANT_KEY);
    let response = app(state.clone())
        .oneshot(form_request("/payment/callback", &success))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "failed");

    let conn = state.db.get().unwrap();
    let payment = get_payment(&conn, &order_id);
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.invoice_number.is_none());
    assert_eq!(get_company(&conn, company_id).plan, Plan::Free);
}

#[tokio::test]
async fn failure_callback_marks_failed_without_entitlements() {
    let state = create_test_state();
    let order_id;
    let company_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
        company_id = company.id;
    }

    let app = app(state.clone());
    let form = signed_callback_form(&order_id, "TXN1", "TXN_FAILURE", TEST_MERCHANT_KEY);
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "failed");

    let conn = state.db.get().unwrap();
    assert_eq!(get_payment(&conn, &order_id).status, PaymentStatus::Failed);
    assert_eq!(get_company(&conn, company_id).plan, Plan::Free);
}

#[tokio::test]
async fn pending_callback_leaves_order_pending() {
    let state = create_test_state();
    let order_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
    }

    let app = app(state.clone());
    let form = signed_callback_form(&order_id, "TXN1", "PENDING", TEST_MERCHANT_KEY);
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "pending");

    let conn = state.db.get().unwrap();
    let payment = get_payment(&conn, &order_id);
    assert_eq!(payment.status, PaymentStatus::Pending);
    // Metadata is still recorded for audit
    assert_eq!(payment.transaction_id.as_deref(), Some("TXN1"));
}

#[tokio::test]
async fn unknown_status_with_valid_checksum_stays_pending() {
    let state = create_test_state();
    let order_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
    }

    let app = app(state.clone());
    let form = signed_callback_form(&order_id, "TXN1", "TXN_ON_HOLD", TEST_MERCHANT_KEY);
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Payment status unknown. Please contact support.");

    let conn = state.db.get().unwrap();
    assert_eq!(get_payment(&conn, &order_id).status, PaymentStatus::Pending);
}

#[tokio::test]
async fn unknown_status_with_invalid_checksum_is_checksum_failed() {
    let state = create_test_state();
    let order_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
    }

    let app = app(state.clone());
    let mut form = signed_callback_form(&order_id, "TXN1", "TXN_ON_HOLD", TEST_MERCHANT_KEY);
    form.insert("CHECKSUMHASH".to_string(), "garbage".to_string());
    let response = app.oneshot(form_request("/payment/callback", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "checksum_failed");

    let conn = state.db.get().unwrap();
    assert_eq!(
        get_payment(&conn, &order_id).status,
        PaymentStatus::ChecksumFailed
    );
}

#[tokio::test]
async fn end_to_end_initiate_then_callback() {
    let state = create_test_state();
    let company_id;

    {
        let conn = state.db.get().unwrap();
        company_id = create_test_company(&conn, "Acme Cards").id;
    }

    // 1. Initiate an upgrade to basic (499)
    let response = app(state.clone())
        .oneshot(json_request(
            "/payment/initiate",
            serde_json::json!({ "company_id": company_id, "plan": "basic" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    let order_id = body["order_id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("ORD"));
    assert!(body["txn_url"].as_str().unwrap().contains("securegw-stage"));

    let params = body["params"].as_object().unwrap();
    assert_eq!(params["TXN_AMOUNT"], "499");
    assert_eq!(params["MID"], "TESTMID001");
    assert_eq!(params["CUST_ID"], company_id.to_string());

    // The outbound bag carries a checksum our own verifier accepts
    let bag: std::collections::BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
        .collect();
    let signature = bag.get("CHECKSUMHASH").unwrap().clone();
    assert!(checksum::verify(&bag, TEST_MERCHANT_KEY, &signature));

    // 2. Order is pending in the ledger
    {
        let conn = state.db.get().unwrap();
        let payment = get_payment(&conn, &order_id);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 499.0);
        assert!(payment.invoice_number.is_none());
    }

    // 3. Gateway posts a verified success callback
    let before = Utc::now().timestamp();
    let form = signed_callback_form(&order_id, "TXN-E2E", "TXN_SUCCESS", TEST_MERCHANT_KEY);
    let response = app(state.clone())
        .oneshot(form_request("/payment/callback", &form))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "success");
    let invoice = body["invoice_number"].as_str().unwrap();
    assert_invoice_number_shape(invoice);

    // 4. Tenant is upgraded: basic, expiry ~now + 30 days
    let conn = state.db.get().unwrap();
    let company = get_company(&conn, company_id);
    assert_eq!(company.plan, Plan::Basic);
    let expiry = company.plan_expiry_date.unwrap();
    assert!((expiry - (before + 30 * 86400)).abs() <= 5);
}

#[tokio::test]
async fn initiate_rejects_free_and_unknown_plans() {
    let state = create_test_state();
    let company_id;
    {
        let conn = state.db.get().unwrap();
        company_id = create_test_company(&conn, "Acme Cards").id;
    }

    for plan in ["free", "enterprise"] {
        let response = app(state.clone())
            .oneshot(json_request(
                "/payment/initiate",
                serde_json::json!({ "company_id": company_id, "plan": plan }),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "plan {:?} should be rejected",
            plan
        );
    }
}

#[tokio::test]
async fn initiate_without_gateway_credentials_is_blocked_before_ledger_write() {
    let mut state = create_test_state();
    state.gateway.merchant_id = String::new();
    state.gateway.merchant_key = String::new();

    let company_id;
    {
        let conn = state.db.get().unwrap();
        company_id = create_test_company(&conn, "Acme Cards").id;
    }

    let response = app(state.clone())
        .oneshot(json_request(
            "/payment/initiate",
            serde_json::json!({ "company_id": company_id, "plan": "basic" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No dangling pending order was created
    let conn = state.db.get().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn invoice_endpoint_serves_successful_orders_only() {
    let state = create_test_state();
    let order_id;

    {
        let conn = state.db.get().unwrap();
        let company = create_test_company(&conn, "Acme Cards");
        let payment = queries::create_payment(&conn, company.id, Plan::Basic, 499.0).unwrap();
        order_id = payment.order_id;
    }

    // Pending order: 404
    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/payment/invoice/{}", order_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Settle it
    let form = signed_callback_form(&order_id, "TXN1", "TXN_SUCCESS", TEST_MERCHANT_KEY);
    app(state.clone())
        .oneshot(form_request("/payment/callback", &form))
        .await
        .unwrap();

    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/payment/invoice/{}", order_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["plan"], "basic");
    assert_eq!(body["plan_name"], "Basic");
    assert_eq!(body["company_name"], "Acme Cards");
    assert_invoice_number_shape(body["invoice_number"].as_str().unwrap());
}
