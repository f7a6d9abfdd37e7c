use std::collections::BTreeMap;

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Form, Json, Path};
use crate::models::PaymentStatus;
use crate::payment::{build_transaction_params, handle_callback, ReconciliationOutcome};
use crate::plans::{self, Plan};

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub company_id: i64,
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub order_id: String,
    /// Gateway endpoint the signed form must be posted to.
    pub txn_url: String,
    /// Signed parameter bag for the auto-submit form, including the
    /// checksum field.
    pub params: BTreeMap<String, String>,
}

/// Start a plan purchase: create a pending ledger entry and hand back
/// the signed gateway form.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiateRequest>,
) -> Result<Json<InitiateResponse>> {
    // Misconfiguration is a blocking error before any ledger write.
    if !state.gateway.is_configured() {
        return Err(AppError::BadRequest(
            "Payment gateway not configured. Please contact admin.".into(),
        ));
    }

    let plan = request
        .plan
        .parse::<Plan>()
        .ok()
        .filter(|p| *p != Plan::Free)
        .ok_or_else(|| AppError::BadRequest("Invalid plan selected".into()))?;

    let conn = state.db.get()?;

    let company = queries::get_company_by_id(&conn, request.company_id)?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))?;

    let entitlements = plans::get(plan);
    let payment = queries::create_payment(&conn, company.id, plan, entitlements.price)?;

    let callback_url = format!("{}/payment/callback", state.base_url);
    let params = build_transaction_params(&state.gateway, &payment, &company, &callback_url)?;

    tracing::info!(
        order_id = %payment.order_id,
        company_id = company.id,
        plan = %plan,
        amount = payment.amount,
        "payment initiated"
    );

    Ok(Json(InitiateResponse {
        order_id: payment.order_id,
        txn_url: state.gateway.txn_url().to_string(),
        params,
    }))
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub order_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    pub message: &'static str,
}

/// Inbound callback from the payment gateway. Unauthenticated beyond
/// the embedded checksum; reachable from the public internet.
pub async fn payment_callback(
    State(state): State<AppState>,
    Form(raw): Form<BTreeMap<String, String>>,
) -> Result<Json<CallbackResponse>> {
    let order_id = raw.get("ORDERID").cloned().unwrap_or_default();

    let mut conn = state.db.get()?;
    let outcome = handle_callback(&mut conn, &state.gateway, &raw)?;

    let invoice_number = match &outcome {
        ReconciliationOutcome::Success { invoice_number } => Some(invoice_number.clone()),
        _ => None,
    };

    Ok(Json(CallbackResponse {
        order_id,
        status: outcome.status(),
        invoice_number,
        message: outcome.message(),
    }))
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice_number: String,
    pub order_id: String,
    pub company_name: String,
    pub plan: String,
    pub plan_name: &'static str,
    pub amount: f64,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub payment_mode: Option<String>,
    pub completed_at: Option<i64>,
}

/// Invoice view of a successful payment. Non-existent, pending, and
/// unsuccessful orders are all a 404.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<InvoiceResponse>> {
    let conn = state.db.get()?;

    let payment = queries::get_successful_payment(&conn, &order_id)?
        .ok_or_else(|| AppError::NotFound("Payment record not found".into()))?;

    let company = queries::get_company_by_id(&conn, payment.company_id)?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))?;

    let (_, entitlements) = plans::lookup(&payment.plan);
    let invoice_number = payment
        .invoice_number
        .clone()
        .ok_or_else(|| AppError::Internal("Successful payment missing invoice number".into()))?;

    Ok(Json(InvoiceResponse {
        invoice_number,
        order_id: payment.order_id,
        company_name: company.name,
        plan: payment.plan,
        plan_name: entitlements.name,
        amount: payment.amount,
        currency: payment.currency,
        transaction_id: payment.transaction_id,
        payment_mode: payment.payment_mode,
        completed_at: payment.completed_at,
    }))
}
