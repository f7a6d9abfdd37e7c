//! Callback reconciliation: the payment state machine.
//!
//! A callback is untrusted HTTP from the public internet. It may be
//! forged, replayed, duplicated, or arrive for an order that already
//! settled. Reconciliation therefore:
//!
//! 1. extracts a typed view of the form and looks the order up,
//! 2. verifies the checksum over the full parameter bag,
//! 3. persists transaction id / bank metadata / the raw form
//!    unconditionally (the audit trail is append-like),
//! 4. refuses to move an order out of a terminal state, and
//! 5. gates the success transition on gateway status AND a valid
//!    signature jointly - a TXN_SUCCESS report with a bad checksum
//!    lands in `checksum_failed`, never in `success`.
//!
//! Steps run inside a single immediate transaction so two concurrent
//! callbacks for one order serialize on the write lock before either
//! reads the status; the entitlement upgrade applies at most once.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};

use crate::checksum;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{CallbackParams, PaymentStatus};
use crate::payment::GatewayConfig;
use crate::plans;

/// Gateway status code for a settled, successful transaction.
pub const TXN_SUCCESS: &str = "TXN_SUCCESS";
/// Gateway status code for a failed transaction.
pub const TXN_FAILURE: &str = "TXN_FAILURE";
/// Gateway status code for a transaction still in flight.
pub const TXN_PENDING: &str = "PENDING";

/// Outcome of reconciling one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Verified success: status moved to `success`, entitlements applied.
    Success { invoice_number: String },
    /// Gateway reported failure; signature validity is irrelevant.
    Failed,
    /// Gateway reports the transaction still in flight; no transition.
    Pending,
    /// Unrecognized status with an invalid signature.
    ChecksumFailed,
    /// Unrecognized status but a valid signature; left pending.
    Unknown,
    /// The order was already in a terminal state; callback recorded for
    /// audit only.
    AlreadyProcessed { status: PaymentStatus },
}

impl ReconciliationOutcome {
    /// Resulting (or unchanged) payment status, for responses.
    pub fn status(&self) -> PaymentStatus {
        match self {
            Self::Success { .. } => PaymentStatus::Success,
            Self::Failed => PaymentStatus::Failed,
            Self::ChecksumFailed => PaymentStatus::ChecksumFailed,
            Self::Pending | Self::Unknown => PaymentStatus::Pending,
            Self::AlreadyProcessed { status } => *status,
        }
    }

    /// User-facing message for the redirect target.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success { .. } => "Payment successful! Your plan has been upgraded.",
            Self::Failed => "Payment failed. Please try again.",
            Self::Pending => "Payment is pending. We will update you once confirmed.",
            Self::ChecksumFailed => "Payment verification failed. Please contact support.",
            Self::Unknown => "Payment status unknown. Please contact support.",
            Self::AlreadyProcessed { .. } => "Payment was already processed.",
        }
    }
}

/// Reconcile an inbound gateway callback against the order ledger.
///
/// Returns `NotFound` if the callback references an unknown order id;
/// nothing is written in that case. All writes for a callback commit
/// atomically or not at all.
pub fn handle_callback(
    conn: &mut Connection,
    gateway: &GatewayConfig,
    raw: &BTreeMap<String, String>,
) -> Result<ReconciliationOutcome> {
    let callback = CallbackParams::from_form(raw)?;

    // Verification is over the full bag (the codec excludes the
    // signature field itself). A missing checksum is simply invalid.
    let verified = match callback.checksum.as_deref() {
        Some(signature) => checksum::verify(raw, &gateway.merchant_key, signature),
        None => false,
    };

    let raw_response = serde_json::to_string(raw)?;

    // Immediate transaction: take the write lock before reading the
    // status so concurrent callbacks for the same order serialize.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let payment = queries::get_payment_by_order_id(&tx, &callback.order_id)?
        .ok_or_else(|| AppError::NotFound("Payment record not found".into()))?;

    queries::record_callback_metadata(&tx, &payment.order_id, &callback, verified, &raw_response)?;

    if payment.status.is_terminal() {
        tx.commit()?;
        tracing::info!(
            order_id = %payment.order_id,
            status = %payment.status,
            "duplicate callback for settled order, recorded for audit only"
        );
        return Ok(ReconciliationOutcome::AlreadyProcessed {
            status: payment.status,
        });
    }

    let now = Utc::now();
    let outcome = match (callback.status.as_deref(), verified) {
        (Some(TXN_SUCCESS), true) => {
            let invoice_number = format!("INV{}{:06}", now.format("%Y%m%d"), payment.id);
            queries::mark_payment_success(
                &tx,
                &payment.order_id,
                &invoice_number,
                now.timestamp(),
            )?;

            // The catalog's leniency policy applies: an unknown plan
            // string resolves to the free entitlements. Unreachable in
            // practice since initiation validates the plan.
            let (plan, _) = plans::lookup(&payment.plan);
            queries::apply_plan_entitlements(&tx, payment.company_id, plan, now.timestamp())?;

            ReconciliationOutcome::Success { invoice_number }
        }
        (Some(TXN_FAILURE), _) => {
            queries::mark_payment_status(&tx, &payment.order_id, PaymentStatus::Failed)?;
            ReconciliationOutcome::Failed
        }
        (Some(TXN_PENDING), _) => ReconciliationOutcome::Pending,
        (_, false) => {
            queries::mark_payment_status(&tx, &payment.order_id, PaymentStatus::ChecksumFailed)?;
            ReconciliationOutcome::ChecksumFailed
        }
        (_, true) => ReconciliationOutcome::Unknown,
    };

    tx.commit()?;

    tracing::info!(
        order_id = %callback.order_id,
        gateway_status = callback.status.as_deref().unwrap_or("-"),
        checksum_verified = verified,
        outcome = %outcome.status(),
        "callback reconciled"
    );

    Ok(outcome)
}
