use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Lifecycle state of a payment. `Pending` is the only non-terminal
/// state; a record moves into exactly one of the other three and stays
/// there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    ChecksumFailed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::ChecksumFailed => "checksum_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "checksum_failed" => Ok(Self::ChecksumFailed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attempted plan purchase.
///
/// `order_id` is globally unique and immutable for the record's
/// lifetime; `invoice_number` is set if and only if the payment reached
/// `success`. `gateway_response` holds the raw callback form verbatim
/// for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub uid: String,
    pub company_id: i64,
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub plan: String,
    pub status: PaymentStatus,
    pub payment_mode: Option<String>,
    pub bank_name: Option<String>,
    pub bank_txn_id: Option<String>,
    pub checksum_verified: bool,
    pub gateway_response: Option<String>,
    pub invoice_number: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Typed view of the gateway's callback form, extracted at the boundary.
/// Everything except the order id is optional; the raw form is kept
/// alongside for signature verification and audit.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub checksum: Option<String>,
    pub payment_mode: Option<String>,
    pub bank_name: Option<String>,
    pub bank_txn_id: Option<String>,
}

impl CallbackParams {
    /// Validate and extract the known fields from a raw callback form.
    pub fn from_form(form: &BTreeMap<String, String>) -> Result<Self> {
        let order_id = form
            .get("ORDERID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing ORDERID in callback".into()))?;

        let field = |name: &str| {
            form.get(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Ok(Self {
            order_id,
            transaction_id: field("TXNID"),
            status: field("STATUS"),
            checksum: field("CHECKSUMHASH"),
            payment_mode: field("PAYMENTMODE"),
            bank_name: field("BANKNAME"),
            bank_txn_id: field("BANKTXNID"),
        })
    }
}
