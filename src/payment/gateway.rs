//! Payment gateway configuration and outbound parameter building.
//!
//! The gateway integration is form-post based: we hand the browser a
//! signed parameter bag and the gateway's transaction URL, and the
//! gateway later posts a callback to us. Staging and production differ
//! in base URL, and staging always uses the fixed WEBSTAGING website
//! identifier.

use std::collections::BTreeMap;
use std::env;

use crate::checksum;
use crate::error::{AppError, Result};
use crate::models::{Company, Payment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    pub website: String,
    pub industry_type: String,
    pub channel_id: String,
    pub environment: GatewayEnvironment,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("PAYTM_ENVIRONMENT").as_deref() {
            Ok("production") => GatewayEnvironment::Production,
            _ => GatewayEnvironment::Staging,
        };

        Self {
            merchant_id: env::var("PAYTM_MERCHANT_ID").unwrap_or_default(),
            merchant_key: env::var("PAYTM_MERCHANT_KEY").unwrap_or_default(),
            website: env::var("PAYTM_WEBSITE").unwrap_or_else(|_| "WEBSTAGING".to_string()),
            industry_type: env::var("PAYTM_INDUSTRY_TYPE").unwrap_or_else(|_| "Retail".to_string()),
            channel_id: env::var("PAYTM_CHANNEL_ID").unwrap_or_else(|_| "WEB".to_string()),
            environment,
        }
    }

    /// Both credentials must be present before any order is created.
    pub fn is_configured(&self) -> bool {
        !self.merchant_id.is_empty() && !self.merchant_key.is_empty()
    }

    pub fn txn_url(&self) -> &'static str {
        match self.environment {
            GatewayEnvironment::Production => "https://securegw.paytm.in/order/process",
            GatewayEnvironment::Staging => "https://securegw-stage.paytm.in/order/process",
        }
    }

    /// Staging ignores the configured website identifier.
    pub fn effective_website(&self) -> &str {
        match self.environment {
            GatewayEnvironment::Production => &self.website,
            GatewayEnvironment::Staging => "WEBSTAGING",
        }
    }
}

/// Build the signed parameter bag for the gateway's transaction form.
///
/// Amount is formatted without a currency symbol; trailing zero decimals
/// are dropped (499, not 499.00) to match what the gateway's signer
/// expects to re-canonicalize.
pub fn build_transaction_params(
    config: &GatewayConfig,
    payment: &Payment,
    company: &Company,
    callback_url: &str,
) -> Result<BTreeMap<String, String>> {
    let email = company
        .email
        .clone()
        .ok_or_else(|| AppError::BadRequest("Company has no contact email".into()))?;

    let mut params = BTreeMap::new();
    params.insert("MID".to_string(), config.merchant_id.clone());
    params.insert("ORDER_ID".to_string(), payment.order_id.clone());
    params.insert("TXN_AMOUNT".to_string(), format_amount(payment.amount));
    params.insert("CUST_ID".to_string(), company.id.to_string());
    params.insert(
        "INDUSTRY_TYPE_ID".to_string(),
        config.industry_type.clone(),
    );
    params.insert("WEBSITE".to_string(), config.effective_website().to_string());
    params.insert("CHANNEL_ID".to_string(), config.channel_id.clone());
    params.insert("CALLBACK_URL".to_string(), callback_url.to_string());
    params.insert("EMAIL".to_string(), email);
    params.insert(
        "MOBILE_NO".to_string(),
        company.phone.clone().unwrap_or_default(),
    );

    let signature = checksum::sign(&params, &config.merchant_key)?;
    params.insert(checksum::SIGNATURE_FIELD.to_string(), signature);

    Ok(params)
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}
