use serde::{Deserialize, Serialize};

use crate::plans::Plan;

/// A tenant account. Plan state (`plan`, `plan_expiry_date`,
/// `cards_limit`, `white_label_enabled`) is derived from the plan
/// catalog and only ever mutated by the entitlement applier and the
/// expiry sweep - never by payment initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub plan: Plan,
    pub plan_expiry_date: Option<i64>,
    pub cards_limit: i64,
    pub white_label_enabled: bool,
    pub is_active: bool,
    pub created_at: i64,
}

/// Data required to create a new company
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
