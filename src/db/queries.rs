use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::checksum::hash_secret;
use crate::error::Result;
use crate::models::*;
use crate::plans::{self, Plan};

use super::from_row::{query_all, query_one, API_KEY_COLS, COMPANY_COLS, LEAD_COLS, PAYMENT_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_uid() -> String {
    Uuid::new_v4().to_string()
}

// ============ Companies ============

/// Create a company on the free plan. Entitlement columns start at the
/// catalog's free-tier values.
pub fn create_company(conn: &Connection, input: &CreateCompany) -> Result<Company> {
    let uid = gen_uid();
    let now = now();
    let free = plans::get(Plan::Free);

    conn.execute(
        "INSERT INTO companies (uid, name, slug, email, phone, plan, cards_limit, white_label_enabled, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'free', ?6, ?7, ?8)",
        params![
            &uid,
            &input.name,
            &input.slug,
            &input.email,
            &input.phone,
            free.cards_limit,
            free.white_label as i64,
            now
        ],
    )?;

    Ok(Company {
        id: conn.last_insert_rowid(),
        uid,
        name: input.name.clone(),
        slug: input.slug.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        plan: Plan::Free,
        plan_expiry_date: None,
        cards_limit: free.cards_limit,
        white_label_enabled: free.white_label,
        is_active: true,
        created_at: now,
    })
}

pub fn get_company_by_id(conn: &Connection, id: i64) -> Result<Option<Company>> {
    query_one(
        conn,
        &format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLS),
        &[&id],
    )
}

/// Set a company's plan state to the catalog entitlements for `plan`,
/// with expiry at `base_time` plus the plan's validity window.
///
/// This is a pure "set to X" - callers guarantee at-most-once semantics.
pub fn apply_plan_entitlements(
    conn: &Connection,
    company_id: i64,
    plan: Plan,
    base_time: i64,
) -> Result<bool> {
    let ent = plans::get(plan);
    let expiry = base_time + ent.days * 86400;
    let updated = conn.execute(
        "UPDATE companies SET plan = ?1, plan_expiry_date = ?2, cards_limit = ?3, white_label_enabled = ?4
         WHERE id = ?5",
        params![plan.as_str(), expiry, ent.cards_limit, ent.white_label as i64, company_id],
    )?;
    Ok(updated > 0)
}

/// Downgrade every company whose paid plan lapsed before `now` to the
/// free tier. One bulk statement; the free-tier values come from the
/// same catalog entry the rest of the system reads.
pub fn downgrade_expired_plans(conn: &Connection, now: i64) -> Result<usize> {
    let free = plans::get(Plan::Free);
    let updated = conn.execute(
        "UPDATE companies SET plan = 'free', cards_limit = ?1, white_label_enabled = ?2
         WHERE plan != 'free' AND plan_expiry_date IS NOT NULL AND plan_expiry_date < ?3",
        params![free.cards_limit, free.white_label as i64, now],
    )?;
    Ok(updated)
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let uid = gen_uid();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (uid, username, email, role, company_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &uid,
            &input.username,
            &email,
            input.role.as_str(),
            input.company_id,
            now
        ],
    )?;

    Ok(User {
        id: conn.last_insert_rowid(),
        uid,
        username: input.username.clone(),
        email,
        role: input.role,
        company_id: input.company_id,
        is_active: true,
        created_at: now,
    })
}

// ============ Payments (order ledger) ============

/// Build a globally unique order id: timestamp + tenant id + 6 random
/// uppercase hex characters. Collisions are practically impossible and
/// would surface as the unique-constraint violation they are.
fn generate_order_id(company_id: i64) -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("ORD{}{}{}", stamp, company_id, suffix)
}

/// Insert a pending payment record for one attempted plan purchase.
pub fn create_payment(
    conn: &Connection,
    company_id: i64,
    plan: Plan,
    amount: f64,
) -> Result<Payment> {
    let uid = gen_uid();
    let order_id = generate_order_id(company_id);
    let now = now();

    conn.execute(
        "INSERT INTO payments (uid, company_id, order_id, amount, plan, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![&uid, company_id, &order_id, amount, plan.as_str(), now],
    )?;

    Ok(Payment {
        id: conn.last_insert_rowid(),
        uid,
        company_id,
        order_id,
        transaction_id: None,
        amount,
        currency: "INR".to_string(),
        plan: plan.as_str().to_string(),
        status: PaymentStatus::Pending,
        payment_mode: None,
        bank_name: None,
        bank_txn_id: None,
        checksum_verified: false,
        gateway_response: None,
        invoice_number: None,
        created_at: now,
        completed_at: None,
    })
}

pub fn get_payment_by_order_id(conn: &Connection, order_id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE order_id = ?1", PAYMENT_COLS),
        &[&order_id],
    )
}

/// Look up a payment that reached `success`, for invoice views.
pub fn get_successful_payment(conn: &Connection, order_id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE order_id = ?1 AND status = 'success'",
            PAYMENT_COLS
        ),
        &[&order_id],
    )
}

/// Persist callback metadata onto the payment record. This runs for
/// every callback - including duplicates for settled payments - so the
/// audit trail always holds the latest raw gateway response.
pub fn record_callback_metadata(
    conn: &Connection,
    order_id: &str,
    callback: &CallbackParams,
    checksum_verified: bool,
    raw_response: &str,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE payments SET transaction_id = ?1, gateway_response = ?2, checksum_verified = ?3,
         payment_mode = ?4, bank_name = ?5, bank_txn_id = ?6
         WHERE order_id = ?7",
        params![
            &callback.transaction_id,
            raw_response,
            checksum_verified as i64,
            &callback.payment_mode,
            &callback.bank_name,
            &callback.bank_txn_id,
            order_id
        ],
    )?;
    Ok(updated > 0)
}

/// Transition a pending payment to `success` with its invoice number
/// and completion time.
pub fn mark_payment_success(
    conn: &Connection,
    order_id: &str,
    invoice_number: &str,
    completed_at: i64,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE payments SET status = 'success', completed_at = ?1, invoice_number = ?2
         WHERE order_id = ?3 AND status = 'pending'",
        params![completed_at, invoice_number, order_id],
    )?;
    Ok(updated > 0)
}

/// Transition a pending payment to a non-success terminal state.
pub fn mark_payment_status(
    conn: &Connection,
    order_id: &str,
    status: PaymentStatus,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE payments SET status = ?1 WHERE order_id = ?2 AND status = 'pending'",
        params![status.as_str(), order_id],
    )?;
    Ok(updated > 0)
}

// ============ Leads ============

pub fn create_lead(
    conn: &Connection,
    company_id: i64,
    input: &CreateLead,
    source: &str,
    ip_address: Option<&str>,
) -> Result<Lead> {
    let uid = gen_uid();
    let now = now();
    let name = input
        .name
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let email = input
        .email
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let remarks = input
        .remarks
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    conn.execute(
        "INSERT INTO leads (uid, name, phone, email, source, ip_address, company_id, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &uid,
            &name,
            input.phone.trim(),
            &email,
            source,
            ip_address,
            company_id,
            &remarks,
            now
        ],
    )?;

    Ok(Lead {
        id: conn.last_insert_rowid(),
        uid,
        name,
        phone: input.phone.trim().to_string(),
        email,
        source: source.to_string(),
        ip_address: ip_address.map(String::from),
        company_id,
        assigned_to: None,
        status: LeadStatus::New,
        remarks,
        created_at: now,
    })
}

pub fn list_leads_paginated(
    conn: &Connection,
    company_id: i64,
    source: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Lead>, i64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE company_id = ?1",
        params![company_id],
        |row| row.get(0),
    )?;

    let leads = match source {
        Some(source) => query_all(
            conn,
            &format!(
                "SELECT {} FROM leads WHERE company_id = ?1 AND source = ?2
                 ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
                LEAD_COLS
            ),
            &[&company_id, &source, &limit, &offset],
        )?,
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM leads WHERE company_id = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                LEAD_COLS
            ),
            &[&company_id, &limit, &offset],
        )?,
    };

    Ok((leads, total))
}

// ============ API keys ============

/// Generate a new raw API key: prefix plus 32 random alphanumerics.
pub fn generate_api_key() -> String {
    use rand::Rng;
    let secret: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("ck_{}", secret)
}

/// Create an ingestion key for a company. Returns the record and the
/// raw key - the only time the raw key is available.
pub fn create_api_key(
    conn: &Connection,
    company_id: i64,
    input: &CreateApiKey,
) -> Result<(ApiKey, String)> {
    let raw = generate_api_key();
    let key_hash = hash_secret(&raw);
    let key_prefix = raw[..10.min(raw.len())].to_string();
    let now = now();

    conn.execute(
        "INSERT INTO api_keys (company_id, key_prefix, key_hash, name, source_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            company_id,
            &key_prefix,
            &key_hash,
            &input.name,
            &input.source_type,
            now
        ],
    )?;

    let key = ApiKey {
        id: conn.last_insert_rowid(),
        company_id,
        key_prefix,
        key_hash,
        name: input.name.clone(),
        source_type: input.source_type.clone(),
        is_active: true,
        created_at: now,
        last_used: None,
        usage_count: 0,
    };

    Ok((key, raw))
}

/// Look up an active key by its raw secret (hash comparison in SQL).
pub fn find_active_api_key(conn: &Connection, raw_key: &str) -> Result<Option<ApiKey>> {
    let key_hash = hash_secret(raw_key);
    query_one(
        conn,
        &format!(
            "SELECT {} FROM api_keys WHERE key_hash = ?1 AND is_active = 1",
            API_KEY_COLS
        ),
        &[&key_hash],
    )
}

/// Record a use of the key.
pub fn touch_api_key(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE api_keys SET last_used = ?1, usage_count = usage_count + 1 WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}
