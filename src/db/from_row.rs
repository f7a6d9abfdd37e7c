//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const COMPANY_COLS: &str = "id, uid, name, slug, email, phone, plan, plan_expiry_date, cards_limit, white_label_enabled, is_active, created_at";

pub const PAYMENT_COLS: &str = "id, uid, company_id, order_id, transaction_id, amount, currency, plan, status, payment_mode, bank_name, bank_txn_id, checksum_verified, gateway_response, invoice_number, created_at, completed_at";

pub const LEAD_COLS: &str = "id, uid, name, phone, email, source, ip_address, company_id, assigned_to, status, remarks, created_at";

pub const API_KEY_COLS: &str = "id, company_id, key_prefix, key_hash, name, source_type, is_active, created_at, last_used, usage_count";

// ============ FromRow Implementations ============

impl FromRow for Company {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Company {
            id: row.get(0)?,
            uid: row.get(1)?,
            name: row.get(2)?,
            slug: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            plan: parse_enum(row, 6, "plan")?,
            plan_expiry_date: row.get(7)?,
            cards_limit: row.get(8)?,
            white_label_enabled: row.get::<_, i32>(9)? != 0,
            is_active: row.get::<_, i32>(10)? != 0,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            id: row.get(0)?,
            uid: row.get(1)?,
            company_id: row.get(2)?,
            order_id: row.get(3)?,
            transaction_id: row.get(4)?,
            amount: row.get(5)?,
            currency: row.get(6)?,
            plan: row.get(7)?,
            status: parse_enum(row, 8, "status")?,
            payment_mode: row.get(9)?,
            bank_name: row.get(10)?,
            bank_txn_id: row.get(11)?,
            checksum_verified: row.get::<_, i32>(12)? != 0,
            gateway_response: row.get(13)?,
            invoice_number: row.get(14)?,
            created_at: row.get(15)?,
            completed_at: row.get(16)?,
        })
    }
}

impl FromRow for Lead {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Lead {
            id: row.get(0)?,
            uid: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            source: row.get(5)?,
            ip_address: row.get(6)?,
            company_id: row.get(7)?,
            assigned_to: row.get(8)?,
            status: parse_enum(row, 9, "status")?,
            remarks: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for ApiKey {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ApiKey {
            id: row.get(0)?,
            company_id: row.get(1)?,
            key_prefix: row.get(2)?,
            key_hash: row.get(3)?,
            name: row.get(4)?,
            source_type: row.get(5)?,
            is_active: row.get::<_, i32>(6)? != 0,
            created_at: row.get(7)?,
            last_used: row.get(8)?,
            usage_count: row.get(9)?,
        })
    }
}
