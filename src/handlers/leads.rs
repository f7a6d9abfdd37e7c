//! Lead ingestion API.
//!
//! External sources (landing pages, ad-platform connectors) push leads
//! through this surface with a tenant-scoped API key. Adapters only
//! produce `Lead` records; nothing here touches payment state.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{ApiKey, Company, CreateLead, Lead};
use crate::util::client_ip;

/// Resolve the `X-API-Key` header to an active key and its company.
fn authenticate(
    conn: &rusqlite::Connection,
    headers: &HeaderMap,
) -> Result<(ApiKey, Company)> {
    let raw_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("API key required".into()))?;

    let key = queries::find_active_api_key(conn, raw_key)?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".into()))?;

    let company = queries::get_company_by_id(conn, key.company_id)?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::Forbidden("Company not active".into()))?;

    queries::touch_api_key(conn, key.id)?;

    Ok((key, company))
}

#[derive(Debug, Serialize)]
pub struct CreateLeadResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub lead_id: String,
    pub phone: String,
    pub source: String,
    pub created_at: i64,
}

pub async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateLead>,
) -> Result<(StatusCode, Json<CreateLeadResponse>)> {
    let conn = state.db.get()?;
    let (key, company) = authenticate(&conn, &headers)?;

    if input.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Phone number is required".into()));
    }

    // Explicit source wins, then the key's configured source type.
    let source = input
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(key.source_type.as_deref())
        .unwrap_or("api")
        .to_string();

    let ip = client_ip(&headers);
    let lead = queries::create_lead(&conn, company.id, &input, &source, ip.as_deref())?;

    tracing::info!(
        company_id = company.id,
        lead_uid = %lead.uid,
        source = %lead.source,
        "lead created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateLeadResponse {
            status: "success",
            message: "Lead created successfully",
            lead_id: lead.uid,
            phone: lead.phone,
            source: lead.source,
            created_at: lead.created_at,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    #[serde(default)]
    pub source: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

pub async fn list_leads(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<LeadListResponse>> {
    let conn = state.db.get()?;
    let (_, company) = authenticate(&conn, &headers)?;

    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (leads, total) = queries::list_leads_paginated(
        &conn,
        company.id,
        query.source.as_deref().filter(|s| !s.is_empty()),
        per_page,
        offset,
    )?;

    Ok(Json(LeadListResponse {
        leads,
        pagination: Pagination {
            page,
            per_page,
            total,
            pages: (total + per_page - 1) / per_page,
        },
    }))
}
