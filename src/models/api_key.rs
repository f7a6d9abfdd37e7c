use serde::{Deserialize, Serialize};

/// A tenant-scoped ingestion key. Only the SHA-256 hash of the secret
/// is stored; the raw key is shown once at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub company_id: i64,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub name: Option<String>,
    /// Default lead source recorded for leads arriving through this key.
    pub source_type: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub last_used: Option<i64>,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKey {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
}
