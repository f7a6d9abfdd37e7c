use serde::{Deserialize, Serialize};

/// Pipeline state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    FollowUp,
    Interested,
    Converted,
    Closed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::FollowUp => "follow_up",
            Self::Interested => "interested",
            Self::Converted => "converted",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "follow_up" => Ok(Self::FollowUp),
            "interested" => Ok(Self::Interested),
            "converted" => Ok(Self::Converted),
            "closed" => Ok(Self::Closed),
            _ => Err(()),
        }
    }
}

/// An inbound sales lead, scoped to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub uid: String,
    pub name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub ip_address: Option<String>,
    pub company_id: i64,
    pub assigned_to: Option<i64>,
    pub status: LeadStatus,
    pub remarks: Option<String>,
    pub created_at: i64,
}

/// Payload accepted by the lead-ingestion webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLead {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}
