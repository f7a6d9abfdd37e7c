use serde::{Deserialize, Serialize};

/// Role of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    MasterAdmin,
    CompanyAdmin,
    SalesPerson,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MasterAdmin => "master_admin",
            Self::CompanyAdmin => "company_admin",
            Self::SalesPerson => "sales_person",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master_admin" => Ok(Self::MasterAdmin),
            "company_admin" => Ok(Self::CompanyAdmin),
            "sales_person" => Ok(Self::SalesPerson),
            _ => Err(()),
        }
    }
}

/// A platform user: the master operator, a tenant admin, or a sales
/// person. Authentication itself is out of scope; users exist so leads
/// can be assigned and sales staff counted per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub uid: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub company_id: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub company_id: Option<i64>,
}
