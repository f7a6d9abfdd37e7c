//! Plan catalog: the static mapping from plan tier to entitlements.
//!
//! Loaded once as compile-time constants. The expiry sweep and the
//! unknown-plan fallback both read the same `FREE` entry, so the
//! free-tier limits have a single source of truth.

use serde::{Deserialize, Serialize};

/// A subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Basic,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a plan grants: validity window, price, card limit, branding.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanEntitlements {
    pub name: &'static str,
    /// Validity in days from the moment of activation.
    pub days: i64,
    pub price: f64,
    /// -1 means unlimited.
    pub cards_limit: i64,
    pub white_label: bool,
}

pub const FREE: PlanEntitlements = PlanEntitlements {
    name: "Free",
    days: 7,
    price: 0.0,
    cards_limit: 2,
    white_label: false,
};

pub const BASIC: PlanEntitlements = PlanEntitlements {
    name: "Basic",
    days: 30,
    price: 499.0,
    cards_limit: 10,
    white_label: false,
};

pub const PRO: PlanEntitlements = PlanEntitlements {
    name: "Pro",
    days: 365,
    price: 4999.0,
    cards_limit: -1,
    white_label: true,
};

/// Entitlements for a known plan.
pub fn get(plan: Plan) -> &'static PlanEntitlements {
    match plan {
        Plan::Free => &FREE,
        Plan::Basic => &BASIC,
        Plan::Pro => &PRO,
    }
}

/// Lenient lookup by identifier. Unknown plan identifiers fall back to
/// the free entitlement set rather than failing.
pub fn lookup(id: &str) -> (Plan, &'static PlanEntitlements) {
    let plan = id.parse::<Plan>().unwrap_or(Plan::Free);
    (plan, get(plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_plans() {
        assert_eq!(lookup("basic").0, Plan::Basic);
        assert_eq!(lookup("pro").1.cards_limit, -1);
        assert!(lookup("pro").1.white_label);
    }

    #[test]
    fn lookup_unknown_falls_back_to_free() {
        let (plan, ent) = lookup("nonexistent");
        assert_eq!(plan, Plan::Free);
        assert_eq!(ent.cards_limit, FREE.cards_limit);
        assert_eq!(ent.days, 7);
        assert!(!ent.white_label);
    }

    #[test]
    fn plan_round_trips_through_strings() {
        for plan in [Plan::Free, Plan::Basic, Plan::Pro] {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
        }
    }
}
