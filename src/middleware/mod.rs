mod plan_expiry;

pub use plan_expiry::*;
