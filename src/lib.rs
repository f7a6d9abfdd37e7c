//! Cardbase - multi-tenant digital visiting card and lead management backend
//!
//! This library provides the core functionality for the Cardbase platform:
//! database operations, payment gateway integration (checksum signing and
//! callback reconciliation), plan entitlements, and API handlers.

pub mod checksum;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod plans;
pub mod rate_limit;
pub mod util;
