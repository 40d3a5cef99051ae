//! HTTP adapter for billing endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_routes, webhook_routes};
