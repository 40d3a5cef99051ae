//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - PostgreSQL persistence adapters
//! - `memory` - In-memory adapters for testing and development
//! - `http` - axum REST API
//! - `email` - Mailer implementations

pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;
