//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Subscription lifecycle, credits, entitlements, webhooks
//! - `catalog` - Premium theme catalog

pub mod billing;
pub mod catalog;
pub mod foundation;
