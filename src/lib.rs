//! ThemeVault - Subscription and entitlement engine.
//!
//! Backend for the ThemeVault browser-theme product: billing webhook
//! processing, download credit accounting, and entitlement resolution
//! for the extension and account pages.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
