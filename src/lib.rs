//! Tiered utility billing for rental contracts: rate tables, meter readings,
//! monthly bills, and a REST API over them.

#[cfg(feature = "api")]
pub mod api;
pub mod applicants;
/// Tariff evaluation and bill generation.
pub mod billing;
pub mod cli;
pub mod config;
pub mod domain;
pub mod io;
pub mod listing;
pub mod observability;
pub mod reporting;
pub mod store;
