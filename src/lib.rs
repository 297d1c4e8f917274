//! StudentDesk: an advisor back office for prospective students.
//!
//! The library holds the record store, the derived views (dashboard counters,
//! list filtering, profile timelines, advisor briefs) and the command layer
//! the `studentdesk` binary drives.

pub mod cache;
pub mod commands;
pub mod db;
pub mod devtools;
pub mod error;
pub mod filter;
pub mod metrics;
mod migrations;
pub mod progress;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod templates;
pub mod types;
pub mod util;
pub mod views;
