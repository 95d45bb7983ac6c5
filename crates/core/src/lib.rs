//! Coinfolio Core - Domain entities, services, and traits.
//!
//! This crate contains the core business logic for Coinfolio: the
//! transaction ledger, the portfolio valuation engine and the durable
//! P&L snapshot store. It is storage-agnostic and defines the key-value
//! trait implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod context;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod portfolio;
pub mod storage;

// Re-export common types from the ledger and portfolio modules
pub use ledger::*;
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
