//! Portfolio module - holdings derivation, valuation engine, and P&L persistence.

pub mod holdings;
pub mod snapshot;
pub mod valuation;

pub use holdings::*;
pub use snapshot::*;
pub use valuation::*;
