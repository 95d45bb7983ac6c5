//! Valuation module - the live portfolio engine.

pub mod refresh_policy;
mod valuation_model;
pub mod valuation_service;
mod valuation_traits;

pub use refresh_policy::*;
pub use valuation_model::*;
pub use valuation_service::*;
pub use valuation_traits::*;
