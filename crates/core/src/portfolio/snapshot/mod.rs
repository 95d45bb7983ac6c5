//! P&L snapshot module - durable portfolio state with integrity checking.

pub mod integrity;
mod snapshot_model;
pub mod snapshot_service;
mod snapshot_traits;

pub use integrity::*;
pub use snapshot_model::*;
pub use snapshot_service::*;
pub use snapshot_traits::*;

#[cfg(test)]
mod snapshot_model_tests;
