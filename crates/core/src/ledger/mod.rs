//! Transaction ledger module - domain models, service, and traits.

mod ledger_model;
mod ledger_service;
mod ledger_traits;


#[cfg(test)]
mod ledger_model_tests;

pub use ledger_model::{
    LedgerStatistics, NewTransaction, Transaction, TransactionKind, TransactionUpdate,
};
pub use ledger_service::LedgerService;
pub use ledger_traits::LedgerServiceTrait;
