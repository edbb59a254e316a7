//! #  Store contracts.
//!
//! This module defines the interface contracts that storage *backends* must satisfy to act as the loyalty engine's
//! store.
//!
//! * [`OrderManagement`] stores uploaded orders and moves them through their lifecycle.
//! * [`LedgerManagement`] holds per-user balances and the withdrawal history, and performs settlement, which touches
//!   both an order and a balance.
//!
//! The reconciliation worker needs both, so backends will usually implement both traits on the same type.
mod data_objects;
mod ledger_management;
mod order_management;

pub use data_objects::{InsertOrderResult, SettlementResult};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use order_management::{OrderManagement, OrderStoreError};
