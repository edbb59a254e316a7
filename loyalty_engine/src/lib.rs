//! Loyalty Engine
//!
//! The loyalty engine is the core of a loyalty points service. Users upload the numbers of orders they have placed,
//! an external accrual service decides how many points each order is worth, and users can withdraw the points they
//! have collected.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@traits`] and, with the `sqlite` feature, [`SqliteDatabase`]). The traits define the contracts a
//!    backend must honour: order numbers are unique, an order is settled at most once, and a balance never goes
//!    negative. The data types used in the store are defined in the [`db_types`] module and are public.
//! 2. The public API ([`OrderFlowApi`], [`LedgerApi`]). This is what a request-handling layer calls.
//!
//! Orders are settled by the reconciliation worker that lives in the server crate. It uses the store traits directly.
pub mod db_types;
pub mod helpers;
mod lpe_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use lpe_api::{
    errors::OrderFlowError,
    ledger_api::LedgerApi,
    order_flow_api::{OrderFlowApi, UploadResult},
};
pub use traits::{
    InsertOrderResult,
    LedgerError,
    LedgerManagement,
    OrderManagement,
    OrderStoreError,
    SettlementResult,
};
