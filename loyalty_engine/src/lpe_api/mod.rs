//! # Loyalty engine public API
//!
//! The `lpe_api` module exposes the programmatic API that a request-handling layer calls into.
//!
//! * [`order_flow_api`] handles order uploads and the ownership check, and lists a user's orders.
//! * [`ledger_api`] reads balances and withdrawal histories, and performs withdrawals.
//!
//! Settlement is not part of this API. Only the reconciliation worker settles orders, directly through
//! [`LedgerManagement::settle_order`](crate::traits::LedgerManagement::settle_order).
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend trait the API needs:
//!
//! ```rust,ignore
//! use loyalty_engine::{LedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = LedgerApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```

pub mod errors;
pub mod ledger_api;
pub mod order_flow_api;
