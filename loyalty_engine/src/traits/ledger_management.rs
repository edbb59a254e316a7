use lp_common::Points;
use thiserror::Error;

use crate::{
    db_types::{Balance, NewWithdrawal, OrderStatusType, Withdrawal},
    traits::data_objects::SettlementResult,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient funds. Requested {requested}, but only {available} is available")]
    InsufficientFunds { requested: Points, available: Points },
    #[error("Invalid amount: {0}. Amounts must be positive")]
    InvalidAmount(Points),
    #[error("A withdrawal needs a non-empty order number")]
    MissingOrderNumber,
    #[error("Order with id {0} does not exist")]
    OrderNotFound(i64),
    #[error("{0} is not a settlement status")]
    NotASettlement(OrderStatusType),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The `LedgerManagement` trait defines the points ledger: one balance per user, and an append-only list of
/// withdrawals.
///
/// Every method that writes to a balance does so atomically. Implementations must guarantee that concurrent debits
/// never drive `current` below zero and that no concurrent credit or debit is lost.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Adds `amount` to the user's current balance, creating the balance if the user has never been credited.
    async fn credit(&self, user_id: i64, amount: Points) -> Result<Balance, LedgerError>;

    /// Settles an order in a single transaction.
    ///
    /// The status is only written if the order is still `NEW` or `PROCESSING`. If it is `PROCESSED`, the accrual is
    /// stored and credited to the order's owner in the same transaction. If the order had already been settled,
    /// nothing is written and [`SettlementResult::AlreadySettled`] is returned, so settling twice never credits twice.
    async fn settle_order(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<SettlementResult, LedgerError>;

    /// Withdraws points from a balance and records the withdrawal, atomically.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] if the current balance is less than the amount requested. In
    /// that case nothing is written.
    async fn debit(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, LedgerError>;

    /// The user's balance. Users that were never credited have a zero balance.
    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, LedgerError>;

    /// The user's withdrawals, newest first.
    async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError>;
}
