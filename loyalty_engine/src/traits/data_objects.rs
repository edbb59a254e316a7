use serde::Serialize;

use crate::db_types::{Balance, Order};

/// The outcome of storing an uploaded order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InsertOrderResult {
    /// The order number was new and has been stored with status `NEW`.
    Inserted(Order),
    /// The caller uploaded this number before. Nothing was written.
    AlreadyOwnedByCaller(Order),
    /// The number belongs to another user, whatever its status.
    OwnedByOtherUser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SettlementResult {
    /// The order moved to a terminal status. `balance` is the owner's balance after the credit, and is only present
    /// if the order was `PROCESSED`.
    Settled { order: Order, balance: Option<Balance> },
    /// The order had already been settled. Nothing was written or credited.
    AlreadySettled,
}

impl SettlementResult {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }

    pub fn credited_balance(&self) -> Option<&Balance> {
        match self {
            Self::Settled { balance, .. } => balance.as_ref(),
            Self::AlreadySettled => None,
        }
    }
}
