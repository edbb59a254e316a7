use std::fmt::Debug;

use log::*;
use lp_common::Points;

use crate::{
    db_types::{Balance, NewWithdrawal, Withdrawal},
    traits::{LedgerError, LedgerManagement},
};

/// `LedgerApi` gives users access to their points: the balance, withdrawals, and the withdrawal history.
///
/// Credits are not exposed here. Points are only ever credited by settling an order.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub async fn balance(&self, user_id: i64) -> Result<Balance, LedgerError> {
        self.db.fetch_balance(user_id).await
    }

    /// Withdraws `amount` points against `order_number`, which is any non-empty reference the user chooses.
    pub async fn withdraw(&self, user_id: i64, order_number: &str, amount: Points) -> Result<Withdrawal, LedgerError> {
        let order_number = order_number.trim();
        let withdrawal = NewWithdrawal::new(user_id, order_number, amount);
        match self.db.debit(withdrawal).await {
            Ok(w) => {
                info!("🔄️💸️ User {user_id} withdrew {amount} points against order {order_number}");
                Ok(w)
            },
            Err(e) => {
                debug!("🔄️💸️ Withdrawal of {amount} points by user {user_id} was refused. {e}");
                Err(e)
            },
        }
    }

    /// The user's withdrawals, newest first, or `None` if the user has never withdrawn anything.
    pub async fn withdrawals(&self, user_id: i64) -> Result<Option<Vec<Withdrawal>>, LedgerError> {
        let withdrawals = self.db.fetch_withdrawals(user_id).await?;
        if withdrawals.is_empty() {
            Ok(None)
        } else {
            Ok(Some(withdrawals))
        }
    }
}
