//! `SqliteDatabase` is the concrete SQLite backend of the loyalty engine.
//!
//! It implements both store contracts defined in the [`traits`](crate::traits) module.
use std::fmt::Debug;

use log::*;
use lp_common::Points;
use sqlx::{migrate, SqlitePool};

use super::db::{balances, new_pool, orders, withdrawals};
use crate::{
    db_types::{Balance, NewOrder, NewWithdrawal, Order, OrderNumber, OrderStatusType, Withdrawal},
    traits::{
        InsertOrderResult,
        LedgerError,
        LedgerManagement,
        OrderManagement,
        OrderStoreError,
        SettlementResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn save_new_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_unsettled_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unsettled_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        if status != OrderStatusType::Processing {
            return Err(OrderStoreError::IllegalStatusUpdate(status));
        }
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_unsettled_status(order_id, status, &mut tx).await?;
        if updated.is_none() && orders::fetch_order_by_id(order_id, &mut tx).await?.is_none() {
            return Err(OrderStoreError::OrderNotFound(order_id));
        }
        tx.commit().await?;
        if let Some(order) = &updated {
            debug!("🗃️ Order {} is now {}", order.number, order.status);
        }
        Ok(updated)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn credit(&self, user_id: i64, amount: Points) -> Result<Balance, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut conn = self.pool.acquire().await?;
        let balance = balances::credit(user_id, amount, &mut conn).await?;
        debug!("🗃️ {amount} points credited to user {user_id}");
        Ok(balance)
    }

    async fn settle_order(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<SettlementResult, LedgerError> {
        if !status.is_terminal() {
            return Err(LedgerError::NotASettlement(status));
        }
        if accrual.is_negative() {
            return Err(LedgerError::InvalidAmount(accrual));
        }
        let accrual = if status == OrderStatusType::Processed { accrual } else { Points::zero() };
        let mut tx = self.pool.begin().await?;
        // The guarded update goes first so that it takes the write lock before anything else is read.
        let Some(order) = orders::update_unsettled_order(order_id, status, accrual, &mut tx).await? else {
            return match orders::fetch_order_by_id(order_id, &mut tx).await? {
                Some(order) => {
                    debug!("🗃️ Order {} was already settled as {}. Nothing to do.", order.number, order.status);
                    Ok(SettlementResult::AlreadySettled)
                },
                None => Err(LedgerError::OrderNotFound(order_id)),
            };
        };
        let balance = if status == OrderStatusType::Processed && accrual.is_positive() {
            Some(balances::credit(order.user_id, accrual, &mut tx).await?)
        } else {
            None
        };
        tx.commit().await?;
        info!("🗃️ Order {} settled as {}. {accrual} points credited to user {}", order.number, status, order.user_id);
        Ok(SettlementResult::Settled { order, balance })
    }

    async fn debit(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, LedgerError> {
        if !withdrawal.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(withdrawal.amount));
        }
        if withdrawal.order_number.trim().is_empty() {
            return Err(LedgerError::MissingOrderNumber);
        }
        let user_id = withdrawal.user_id;
        let amount = withdrawal.amount;
        let mut tx = self.pool.begin().await?;
        if balances::debit(user_id, amount, &mut tx).await?.is_none() {
            let available = balances::fetch_balance(user_id, &mut tx).await?.current;
            tx.rollback().await?;
            debug!("🗃️ User {user_id} tried to withdraw {amount}, but only has {available}");
            return Err(LedgerError::InsufficientFunds { requested: amount, available });
        }
        let withdrawal = withdrawals::insert_withdrawal(withdrawal, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User {user_id} withdrew {amount} points against order {}", withdrawal.order_number);
        Ok(withdrawal)
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let balance = balances::fetch_balance(user_id, &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals(user_id, &mut conn).await?;
        Ok(withdrawals)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Applies the embedded schema migrations. Migrations that have already run are skipped.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) {
        self.pool.close().await;
    }
}
