use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType},
    traits::data_objects::InsertOrderResult,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order with id {0} does not exist")]
    OrderNotFound(i64),
    #[error("{0} cannot be set with a status update. Settle the order instead")]
    IllegalStatusUpdate(OrderStatusType),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines how uploaded orders are stored and how their status moves through the
/// lifecycle `NEW → PROCESSING → {PROCESSED | INVALID}`.
///
/// Terminal settlement (which also credits the owner) is handled by
/// [`LedgerManagement::settle_order`](crate::traits::LedgerManagement::settle_order), so that the status change and
/// the credit are a single atomic unit.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a freshly uploaded order with status `NEW`.
    ///
    /// The decision is made by the unique constraint on the order number, so two concurrent uploads of the same
    /// number can never both succeed. If the number already exists, the owner decides the result:
    /// [`InsertOrderResult::AlreadyOwnedByCaller`] or [`InsertOrderResult::OwnedByOtherUser`].
    async fn save_new_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError>;

    /// All orders uploaded by `user_id`, newest upload first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError>;

    /// Every order still awaiting a verdict (`NEW` or `PROCESSING`), oldest upload first.
    async fn fetch_unsettled_orders(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Moves a non-terminal order to a non-terminal `status`.
    ///
    /// Returns `Ok(None)` if the order had already been settled, in which case nothing is written. Only `PROCESSING`
    /// is accepted. Anything else is rejected with [`OrderStoreError::IllegalStatusUpdate`]; terminal statuses go
    /// through `settle_order`.
    async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError>;
}
