use std::fmt::Debug;

use log::*;
use serde::Serialize;

use crate::{
    db_types::{NewOrder, Order, OrderNumber},
    helpers::validate_order_number,
    lpe_api::errors::OrderFlowError,
    traits::{InsertOrderResult, OrderManagement},
};

/// The outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UploadResult {
    /// The order is new and will be picked up by the reconciliation worker.
    Accepted(Order),
    /// The caller had already uploaded this order. Nothing changed.
    AlreadyUploaded(Order),
}

impl UploadResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(order) | Self::AlreadyUploaded(order) => order,
        }
    }
}

/// `OrderFlowApi` handles order uploads from users, and lets them see the orders they have uploaded.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Uploads an order number on behalf of `user_id`.
    ///
    /// The number must consist of digits only and pass the Luhn check. Uploading the same number twice is harmless,
    /// and yields [`UploadResult::AlreadyUploaded`]. Uploading a number that another user owns is an error, whatever
    /// the order's status.
    pub async fn upload_order(&self, user_id: i64, number: &str) -> Result<UploadResult, OrderFlowError> {
        let number = validate_order_number(number).map_err(OrderFlowError::InvalidOrderNumber)?;
        let order = NewOrder::new(number.clone(), user_id);
        match self.db.save_new_order(order).await? {
            InsertOrderResult::Inserted(order) => {
                info!("🔄️📦️ Order {} uploaded by user {user_id}", order.number);
                Ok(UploadResult::Accepted(order))
            },
            InsertOrderResult::AlreadyOwnedByCaller(order) => {
                debug!("🔄️📦️ Order {} re-uploaded by its owner, user {user_id}", order.number);
                Ok(UploadResult::AlreadyUploaded(order))
            },
            InsertOrderResult::OwnedByOtherUser => {
                warn!("🔄️📦️ User {user_id} tried to upload order {number}, which belongs to someone else");
                Err(OrderFlowError::OwnedByOtherUser(number))
            },
        }
    }

    /// The user's uploaded orders, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("🔄️📦️ Found {} orders for user {user_id}", orders.len());
        Ok(orders)
    }

    pub async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order_by_number(number).await?;
        Ok(order)
    }
}
