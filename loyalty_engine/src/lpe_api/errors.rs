use thiserror::Error;

use crate::{db_types::OrderNumber, traits::OrderStoreError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderFlowError {
    #[error("'{0}' is not a valid order number")]
    InvalidOrderNumber(String),
    #[error("Order {0} has already been uploaded by another user")]
    OwnedByOtherUser(OrderNumber),
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),
}
