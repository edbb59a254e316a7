use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lp_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      OrderNumber      ---------------------------------------------------------
/// The caller-supplied order number. It is unique across the whole system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded and nobody has asked the accrual service about it yet.
    New,
    /// The accrual service knows about the order but has not reached a verdict.
    Processing,
    /// The accrual service refused the order. No points are paid out. Terminal.
    Invalid,
    /// The accrual service paid out points for the order. Terminal.
    Processed,
}

impl OrderStatusType {
    /// `PROCESSED` and `INVALID` are never left once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// Encodes the order lifecycle: `NEW → PROCESSING → {PROCESSED | INVALID}`. An order may skip straight from `NEW`
    /// to a terminal state. Staying in the same state is not a transition.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        match (self, next) {
            (Self::New, Self::New) => false,
            (Self::New, _) => true,
            (Self::Processing, Self::New | Self::Processing) => false,
            (Self::Processing, _) => true,
            (Self::Invalid | Self::Processed, _) => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// Points paid out for the order. Only meaningful once the order is `PROCESSED`.
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number: OrderNumber,
    /// The user submitting the order. The first user to submit a number owns it.
    pub user_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(number: OrderNumber, user_id: i64) -> Self {
        Self { number, user_id, uploaded_at: Utc::now() }
    }
}

//--------------------------------------        Balance        ---------------------------------------------------------
/// A user's points balance. `current` never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Balance {
    pub user_id: i64,
    pub current: Points,
    pub total_withdrawn: Points,
}

impl Balance {
    /// The balance of a user that has never been credited.
    pub fn zero(user_id: i64) -> Self {
        Self { user_id, current: Points::zero(), total_withdrawn: Points::zero() }
    }
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Withdrawal {
    pub id: i64,
    /// Free-form reference supplied by the user. It need not match an uploaded order.
    pub order_number: String,
    pub user_id: i64,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_number: String,
    pub amount: Points,
}

impl NewWithdrawal {
    pub fn new<S: Into<String>>(user_id: i64, order_number: S, amount: Points) -> Self {
        Self { user_id, order_number: order_number.into(), amount }
    }
}
