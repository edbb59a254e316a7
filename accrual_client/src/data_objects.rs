use std::{fmt::Display, time::Duration};

use lp_common::Points;
use serde::{Deserialize, Serialize};

use crate::AccrualApiError;

/// The accrual service's view of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// Registered, but not yet looked at.
    Registered,
    /// Being calculated.
    Processing,
    /// Refused. No points will be paid out. Final.
    Invalid,
    /// Calculated. The response carries the accrual. Final.
    Processed,
}

impl AccrualStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "REGISTERED"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Invalid => write!(f, "INVALID"),
            Self::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// Body of a `200 OK` reply to `GET /api/orders/{number}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    /// Only present once the order is `PROCESSED`. Older versions of the service spell this field `accural`.
    #[serde(default, alias = "accural", skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualResponse {
    /// The points paid out for the order. Zero unless the order was processed.
    pub fn accrual_or_zero(&self) -> Points {
        match self.status {
            AccrualStatus::Processed => self.accrual.unwrap_or_default(),
            _ => Points::zero(),
        }
    }
}

/// What the worker should do after asking the accrual service about one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// The service answered. The status may or may not be final.
    Settled(AccrualResponse),
    /// The service rate-limited us. The client has already waited for the given duration, so the same order can be
    /// asked about again straight away.
    RetryAfter(Duration),
    /// The service could not answer right now (`204 No Content` or `500`). Try again in a later batch.
    Transient,
    /// Anything else: network failures, malformed replies and unexpected status codes.
    Fatal(AccrualApiError),
}
