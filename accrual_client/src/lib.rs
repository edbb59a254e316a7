//! Client for the external accrual service, which decides how many loyalty points an order is worth.
//!
//! [`AccrualApi::query_order`] asks about one order and always returns an [`AccrualOutcome`]. Rate limiting is
//! handled inside the client: when the service answers `429 Too Many Requests`, the client waits for as long as the
//! `Retry-After` header says before returning.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::{classify_response, AccrualApi, AccrualService};
pub use config::{AccrualConfig, DEFAULT_ACCRUAL_SYSTEM_ADDRESS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_AFTER};
pub use data_objects::{AccrualOutcome, AccrualResponse, AccrualStatus};
pub use error::AccrualApiError;
pub use helpers::parse_retry_after;
