use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to the accrual service failed: {0}")]
    Request(String),
    #[error("Unexpected response status {0} from the accrual service")]
    UnexpectedStatus(u16),
    #[error("Invalid response body from the accrual service: {0}")]
    InvalidBody(String),
    #[error("Could not parse Retry-After header '{0}'")]
    InvalidRetryAfter(String),
}
