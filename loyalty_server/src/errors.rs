use thiserror::Error;

use crate::accrual_worker::WorkerError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The accrual worker failed. {0}")]
    WorkerError(#[from] WorkerError),
}
