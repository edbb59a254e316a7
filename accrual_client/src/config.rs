use std::time::Duration;

use log::*;
use lp_common::helpers::parse_millis;

pub const DEFAULT_ACCRUAL_SYSTEM_ADDRESS: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// How long to wait when the accrual service rate-limits us without saying for how long.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Scheme, host and port of the accrual service, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    pub request_timeout: Duration,
    pub default_retry_after: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACCRUAL_SYSTEM_ADDRESS.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

impl AccrualConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("LPS_ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            warn!("🪛️ LPS_ACCRUAL_SYSTEM_ADDRESS not set, using {DEFAULT_ACCRUAL_SYSTEM_ADDRESS} as default");
            DEFAULT_ACCRUAL_SYSTEM_ADDRESS.to_string()
        });
        let timeout = std::env::var("LPS_ACCRUAL_TIMEOUT_MS").ok();
        let request_timeout = match parse_millis(timeout.as_deref()) {
            Ok(Some(t)) => t,
            Ok(None) => {
                info!("🪛️ LPS_ACCRUAL_TIMEOUT_MS not set, using {DEFAULT_REQUEST_TIMEOUT:?}");
                DEFAULT_REQUEST_TIMEOUT
            },
            Err(e) => {
                warn!("🪛️ Invalid LPS_ACCRUAL_TIMEOUT_MS. {e} Using {DEFAULT_REQUEST_TIMEOUT:?}");
                DEFAULT_REQUEST_TIMEOUT
            },
        };
        Self { base_url, request_timeout, default_retry_after: DEFAULT_RETRY_AFTER }
    }
}
