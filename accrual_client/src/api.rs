use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER},
    Client,
    StatusCode,
};

use crate::{
    config::AccrualConfig,
    data_objects::{AccrualOutcome, AccrualResponse},
    helpers::parse_retry_after,
    AccrualApiError,
};

/// The seam between the reconciliation worker and the accrual service.
#[allow(async_fn_in_trait)]
pub trait AccrualService {
    /// Asks the accrual service about one order. This never fails outright; every failure mode is an
    /// [`AccrualOutcome`] variant.
    async fn query_order(&self, number: &str) -> AccrualOutcome;
}

#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, number: &str) -> String {
        format!("{}/api/orders/{number}", self.config.base_url.trim_end_matches('/'))
    }
}

impl AccrualService for AccrualApi {
    /// Sends `GET {base_url}/api/orders/{number}` and classifies the reply.
    ///
    /// When the service rate-limits us, this call sleeps for as long as we were told to before returning
    /// [`AccrualOutcome::RetryAfter`].
    async fn query_order(&self, number: &str) -> AccrualOutcome {
        let url = self.url(number);
        trace!("🌐️ Asking the accrual service about order {number}: {url}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("🌐️ Request for order {number} failed. {e}");
                return AccrualOutcome::Fatal(AccrualApiError::Request(e.to_string()));
            },
        };
        let status = response.status();
        let retry_after =
            response.headers().get(RETRY_AFTER).map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let body = if status == StatusCode::OK {
            match response.bytes().await {
                Ok(b) => b.to_vec(),
                Err(e) => return AccrualOutcome::Fatal(AccrualApiError::Request(e.to_string())),
            }
        } else {
            Vec::new()
        };
        let outcome =
            classify_response(status.as_u16(), retry_after.as_deref(), &body, self.config.default_retry_after);
        match &outcome {
            AccrualOutcome::Settled(r) => debug!("🌐️ Order {number} is {} according to the accrual service", r.status),
            AccrualOutcome::RetryAfter(delay) => {
                info!("🌐️ The accrual service is rate limiting us. Waiting {delay:?} before asking again");
                tokio::time::sleep(*delay).await;
            },
            AccrualOutcome::Transient => debug!("🌐️ No answer for order {number} right now ({status})"),
            AccrualOutcome::Fatal(e) => warn!("🌐️ Could not get the status of order {number}. {e}"),
        }
        outcome
    }
}

/// Turns an accrual service reply into an [`AccrualOutcome`]. No I/O happens here.
///
/// * `200`: the body is decoded. A malformed body, unknown status or negative accrual is `Fatal`.
/// * `204`, `500`: `Transient`.
/// * `429`: `RetryAfter`, using the `Retry-After` header, or `default_retry_after` if there is none. An unparsable
///   header is `Fatal`.
/// * Anything else is `Fatal`.
pub fn classify_response(
    status: u16,
    retry_after: Option<&str>,
    body: &[u8],
    default_retry_after: Duration,
) -> AccrualOutcome {
    match status {
        200 => match serde_json::from_slice::<AccrualResponse>(body) {
            Ok(r) if r.accrual.map(|a| a.is_negative()).unwrap_or(false) => {
                AccrualOutcome::Fatal(AccrualApiError::InvalidBody(format!("negative accrual for order {}", r.order)))
            },
            Ok(r) => AccrualOutcome::Settled(r),
            Err(e) => AccrualOutcome::Fatal(AccrualApiError::InvalidBody(e.to_string())),
        },
        204 | 500 => AccrualOutcome::Transient,
        429 => match parse_retry_after(retry_after, default_retry_after, Utc::now()) {
            Ok(delay) => AccrualOutcome::RetryAfter(delay),
            Err(e) => AccrualOutcome::Fatal(e),
        },
        other => AccrualOutcome::Fatal(AccrualApiError::UnexpectedStatus(other)),
    }
}
