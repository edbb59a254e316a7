use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::AccrualApiError;

/// Parses a `Retry-After` header value.
///
/// Both forms allowed by HTTP are accepted: a whole number of seconds, or an HTTP date (RFC 1123), which is turned into
/// the time remaining until that date. A date in the past means "retry now". A missing or blank header yields
/// `default`.
pub fn parse_retry_after(
    value: Option<&str>,
    default: Duration,
    now: DateTime<Utc>,
) -> Result<Duration, AccrualApiError> {
    let value = match value.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(v) => v,
    };
    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AccrualApiError::InvalidRetryAfter(value.to_string()));
    }
    let date = DateTime::parse_from_rfc2822(value).map_err(|_| AccrualApiError::InvalidRetryAfter(value.to_string()))?;
    let delay = date.with_timezone(&Utc) - now;
    Ok(delay.to_std().unwrap_or(Duration::ZERO))
}
