//! `grpc-timeout` handling
//!
//! The resolver calls made during authentication are bounded by the
//! caller's deadline when one is present.

use http::HeaderMap;
use std::future::Future;
use std::time::Duration;
use tonic::Status;
use tracing::warn;

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

// At most 8 ASCII digits followed by a unit
const MAX_TIMEOUT_DIGITS: usize = 8;

/// Parse the caller deadline, ignoring malformed values
pub fn from_headers(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let parsed = parse_timeout(raw);
    if parsed.is_none() {
        warn!(value = %raw, "Ignoring malformed grpc-timeout header");
    }
    parsed
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    if raw.len() < 2 {
        return None;
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    if digits.len() > MAX_TIMEOUT_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(value * 3600),
        "M" => Duration::from_secs(value * 60),
        "S" => Duration::from_secs(value),
        "m" => Duration::from_millis(value),
        "u" => Duration::from_micros(value),
        "n" => Duration::from_nanos(value),
        _ => return None,
    };
    Some(duration)
}

/// Run `future` under the optional deadline
pub async fn bounded<F: Future>(deadline: Option<Duration>, future: F) -> Result<F::Output, Status> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| Status::deadline_exceeded("deadline exceeded during authentication")),
        None => Ok(future.await),
    }
}
