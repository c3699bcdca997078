use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use super::error::{DataError, Result};

/// HTTP request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the full body of `url`.  Failures are not retried.
pub fn fetch_bytes(url: &str, timeout: Duration) -> Result<Bytes> {
    let fetch_err = |reason: String| DataError::load(url, reason);

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fetch_err(e.to_string()))?;

    log::debug!("Fetching {url} (timeout {timeout:?})");

    let response = client
        .get(url)
        .header(
            USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        )
        .send()
        .map_err(|e| fetch_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("server answered {status}")));
    }

    let body = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
    log::debug!("Fetched {} bytes from {url}", body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_a_load_error() {
        // Port 9 on localhost is not expected to serve HTTP.
        let err = fetch_bytes("http://127.0.0.1:9/summary.csv", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, DataError::Load { .. }), "{err}");
    }
}
