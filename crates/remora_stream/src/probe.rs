//! Liveness probing of direct-download URLs.

use remora_error::{HttpError, RemoraResult};
use reqwest::StatusCode;
use reqwest::header::RANGE;
use std::time::Duration;
use tracing::debug;

/// Check whether a previously issued URL still answers.
///
/// Issues a HEAD with a short fixed timeout; hosts that refuse HEAD get a
/// one-byte ranged GET instead. An expired or deleted link answers with a
/// failure status and yields `Ok(false)`.
///
/// # Errors
///
/// Returns an error when the host cannot be reached at all, which says
/// nothing about the link itself.
pub async fn probe_url_alive(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> RemoraResult<bool> {
    let response = http
        .head(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HttpError::new(format!("HEAD {url}: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(true);
    }
    if status != StatusCode::METHOD_NOT_ALLOWED && status != StatusCode::NOT_IMPLEMENTED {
        debug!(%url, %status, "Probe found link dead");
        return Ok(false);
    }

    // Host refuses HEAD; read a single byte instead.
    let response = http
        .get(url)
        .header(RANGE, "bytes=0-0")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HttpError::new(format!("GET {url}: {e}")))?;
    Ok(response.status().is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn success_head_is_alive() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let alive = probe_url_alive(&http, &server.uri(), Duration::from_secs(5))
            .await
            .expect("probe");
        assert!(alive);
    }

    #[tokio::test]
    async fn gone_link_is_dead_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let alive = probe_url_alive(&http, &server.uri(), Duration::from_secs(5))
            .await
            .expect("probe");
        assert!(!alive);
    }

    #[tokio::test]
    async fn head_refusal_falls_back_to_ranged_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![0u8]))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let alive = probe_url_alive(&http, &server.uri(), Duration::from_secs(5))
            .await
            .expect("probe");
        assert!(alive);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let http = reqwest::Client::new();
        let result = probe_url_alive(
            &http,
            "http://127.0.0.1:1/never",
            Duration::from_millis(500),
        )
        .await;
        assert!(result.is_err());
    }
}
