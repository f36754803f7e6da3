// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTPS POST of JSON bodies for the analytics endpoint.

use std::time::Duration;

use popupbridge_core::error::{PopupBridgeError, Result};
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE};
use tracing::{debug, instrument};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts JSON and returns the response body.
///
/// Only `https://` URLs are accepted. Gzip-encoded responses are decoded
/// transparently.
#[derive(Clone)]
pub struct PostRequestExecutor {
    http: reqwest::Client,
}

impl PostRequestExecutor {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .https_only(true)
            .gzip(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| PopupBridgeError::Telemetry(format!("client setup: {e}")))?;
        Ok(Self { http })
    }

    /// POST `json_body` to `url`.
    ///
    /// Non-2xx responses are errors carrying the status and the body.
    #[instrument(skip(self, json_body), fields(body_len = json_body.len()))]
    pub async fn execute(&self, url: &str, json_body: String) -> Result<String> {
        if !url.starts_with("https://") {
            return Err(PopupBridgeError::Telemetry(format!(
                "only HTTPS is supported: {url}"
            )));
        }

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_LANGUAGE, accept_language())
            .body(json_body)
            .send()
            .await
            .map_err(|e| PopupBridgeError::Telemetry(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PopupBridgeError::Telemetry(format!("read body: {e}")))?;

        if status.is_success() {
            debug!(status = status.as_u16(), "analytics request accepted");
            Ok(body)
        } else {
            Err(PopupBridgeError::Telemetry(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )))
        }
    }
}

/// Language tag from `LANG` (e.g. `de_DE.UTF-8` -> `de`), `en` if unset.
fn accept_language() -> String {
    std::env::var("LANG")
        .ok()
        .and_then(|lang| {
            let tag: String = lang.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
            (!tag.is_empty() && tag != "C").then(|| tag.to_ascii_lowercase())
        })
        .unwrap_or_else(|| "en".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_http_is_rejected_before_sending() {
        let executor = PostRequestExecutor::new().expect("client");
        let result = executor.execute("http://example.com/events", "{}".into()).await;
        match result {
            Err(PopupBridgeError::Telemetry(msg)) => assert!(msg.contains("only HTTPS")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn accept_language_is_a_bare_tag() {
        let tag = accept_language();
        assert!(!tag.is_empty());
        assert!(tag.chars().all(|c| c.is_ascii_lowercase()));
    }
}
