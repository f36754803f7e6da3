// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser-switch transport boundary.
//
// The transport launches the external browser/app and later decides what a
// re-entry signal means for the pending request it handed out. How it does
// either is platform business; the coordinator only sees `StartResult` and
// `ReturnOutcome`.

use std::sync::Arc;

use async_trait::async_trait;
use popupbridge_core::types::{
    PendingRequest, ReentrySignal, ReturnOutcome, StartOptions, StartResult,
};
use tracing::{debug, info, warn};
use url::Url;

/// Launches external flows and resolves their outcome.
#[async_trait]
pub trait BrowserSwitchTransport: Send + Sync {
    /// Launch the external flow for `options` from the window/activity
    /// identified by `origin`. Must not block on the flow itself.
    fn start(&self, origin: &str, options: &StartOptions) -> StartResult;

    /// Decide the outcome of `request` given the latest re-entry signal.
    ///
    /// Called at most once per pending request. Transport problems are
    /// reported as [`ReturnOutcome::Failure`], not as an error.
    async fn resolve(&self, signal: &ReentrySignal, request: &PendingRequest) -> ReturnOutcome;
}

type Launcher = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Transport for hosts that receive the return as an OS deep link.
///
/// `start` hands the URL to a launcher (system browser, custom tab, ...)
/// and issues a fresh token. `resolve` reports success when the signal
/// carries a URI with the configured return scheme, and no result otherwise.
pub struct DeepLinkTransport {
    return_url_scheme: String,
    launcher: Launcher,
}

impl DeepLinkTransport {
    pub fn new(
        return_url_scheme: impl Into<String>,
        launcher: impl Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            return_url_scheme: return_url_scheme.into(),
            launcher: Arc::new(launcher),
        }
    }
}

#[async_trait]
impl BrowserSwitchTransport for DeepLinkTransport {
    fn start(&self, origin: &str, options: &StartOptions) -> StartResult {
        if options.url.trim().is_empty() {
            return StartResult::Failure("no URL to open".into());
        }
        match (self.launcher)(&options.url) {
            Ok(()) => {
                let token = PendingRequest::new(uuid::Uuid::new_v4().to_string());
                info!(origin, request_id = options.request_id, "external flow launched");
                StartResult::Started(token)
            }
            Err(e) => {
                warn!(origin, error = %e, "could not launch external flow");
                StartResult::Failure(e)
            }
        }
    }

    async fn resolve(&self, signal: &ReentrySignal, request: &PendingRequest) -> ReturnOutcome {
        let Some(uri) = signal.uri.as_deref() else {
            debug!(request = %request, "re-entry without a deep link");
            return ReturnOutcome::NoResult;
        };
        match Url::parse(uri) {
            Ok(url) if url.scheme().eq_ignore_ascii_case(&self.return_url_scheme) => {
                ReturnOutcome::Success { return_url: url }
            }
            Ok(url) => {
                debug!(scheme = url.scheme(), "deep link is for another scheme");
                ReturnOutcome::NoResult
            }
            Err(e) => ReturnOutcome::Failure {
                error: format!("malformed return URL: {e}"),
            },
        }
    }
}
