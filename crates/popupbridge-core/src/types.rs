// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the popup round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Reserved host that marks a deep link as belonging to this bridge.
///
/// Several libraries may share one custom URL scheme; only return URLs whose
/// host equals this value are delivered to the page.
pub const POPUP_BRIDGE_URL_HOST: &str = "popupbridgev1";

/// Name under which the bridge object is exposed to page scripts
/// (`window.popupBridge`).
pub const POPUP_BRIDGE_NAME: &str = "popupBridge";

/// Request code handed to the browser-switch transport.
pub const REQUEST_CODE: i32 = 1;

/// Opaque transport-defined token for one in-flight external flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingRequest(String);

impl PendingRequest {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for starting an external flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    /// URL to open in the external browser/app, exactly as the page passed it.
    pub url: String,
    /// Scheme the transport should register for the return deep link.
    pub return_url_scheme: String,
    /// Request code identifying this library's flows.
    pub request_id: i32,
}

/// What the transport reports after being asked to start a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResult {
    /// The flow is running; the token must be persisted until the return.
    Started(PendingRequest),
    /// The flow could not be started.
    Failure(String),
}

/// Terminal outcome of one resolved pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// The flow came back through a deep link.
    Success { return_url: Url },
    /// The transport could not resolve the flow.
    Failure { error: String },
    /// The user came back without completing the flow.
    NoResult,
}

impl ReturnOutcome {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::NoResult => "no-result",
        }
    }
}

/// A platform event suggesting the app may be back from an external flow.
///
/// May be delivered more than once for a single real return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReentrySignal {
    /// Deep-link URI the app was (re)launched with, if any.
    pub uri: Option<String>,
    /// Arbitrary platform metadata accompanying the signal.
    pub extras: BTreeMap<String, String>,
}

impl ReentrySignal {
    /// A signal carrying a deep-link URI.
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            extras: BTreeMap::new(),
        }
    }

    /// A bare "the app resumed" signal.
    pub fn resumed() -> Self {
        Self::default()
    }
}

/// Completion object handed to `window.popupBridge.onComplete`.
///
/// Absent `path`/`hash` are omitted from the JSON rather than sent as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub query_items: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Outbound native-to-script notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    /// `onComplete(error, payload)`. `error` is a script `Error` expression.
    NotifyComplete {
        error: Option<String>,
        payload: Option<BridgePayload>,
    },
    /// `onCancel()`, or `onComplete(null, null)` when the page has no
    /// cancel handler.
    NotifyCanceled,
}

/// Inbound script-to-native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCall {
    Open(String),
    SendMessage { name: String, data: Option<String> },
}
