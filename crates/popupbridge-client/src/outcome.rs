// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome translator: one resolved `ReturnOutcome` in, at most one bridge
// message and telemetry event out.
//
// A success URL whose host is not the reserved bridge host belongs to some
// other deep-link consumer and is dropped before anything else happens. If a
// query parameter cannot be decoded, decoding stops there and the page gets
// the partial payload together with an error.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use popupbridge_core::error::PopupBridgeError;
use popupbridge_core::types::{BridgeMessage, BridgePayload, POPUP_BRIDGE_URL_HOST, ReturnOutcome};
use popupbridge_telemetry::{POPUP_BRIDGE_CANCELED, POPUP_BRIDGE_FAILED, POPUP_BRIDGE_SUCCEEDED};
use popupbridge_webview::script::{QUERY_PARSE_ERROR_PREFIX, error_literal};
use tracing::{debug, warn};
use url::Url;

/// What to deliver for one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub message: BridgeMessage,
    /// Telemetry event tagged with the outcome kind.
    pub event: &'static str,
}

/// Translate `outcome`. Returns None when the outcome is not for this bridge.
pub fn translate(outcome: &ReturnOutcome) -> Option<Translation> {
    match outcome {
        ReturnOutcome::Success { return_url } => translate_success(return_url),
        ReturnOutcome::Failure { error } => Some(Translation {
            message: BridgeMessage::NotifyComplete {
                error: Some(error_literal(error)),
                payload: None,
            },
            event: POPUP_BRIDGE_FAILED,
        }),
        ReturnOutcome::NoResult => Some(Translation {
            message: BridgeMessage::NotifyCanceled,
            event: POPUP_BRIDGE_CANCELED,
        }),
    }
}

fn translate_success(return_url: &Url) -> Option<Translation> {
    if return_url.host_str() != Some(POPUP_BRIDGE_URL_HOST) {
        debug!(host = ?return_url.host_str(), "return URL is not for this bridge");
        return None;
    }

    let (payload, error) = decompose(return_url);
    let event = if error.is_some() {
        POPUP_BRIDGE_FAILED
    } else {
        POPUP_BRIDGE_SUCCEEDED
    };
    Some(Translation {
        message: BridgeMessage::NotifyComplete {
            error,
            payload: Some(payload),
        },
        event,
    })
}

/// Split a return URL into `{path, queryItems, hash}`.
///
/// The second element is an `Error` expression when a query parameter
/// failed to decode; `path` and `hash` are filled in regardless.
pub fn decompose(return_url: &Url) -> (BridgePayload, Option<String>) {
    let (query_items, error) = match return_url.query() {
        Some(query) => match decode_query(query) {
            Ok(items) => (items, None),
            Err((items, e)) => {
                warn!(error = %e, "return URL query could not be fully decoded");
                (items, Some(error_literal(&format!("{QUERY_PARSE_ERROR_PREFIX}{e}"))))
            }
        },
        None => (BTreeMap::new(), None),
    };

    let path = Some(return_url.path())
        .filter(|p| !p.is_empty())
        .map(decode_lossy);
    let hash = return_url.fragment().map(decode_lossy);

    (
        BridgePayload {
            path,
            query_items,
            hash,
        },
        error,
    )
}

type PartialQuery = (BTreeMap<String, String>, PopupBridgeError);

/// Decode a raw query string into a flat map.
///
/// `+` means space, a name without `=` maps to the empty string, and the
/// first occurrence of a repeated name wins. Stops at the first parameter
/// that is not valid UTF-8 once decoded, returning what was decoded so far.
pub fn decode_query(query: &str) -> Result<BTreeMap<String, String>, PartialQuery> {
    let mut items = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = match decode_component(raw_name) {
            Ok(name) => name,
            Err(e) => return Err((items, e)),
        };
        let value = match decode_component(raw_value) {
            Ok(value) => value,
            Err(e) => return Err((items, e)),
        };
        items.entry(name).or_insert(value);
    }
    Ok(items)
}

fn decode_component(raw: &str) -> Result<String, PopupBridgeError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| PopupBridgeError::QueryDecode(format!("{raw}: {e}")))
}

fn decode_lossy(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
