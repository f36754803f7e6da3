// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed script templates evaluated inside the embedded page.
//
// Every notification is wrapped in the same readyState check: if the page
// has finished loading the handler runs immediately, otherwise it runs once
// from a `load` listener. The only interpolated values are a JSON document
// and an `Error` expression built from an escaped string literal.

use popupbridge_core::types::{BridgeMessage, BridgePayload, POPUP_BRIDGE_URL_HOST};

/// Prefix of the message used when query parameters cannot be decoded.
pub const QUERY_PARSE_ERROR_PREFIX: &str = "Failed to parse query items from return URL. ";

/// Script that invokes `onCancel()`, falling back to `onComplete(null, null)`.
pub const CANCELED_SCRIPT: &str = concat!(
    "function notifyCanceled() {",
    "  if (typeof window.popupBridge.onCancel === 'function') {",
    "    window.popupBridge.onCancel();",
    "  } else {",
    "    window.popupBridge.onComplete(null, null);",
    "  }",
    "}",
    "",
    "if (document.readyState === 'complete') {",
    "  notifyCanceled();",
    "} else {",
    "  window.addEventListener('load', function () {",
    "    notifyCanceled();",
    "  });",
    "}"
);

/// Render `onComplete(error, payload)`.
///
/// `error` must already be a script expression (see [`error_literal`]);
/// `None` renders as `null`.
pub fn complete_script(error: Option<&str>, payload: Option<&BridgePayload>) -> String {
    let error = error.unwrap_or("null");
    let payload = payload.map_or_else(|| "null".to_owned(), payload_json);
    format!(
        concat!(
            "function notifyComplete() {{",
            "  window.popupBridge.onComplete({}, {});",
            "}}",
            "",
            "if (document.readyState === 'complete') {{",
            "  notifyComplete();",
            "}} else {{",
            "  window.addEventListener('load', function () {{",
            "    notifyComplete();",
            "  }});",
            "}}"
        ),
        error, payload
    )
}

/// Render the script for an outbound [`BridgeMessage`].
pub fn message_script(message: &BridgeMessage) -> String {
    match message {
        BridgeMessage::NotifyComplete { error, payload } => {
            complete_script(error.as_deref(), payload.as_ref())
        }
        BridgeMessage::NotifyCanceled => CANCELED_SCRIPT.to_owned(),
    }
}

/// Render the script that publishes `window.popupBridge.isVenmoInstalled`.
pub fn venmo_installed_script(installed: bool) -> String {
    format!(
        concat!(
            "function setVenmoInstalled() {{",
            "    window.popupBridge.isVenmoInstalled = {};",
            "}}",
            "",
            "if (document.readyState === 'complete') {{",
            "  setVenmoInstalled();",
            "}} else {{",
            "  window.addEventListener('load', function () {{",
            "    setVenmoInstalled();",
            "  }});",
            "}}"
        ),
        installed
    )
}

/// Build a `new Error('...')` expression carrying `message`.
pub fn error_literal(message: &str) -> String {
    format!("new Error({})", js_string_literal(message))
}

/// Quote `value` as a single-quoted script string literal.
pub fn js_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Return URL prefix the page uses to build deep links back into the app.
pub fn return_url_prefix(return_url_scheme: &str) -> String {
    format!("{return_url_scheme}://{POPUP_BRIDGE_URL_HOST}/")
}

/// Serialize a payload for embedding in a script.
///
/// JSON is a script expression except for the two line separators, which
/// older engines reject inside string literals.
fn payload_json(payload: &BridgePayload) -> String {
    // Serializing a map of strings cannot fail.
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_owned());
    json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn complete_script_embeds_payload() {
        let payload = BridgePayload {
            path: Some("/mypath".into()),
            query_items: BTreeMap::from([("first".into(), "a".into())]),
            hash: None,
        };
        let script = complete_script(None, Some(&payload));
        assert!(script.contains(
            r#"window.popupBridge.onComplete(null, {"path":"/mypath","queryItems":{"first":"a"}});"#
        ));
        assert!(script.starts_with("function notifyComplete() {"));
        assert!(script.contains("if (document.readyState === 'complete') {  notifyComplete();}"));
        assert!(script.contains("window.addEventListener('load', function () {    notifyComplete();  });"));
    }

    #[test]
    fn complete_script_with_error_and_no_payload() {
        let script = complete_script(Some(&error_literal("boom")), None);
        assert!(script.contains("window.popupBridge.onComplete(new Error('boom'), null);"));
    }

    #[test]
    fn canceled_script_falls_back_to_on_complete() {
        let script = message_script(&BridgeMessage::NotifyCanceled);
        assert!(script.contains("typeof window.popupBridge.onCancel === 'function'"));
        assert!(script.contains("window.popupBridge.onComplete(null, null);"));
    }

    #[test]
    fn error_literal_escapes_quotes_and_newlines() {
        assert_eq!(
            error_literal("it's\nbroken \\ here"),
            r"new Error('it\'s\nbroken \\ here')"
        );
    }

    #[test]
    fn payload_line_separators_are_escaped() {
        let payload = BridgePayload {
            path: Some("/a\u{2028}b".into()),
            ..BridgePayload::default()
        };
        let script = complete_script(None, Some(&payload));
        assert!(script.contains("/a\\u2028b"));
        assert!(!script.contains('\u{2028}'));
    }

    #[test]
    fn venmo_script_sets_flag() {
        let script = venmo_installed_script(true);
        assert!(script.contains("window.popupBridge.isVenmoInstalled = true;"));
    }

    #[test]
    fn return_url_prefix_uses_reserved_host() {
        assert_eq!(return_url_prefix("myapp"), "myapp://popupbridgev1/");
    }
}
