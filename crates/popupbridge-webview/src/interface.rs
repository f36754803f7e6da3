// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound half of the bridge protocol: the `window.popupBridge` object.
//
// Hosts whose engine can call native methods directly invoke `open` and
// `send_message`. Hosts that only offer a string IPC channel inject
// `init_script()` and feed each message to `handle_ipc_message`.

use std::sync::{Arc, PoisonError, RwLock};

use popupbridge_core::error::{PopupBridgeError, Result};
use popupbridge_core::types::{InboundCall, POPUP_BRIDGE_NAME};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::script::{js_string_literal, return_url_prefix};

type OpenHandler = Arc<dyn Fn(&str) + Send + Sync>;
type MessageHandler = Arc<dyn Fn(&str, Option<&str>) + Send + Sync>;

/// Wire shape of messages posted by the injected shim.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
enum IpcMessage {
    Open { url: String },
    SendMessage { name: String, data: Option<String> },
}

/// Script-facing bridge object.
///
/// Calls are forwarded to handlers registered by the client. Invoking an
/// operation with no handler registered does nothing.
pub struct JavascriptInterface {
    return_url_scheme: String,
    on_open: RwLock<Option<OpenHandler>>,
    on_send_message: RwLock<Option<MessageHandler>>,
}

impl JavascriptInterface {
    pub fn new(return_url_scheme: impl Into<String>) -> Self {
        Self {
            return_url_scheme: return_url_scheme.into(),
            on_open: RwLock::new(None),
            on_send_message: RwLock::new(None),
        }
    }

    /// `popupBridge.returnUrlPrefix`, e.g. `myapp://popupbridgev1/`.
    pub fn return_url_prefix(&self) -> String {
        return_url_prefix(&self.return_url_scheme)
    }

    pub fn set_on_open(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_open.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn set_on_send_message(
        &self,
        handler: impl Fn(&str, Option<&str>) + Send + Sync + 'static,
    ) {
        *self
            .on_send_message
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// `popupBridge.open(url)`.
    pub fn open(&self, url: &str) {
        let handler = self
            .on_open
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => handler(url),
            None => debug!("open called with no handler registered"),
        }
    }

    /// `popupBridge.sendMessage(name, data?)`.
    pub fn send_message(&self, name: &str, data: Option<&str>) {
        let handler = self
            .on_send_message
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => handler(name, data),
            None => debug!(name, "sendMessage called with no handler registered"),
        }
    }

    /// Route a decoded inbound call.
    pub fn dispatch(&self, call: &InboundCall) {
        match call {
            InboundCall::Open(url) => self.open(url),
            InboundCall::SendMessage { name, data } => self.send_message(name, data.as_deref()),
        }
    }

    /// Decode and route one IPC message posted by the shim.
    pub fn handle_ipc_message(&self, raw: &str) -> Result<()> {
        let call = parse_ipc_message(raw)?;
        self.dispatch(&call);
        Ok(())
    }

    /// Script defining `window.popupBridge` on top of a `window.ipc`
    /// string channel. Must run before page scripts.
    pub fn init_script(&self) -> String {
        format!(
            concat!(
                "(function () {{",
                "  if (window.{name}) {{ return; }}",
                "  var post = function (message) {{ window.ipc.postMessage(JSON.stringify(message)); }};",
                "  var bridge = {{",
                "    open: function (url) {{ post({{ method: 'open', url: String(url) }}); }},",
                "    sendMessage: function (name, data) {{",
                "      var message = {{ method: 'sendMessage', name: String(name) }};",
                "      if (data !== undefined && data !== null) {{ message.data = String(data); }}",
                "      post(message);",
                "    }}",
                "  }};",
                "  Object.defineProperty(bridge, 'returnUrlPrefix', {{ value: {prefix}, writable: false, enumerable: true }});",
                "  window.{name} = bridge;",
                "}})();"
            ),
            name = POPUP_BRIDGE_NAME,
            prefix = js_string_literal(&self.return_url_prefix()),
        )
    }
}

/// Parse one shim IPC message into an [`InboundCall`].
pub fn parse_ipc_message(raw: &str) -> Result<InboundCall> {
    let message: IpcMessage = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "malformed bridge IPC message");
        PopupBridgeError::Bridge(format!("malformed IPC message: {e}"))
    })?;
    Ok(match message {
        IpcMessage::Open { url } => InboundCall::Open(url),
        IpcMessage::SendMessage { name, data } => InboundCall::SendMessage { name, data },
    })
}
