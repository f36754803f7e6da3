// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PopupBridge demo
//
// Drives one round trip without a real browser: the page opens a URL, the
// app is resumed twice (a bare resume, then the deep link), and every script
// the page would evaluate is printed.
//
// Usage: popupbridge-demo [RETURN_URL]

use std::sync::Arc;

use popupbridge_client::{DeepLinkTransport, LifecycleEvent, PopupBridgeClient};
use popupbridge_core::config::BridgeConfig;
use popupbridge_core::paths;
use popupbridge_core::types::ReentrySignal;
use popupbridge_telemetry::TelemetrySink;
use popupbridge_webview::ChannelScriptHost;

/// Logs analytics events instead of sending them.
struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&self, event_name: &str) {
        tracing::info!(event = event_name, "analytics");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}

async fn run() -> popupbridge_core::error::Result<()> {
    let dir = paths::data_dir()?;
    let config = BridgeConfig::load_or_default(&dir);
    tracing::info!(path = %dir.display(), scheme = %config.return_url_scheme, "PopupBridge demo starting");

    let return_url = std::env::args().nth(1).unwrap_or_else(|| {
        format!(
            "{}checkout/complete?status=approved&token=EC-123#receipt",
            popupbridge_webview::script::return_url_prefix(&config.return_url_scheme)
        )
    });

    let (host, mut scripts) = ChannelScriptHost::channel();
    let transport = DeepLinkTransport::new(config.return_url_scheme.clone(), |url: &str| {
        tracing::info!(url, "launching external browser");
        Ok(())
    });
    let client = PopupBridgeClient::builder(config)
        .script_host(Arc::new(host))
        .transport(Arc::new(transport))
        .telemetry(Arc::new(LogSink))
        .data_dir(&dir)
        .build()?;

    client.set_navigation_listener(|url| println!("navigation: {url}"));
    client.set_error_listener(|e| eprintln!("error: {e}"));

    // Page side: the shim posts `open` over IPC.
    let open = serde_json::json!({ "method": "open", "url": "https://example.com/checkout" });
    client.interface().handle_ipc_message(&open.to_string())?;

    // App side: the platform reports the return twice.
    let observer = client.lifecycle_observer();
    let resume = observer.on_event(LifecycleEvent::Resumed);
    let intent = observer.on_event(LifecycleEvent::NewIntent(ReentrySignal::with_uri(
        return_url,
    )));
    for task in [resume, intent].into_iter().flatten() {
        match task.await {
            Ok(handling) => println!("re-entry: {handling:?}"),
            Err(e) => eprintln!("re-entry task failed: {e}"),
        }
    }

    if let Err(e) = client.page_finished().await {
        eprintln!("venmo check failed: {e}");
    }

    while let Some(script) = scripts.try_recv() {
        println!("--- script ---\n{script}");
    }
    Ok(())
}
