// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-facing facade.
//
// Wires the script interface, page latch, coordinator, store and telemetry
// together for one embedded page. Hosts give it a `ScriptHost` and a
// transport; everything else has a default derived from `BridgeConfig`.

use std::path::PathBuf;
use std::sync::Arc;

use popupbridge_core::config::BridgeConfig;
use popupbridge_core::error::{PopupBridgeError, Result};
use popupbridge_core::paths;
use popupbridge_core::types::ReentrySignal;
use popupbridge_store::{PendingRequestStore, SqliteStore};
use popupbridge_telemetry::{
    AnalyticsApi, AnalyticsClient, DeviceInfo, NoopSink, PostRequestExecutor, SessionContext,
    TelemetrySink,
};
use popupbridge_webview::script::venmo_installed_script;
use popupbridge_webview::traits::PlatformBridge;
use popupbridge_webview::{JavascriptInterface, NativeAppChecks, PageLoadState, ScriptHost};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::{CoordinatorDeps, ReturnHandling, RoundTripCoordinator};
use crate::lifecycle::LifecycleObserver;
use crate::listeners::Listeners;
use crate::transport::BrowserSwitchTransport;

/// File name of the default SQLite store inside the data directory.
pub const STORE_FILE: &str = "popupbridge.db";

/// Window/activity label used when the host does not name one.
pub const DEFAULT_ORIGIN: &str = "main";

type AppChecks = Arc<dyn NativeAppChecks + Send + Sync>;

/// Installed-app checks backed by the platform bridge.
struct PlatformAppChecks(Box<dyn PlatformBridge>);

impl NativeAppChecks for PlatformAppChecks {
    fn is_app_installed(&self, package_name: &str) -> Result<bool> {
        self.0.is_app_installed(package_name)
    }
}

pub struct PopupBridgeClientBuilder {
    config: BridgeConfig,
    origin: String,
    script_host: Option<Arc<dyn ScriptHost>>,
    transport: Option<Arc<dyn BrowserSwitchTransport>>,
    store: Option<Arc<dyn PendingRequestStore>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    app_checks: Option<AppChecks>,
    runtime: Option<Handle>,
    data_dir: Option<PathBuf>,
}

impl PopupBridgeClientBuilder {
    fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            origin: DEFAULT_ORIGIN.into(),
            script_host: None,
            transport: None,
            store: None,
            telemetry: None,
            app_checks: None,
            runtime: None,
            data_dir: None,
        }
    }

    /// Label of the window/activity the page lives in.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn BrowserSwitchTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to a [`SqliteStore`] in the data directory.
    pub fn store(mut self, store: Arc<dyn PendingRequestStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to the HTTPS analytics client, or a no-op sink when
    /// analytics are disabled in the config.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Defaults to the platform bridge.
    pub fn app_checks(mut self, checks: AppChecks) -> Self {
        self.app_checks = Some(checks);
        self
    }

    /// Defaults to the runtime `build` is called on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Defaults to [`paths::data_dir`].
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<PopupBridgeClient> {
        self.config.validate()?;
        let script_host = self
            .script_host
            .ok_or_else(|| PopupBridgeError::Config("a script host is required".into()))?;
        let transport = self
            .transport
            .ok_or_else(|| PopupBridgeError::Config("a browser-switch transport is required".into()))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|e| PopupBridgeError::Config(format!("no Tokio runtime: {e}")))?,
        };

        // One analytics session per client.
        let session = Arc::new(SessionContext::new());
        session.reset();

        let store = match self.store {
            Some(store) => store,
            None => {
                let dir = match self.data_dir {
                    Some(dir) => dir,
                    None => paths::data_dir()?,
                };
                Arc::new(SqliteStore::open(
                    dir.join(STORE_FILE),
                    &self.config.store_namespace,
                )?) as Arc<dyn PendingRequestStore>
            }
        };

        let telemetry = match self.telemetry {
            Some(telemetry) => telemetry,
            None if self.config.analytics_enabled => {
                let api = AnalyticsApi::new(
                    PostRequestExecutor::new()?,
                    self.config.analytics_url.clone(),
                    DeviceInfo::detect(&self.config.app),
                    Arc::clone(&session),
                );
                Arc::new(AnalyticsClient::new(api, runtime.clone())) as Arc<dyn TelemetrySink>
            }
            None => Arc::new(NoopSink),
        };

        let app_checks = self.app_checks.unwrap_or_else(|| {
            Arc::new(PlatformAppChecks(popupbridge_webview::platform_bridge())) as AppChecks
        });

        let listeners = Arc::new(Listeners::new());
        let page = Arc::new(PageLoadState::new(Arc::clone(&script_host)));
        let coordinator = Arc::new(RoundTripCoordinator::new(
            self.origin,
            self.config.return_url_scheme.clone(),
            CoordinatorDeps {
                store,
                transport,
                page: Arc::clone(&page),
                telemetry,
                listeners: Arc::clone(&listeners),
            },
            runtime.clone(),
        ));

        let interface = Arc::new(JavascriptInterface::new(
            self.config.return_url_scheme.clone(),
        ));
        {
            let coordinator = Arc::clone(&coordinator);
            interface.set_on_open(move |url| coordinator.open(url));
            let listeners = Arc::clone(&listeners);
            interface.set_on_send_message(move |name, data| listeners.message(name, data));
        }

        info!(
            scheme = %self.config.return_url_scheme,
            session = %session.session_id(),
            "popup bridge ready"
        );

        Ok(PopupBridgeClient {
            config: self.config,
            coordinator,
            interface,
            page,
            script_host,
            listeners,
            session,
            app_checks,
            runtime,
        })
    }
}

/// One bridge instance bound to one embedded page.
pub struct PopupBridgeClient {
    config: BridgeConfig,
    coordinator: Arc<RoundTripCoordinator>,
    interface: Arc<JavascriptInterface>,
    page: Arc<PageLoadState>,
    script_host: Arc<dyn ScriptHost>,
    listeners: Arc<Listeners>,
    session: Arc<SessionContext>,
    app_checks: AppChecks,
    runtime: Handle,
}

impl PopupBridgeClient {
    pub fn builder(config: BridgeConfig) -> PopupBridgeClientBuilder {
        PopupBridgeClientBuilder::new(config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The object to expose to the page as `window.popupBridge`.
    pub fn interface(&self) -> Arc<JavascriptInterface> {
        Arc::clone(&self.interface)
    }

    pub fn coordinator(&self) -> Arc<RoundTripCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn return_url_prefix(&self) -> String {
        self.interface.return_url_prefix()
    }

    pub fn session_id(&self) -> String {
        self.session.session_id()
    }

    /// Called with the URL every time the page asks to open one.
    pub fn set_navigation_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.set_navigation(listener);
    }

    /// Called for every `popupBridge.sendMessage(name, data?)`.
    pub fn set_message_listener(
        &self,
        listener: impl Fn(&str, Option<&str>) + Send + Sync + 'static,
    ) {
        self.listeners.set_message(listener);
    }

    /// Called when an external flow cannot be started.
    pub fn set_error_listener(
        &self,
        listener: impl Fn(&PopupBridgeError) + Send + Sync + 'static,
    ) {
        self.listeners.set_error(listener);
    }

    pub async fn handle_return_to_app(&self, signal: &ReentrySignal) -> ReturnHandling {
        self.coordinator.handle_return_to_app(signal).await
    }

    pub async fn flush_pending_write(&self) {
        self.coordinator.flush_pending_write().await;
    }

    /// Observer to feed host lifecycle events into.
    pub fn lifecycle_observer(&self) -> LifecycleObserver {
        LifecycleObserver::new(Arc::clone(&self.coordinator), self.runtime.clone())
    }

    /// The page started a navigation.
    pub fn page_started(&self) {
        self.page.page_started();
    }

    /// The page finished loading: release any held notification, then
    /// publish `isVenmoInstalled`. The app check runs off the caller's
    /// thread; a failed check publishes `false`.
    pub fn page_finished(&self) -> JoinHandle<()> {
        self.page.page_finished();

        let checks = Arc::clone(&self.app_checks);
        let host = Arc::clone(&self.script_host);
        self.runtime.spawn(async move {
            let installed =
                match tokio::task::spawn_blocking(move || checks.is_venmo_installed()).await {
                    Ok(Ok(installed)) => installed,
                    Ok(Err(e)) => {
                        debug!(error = %e, "venmo check unavailable");
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "venmo check did not complete");
                        false
                    }
                };
            host.post_script(venmo_installed_script(installed));
        })
    }
}
