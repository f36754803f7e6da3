// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Round-trip coordinator.
//
// `open` starts an external flow and persists the returned token in the
// background. `handle_return_to_app` turns any number of re-entry signals
// into at most one notification per token:
//
//   Idle --signal--> Resolving --get/clear/resolve/deliver--> Idle
//
// A signal arriving while Resolving is dropped. The token is cleared before
// the transport is asked to resolve it, so a later signal can never see it
// again even if resolution panics.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use popupbridge_core::error::PopupBridgeError;
use popupbridge_core::types::{REQUEST_CODE, ReentrySignal, StartOptions, StartResult};
use popupbridge_store::PendingRequestStore;
use popupbridge_telemetry::{POPUP_BRIDGE_STARTED, TelemetrySink};
use popupbridge_webview::PageLoadState;
use popupbridge_webview::script::message_script;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::listeners::Listeners;
use crate::outcome::translate;
use crate::transport::BrowserSwitchTransport;

/// Resolution state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoordinatorState {
    Idle = 0,
    Resolving = 1,
}

impl CoordinatorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Resolving,
            _ => Self::Idle,
        }
    }
}

/// What one call to [`RoundTripCoordinator::handle_return_to_app`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnHandling {
    /// Another signal is already being resolved; this one was dropped.
    AlreadyResolving,
    /// Nothing was pending (or the store could not be read).
    NoPendingRequest,
    /// The token could not be cleared, so it was left unresolved.
    StoreUnavailable,
    /// Resolved, but the outcome was not addressed to this bridge.
    Ignored,
    /// A notification was delivered for an outcome of this kind.
    Delivered(&'static str),
}

/// Holds the state at Resolving; releases it on drop, including unwinds.
struct ResolvingGuard<'a>(&'a AtomicU8);

impl<'a> ResolvingGuard<'a> {
    fn acquire(state: &'a AtomicU8) -> Option<Self> {
        state
            .compare_exchange(
                CoordinatorState::Idle as u8,
                CoordinatorState::Resolving as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Self(state))
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(CoordinatorState::Idle as u8, Ordering::Release);
    }
}

/// Collaborators the coordinator drives.
pub struct CoordinatorDeps {
    pub store: Arc<dyn PendingRequestStore>,
    pub transport: Arc<dyn BrowserSwitchTransport>,
    pub page: Arc<PageLoadState>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub listeners: Arc<Listeners>,
}

pub struct RoundTripCoordinator {
    origin: String,
    return_url_scheme: String,
    deps: CoordinatorDeps,
    runtime: Handle,
    state: AtomicU8,
    pending_write: Mutex<Option<JoinHandle<()>>>,
}

impl RoundTripCoordinator {
    /// `origin` names the window/activity flows are launched from; store
    /// writes are spawned on `runtime`.
    pub fn new(
        origin: impl Into<String>,
        return_url_scheme: impl Into<String>,
        deps: CoordinatorDeps,
        runtime: Handle,
    ) -> Self {
        Self {
            origin: origin.into(),
            return_url_scheme: return_url_scheme.into(),
            deps,
            runtime,
            state: AtomicU8::new(CoordinatorState::Idle as u8),
            pending_write: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Start an external flow for `url`.
    ///
    /// Never blocks on storage: the token is written by a background task
    /// that `handle_return_to_app` waits for before reading. A start failure
    /// goes to the error listener and nothing is stored. The navigation
    /// listener fires either way.
    #[instrument(skip(self), fields(origin = %self.origin))]
    pub fn open(&self, url: &str) {
        self.deps.telemetry.emit(POPUP_BRIDGE_STARTED);

        let options = StartOptions {
            url: url.to_owned(),
            return_url_scheme: self.return_url_scheme.clone(),
            request_id: REQUEST_CODE,
        };
        match self.deps.transport.start(&self.origin, &options) {
            StartResult::Started(request) => {
                info!(request = %request, "external flow started");
                self.persist(request);
            }
            StartResult::Failure(message) => {
                warn!(error = %message, "external flow could not be started");
                self.deps.listeners.error(&PopupBridgeError::Transport(message));
            }
        }

        self.deps.listeners.navigated(url);
    }

    /// Spawn the store write, ordered after any write still in flight so the
    /// newest token always lands last.
    fn persist(&self, request: popupbridge_core::types::PendingRequest) {
        let store = Arc::clone(&self.deps.store);
        let mut slot = self
            .pending_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = slot.take();
        *slot = Some(self.runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            match store.store(&request).await {
                Ok(()) => debug!(request = %request, "pending request persisted"),
                Err(e) => error!(request = %request, error = %e, "failed to persist pending request"),
            }
        }));
    }

    /// Wait for the most recent store write started by `open`, if any.
    pub async fn flush_pending_write(&self) {
        let handle = self
            .pending_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "pending request write did not complete");
            }
        }
    }

    /// React to a re-entry signal. Safe to call any number of times for the
    /// same return: only the first caller to find a token notifies the page.
    #[instrument(skip_all, fields(uri = ?signal.uri))]
    pub async fn handle_return_to_app(&self, signal: &ReentrySignal) -> ReturnHandling {
        let Some(_guard) = ResolvingGuard::acquire(&self.state) else {
            debug!("resolution already in progress, dropping signal");
            return ReturnHandling::AlreadyResolving;
        };

        self.flush_pending_write().await;

        let request = match self.deps.store.get().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("no pending request");
                return ReturnHandling::NoPendingRequest;
            }
            Err(e) => {
                warn!(error = %e, "could not read pending request");
                return ReturnHandling::NoPendingRequest;
            }
        };

        if let Err(e) = self.deps.store.clear().await {
            warn!(request = %request, error = %e, "could not clear pending request, leaving it unresolved");
            return ReturnHandling::StoreUnavailable;
        }

        let outcome = self.deps.transport.resolve(signal, &request).await;
        info!(request = %request, kind = outcome.kind(), "pending request resolved");

        match translate(&outcome) {
            Some(translation) => {
                self.deps.page.deliver(message_script(&translation.message));
                self.deps.telemetry.emit(translation.event);
                ReturnHandling::Delivered(outcome.kind())
            }
            None => ReturnHandling::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use popupbridge_core::error::Result;
    use popupbridge_core::types::{BridgePayload, PendingRequest, ReturnOutcome};
    use popupbridge_store::{MemoryStore, SqliteStore};
    use popupbridge_telemetry::{
        POPUP_BRIDGE_CANCELED, POPUP_BRIDGE_FAILED, POPUP_BRIDGE_SUCCEEDED, RecordingSink,
    };
    use popupbridge_webview::RecordingScriptHost;
    use popupbridge_webview::script::{CANCELED_SCRIPT, complete_script};
    use tokio::sync::Notify;

    use super::*;
    use crate::transport::testing::ScriptedTransport;

    const RETURN_URL: &str = "myapp://popupbridgev1/mypath?first=a&second=b#frag";

    struct Fixture {
        coordinator: Arc<RoundTripCoordinator>,
        host: Arc<RecordingScriptHost>,
        page: Arc<PageLoadState>,
        telemetry: Arc<RecordingSink>,
        listeners: Arc<Listeners>,
    }

    fn fixture(store: Arc<dyn PendingRequestStore>, transport: Arc<dyn BrowserSwitchTransport>) -> Fixture {
        let host = Arc::new(RecordingScriptHost::new());
        let page = Arc::new(PageLoadState::new(host.clone()));
        let telemetry = Arc::new(RecordingSink::new());
        let listeners = Arc::new(Listeners::new());
        let coordinator = Arc::new(RoundTripCoordinator::new(
            "main",
            "myapp",
            CoordinatorDeps {
                store,
                transport,
                page: Arc::clone(&page),
                telemetry: telemetry.clone(),
                listeners: Arc::clone(&listeners),
            },
            Handle::current(),
        ));
        Fixture {
            coordinator,
            host,
            page,
            telemetry,
            listeners,
        }
    }

    fn expected_payload() -> BridgePayload {
        BridgePayload {
            path: Some("/mypath".into()),
            query_items: BTreeMap::from([
                ("first".into(), "a".into()),
                ("second".into(), "b".into()),
            ]),
            hash: Some("frag".into()),
        }
    }

    #[tokio::test]
    async fn open_then_return_delivers_payload() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL));
        let f = fixture(store.clone(), transport.clone());

        f.coordinator.open("https://pay.example/checkout");
        let handled = f
            .coordinator
            .handle_return_to_app(&ReentrySignal::with_uri(RETURN_URL))
            .await;

        assert_eq!(handled, ReturnHandling::Delivered("success"));
        assert_eq!(
            f.host.scripts(),
            vec![complete_script(None, Some(&expected_payload()))]
        );
        assert!(f.host.scripts()[0].contains(
            r#"{"path":"/mypath","queryItems":{"first":"a","second":"b"},"hash":"frag"}"#
        ));
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_STARTED, POPUP_BRIDGE_SUCCEEDED]);
        assert_eq!(store.peek(), None);

        let started = transport.started.lock().expect("lock").clone();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, "main");
        assert_eq!(started[0].1.url, "https://pay.example/checkout");
        assert_eq!(started[0].1.return_url_scheme, "myapp");
        assert_eq!(started[0].1.request_id, REQUEST_CODE);
    }

    #[tokio::test]
    async fn duplicate_signals_notify_once() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport =
            Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL).gated(Arc::clone(&gate)));
        let f = fixture(store.clone(), transport.clone());

        let first = {
            let coordinator = Arc::clone(&f.coordinator);
            tokio::spawn(async move {
                coordinator
                    .handle_return_to_app(&ReentrySignal::with_uri(RETURN_URL))
                    .await
            })
        };
        while transport.resolve_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(f.coordinator.state(), CoordinatorState::Resolving);

        for _ in 0..4 {
            assert_eq!(
                f.coordinator
                    .handle_return_to_app(&ReentrySignal::with_uri(RETURN_URL))
                    .await,
                ReturnHandling::AlreadyResolving
            );
        }

        gate.notify_one();
        assert_eq!(first.await.expect("join"), ReturnHandling::Delivered("success"));
        assert_eq!(f.coordinator.state(), CoordinatorState::Idle);

        // Later duplicates find nothing.
        assert_eq!(
            f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
            ReturnHandling::NoPendingRequest
        );

        assert_eq!(f.host.len(), 1);
        assert_eq!(store.clear_count(), 1);
        assert_eq!(transport.resolve_count(), 1);
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_SUCCEEDED]);
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL));
        let f = fixture(store.clone(), transport.clone());

        for _ in 0..3 {
            assert_eq!(
                f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
                ReturnHandling::NoPendingRequest
            );
        }
        assert!(f.host.is_empty());
        assert!(f.telemetry.events().is_empty());
        assert_eq!(transport.resolve_count(), 0);
        assert_eq!(store.clear_count(), 0);
    }

    #[tokio::test]
    async fn foreign_host_consumes_token_silently() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport = Arc::new(ScriptedTransport::succeeding(
            "tok-1",
            "myapp://unknown-host/mypath?foo=bar",
        ));
        let f = fixture(store.clone(), transport);

        assert_eq!(
            f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
            ReturnHandling::Ignored
        );
        assert!(f.host.is_empty());
        assert!(f.telemetry.events().is_empty());
        assert_eq!(store.peek(), None);
        assert_eq!(store.clear_count(), 1);
    }

    #[tokio::test]
    async fn undecodable_query_delivers_error_and_partial_payload() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport = Arc::new(ScriptedTransport::succeeding(
            "tok-1",
            "myapp://popupbridgev1/done?bad=%FF#top",
        ));
        let f = fixture(store, transport);

        f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await;

        let scripts = f.host.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains(
            "onComplete(new Error('Failed to parse query items from return URL. "
        ));
        assert!(scripts[0].contains(r#""path":"/done""#));
        assert!(scripts[0].contains(r#""hash":"top""#));
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_FAILED]);
    }

    #[tokio::test]
    async fn no_result_notifies_cancel() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport = Arc::new(ScriptedTransport::new(
            StartResult::Started(PendingRequest::new("tok-1")),
            ReturnOutcome::NoResult,
        ));
        let f = fixture(store, transport);

        assert_eq!(
            f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
            ReturnHandling::Delivered("no-result")
        );
        assert_eq!(f.host.scripts(), vec![CANCELED_SCRIPT.to_owned()]);
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_CANCELED]);
    }

    #[tokio::test]
    async fn resolve_failure_notifies_error() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport = Arc::new(ScriptedTransport::new(
            StartResult::Started(PendingRequest::new("tok-1")),
            ReturnOutcome::Failure {
                error: "flow expired".into(),
            },
        ));
        let f = fixture(store.clone(), transport);

        f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await;
        assert_eq!(
            f.host.scripts(),
            vec![complete_script(Some("new Error('flow expired')"), None)]
        );
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_FAILED]);
        assert_eq!(store.peek(), None);
    }

    #[tokio::test]
    async fn start_failure_reports_error_and_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::new(
            StartResult::Failure("no browser available".into()),
            ReturnOutcome::NoResult,
        ));
        let f = fixture(store.clone(), transport);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let navigations = Arc::new(Mutex::new(Vec::new()));
        {
            let errors = Arc::clone(&errors);
            f.listeners
                .set_error(move |e| errors.lock().expect("lock").push(e.to_string()));
            let navigations = Arc::clone(&navigations);
            f.listeners
                .set_navigation(move |url| navigations.lock().expect("lock").push(url.to_owned()));
        }

        f.coordinator.open("https://pay.example");
        f.coordinator.flush_pending_write().await;

        assert_eq!(
            *errors.lock().expect("lock"),
            vec!["browser switch failed: no browser available"]
        );
        assert_eq!(*navigations.lock().expect("lock"), vec!["https://pay.example"]);
        assert_eq!(store.store_count(), 0);
        assert_eq!(f.telemetry.events(), vec![POPUP_BRIDGE_STARTED]);
    }

    #[tokio::test]
    async fn delivery_waits_for_page_load() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let transport = Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL));
        let f = fixture(store, transport);

        f.page.page_started();
        f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await;
        assert!(f.host.is_empty());

        f.page.page_finished();
        assert_eq!(f.host.len(), 1);
    }

    #[tokio::test]
    async fn latest_open_wins() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::succeeding("tok-2", RETURN_URL));
        let f = fixture(store.clone(), transport);

        store.store(&PendingRequest::new("tok-1")).await.expect("seed");
        f.coordinator.open("https://pay.example/a");
        f.coordinator.open("https://pay.example/b");
        f.coordinator.flush_pending_write().await;

        assert_eq!(store.peek(), Some(PendingRequest::new("tok-2")));
    }

    struct PanickingTransport;

    #[async_trait]
    impl BrowserSwitchTransport for PanickingTransport {
        fn start(&self, _origin: &str, _options: &StartOptions) -> StartResult {
            StartResult::Failure("unused".into())
        }

        async fn resolve(&self, _signal: &ReentrySignal, _request: &PendingRequest) -> ReturnOutcome {
            panic!("transport blew up");
        }
    }

    #[tokio::test]
    async fn panic_during_resolution_releases_guard() {
        let store = Arc::new(MemoryStore::holding(PendingRequest::new("tok-1")));
        let f = fixture(store.clone(), Arc::new(PanickingTransport));

        let coordinator = Arc::clone(&f.coordinator);
        let joined = tokio::spawn(async move {
            coordinator.handle_return_to_app(&ReentrySignal::resumed()).await
        })
        .await;

        assert!(joined.is_err());
        assert_eq!(f.coordinator.state(), CoordinatorState::Idle);
        assert_eq!(store.peek(), None);
        assert_eq!(
            f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
            ReturnHandling::NoPendingRequest
        );
    }

    struct BrokenStore;

    #[async_trait]
    impl PendingRequestStore for BrokenStore {
        async fn store(&self, _request: &PendingRequest) -> Result<()> {
            Err(PopupBridgeError::Store("disk full".into()))
        }

        async fn get(&self) -> Result<Option<PendingRequest>> {
            Err(PopupBridgeError::Store("unreadable".into()))
        }

        async fn clear(&self) -> Result<()> {
            Err(PopupBridgeError::Store("read-only".into()))
        }
    }

    #[tokio::test]
    async fn unreadable_store_is_treated_as_empty() {
        let transport = Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL));
        let f = fixture(Arc::new(BrokenStore), transport.clone());

        f.coordinator.open("https://pay.example");
        assert_eq!(
            f.coordinator.handle_return_to_app(&ReentrySignal::resumed()).await,
            ReturnHandling::NoPendingRequest
        );
        assert_eq!(transport.resolve_count(), 0);
        assert!(f.host.is_empty());
        assert_eq!(f.coordinator.state(), CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn pending_request_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("popupbridge.db");

        {
            let store = Arc::new(SqliteStore::open(&path, "popup_bridge_preferences").expect("open"));
            let transport = Arc::new(ScriptedTransport::succeeding("tok-1", RETURN_URL));
            let f = fixture(store, transport);
            f.coordinator.open("https://pay.example/checkout");
            f.coordinator.flush_pending_write().await;
        }

        let store = Arc::new(SqliteStore::open(&path, "popup_bridge_preferences").expect("reopen"));
        let transport = Arc::new(ScriptedTransport::succeeding("unused", RETURN_URL));
        let f = fixture(store.clone(), transport);

        assert_eq!(
            f.coordinator
                .handle_return_to_app(&ReentrySignal::with_uri(RETURN_URL))
                .await,
            ReturnHandling::Delivered("success")
        );
        assert_eq!(
            f.host.scripts(),
            vec![complete_script(None, Some(&expected_payload()))]
        );
        assert_eq!(store.get().await.expect("get"), None);
    }
}
