// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pending-request slot kept in the platform's native preferences
// (SharedPreferences on Android).

use std::sync::Arc;

use async_trait::async_trait;
use popupbridge_core::error::Result;
use popupbridge_core::types::PendingRequest;
use popupbridge_webview::traits::NativePreferences;
use tracing::{debug, instrument};

use crate::{PENDING_REQUEST_KEY, PendingRequestStore, join_err};

/// Store that delegates to a [`NativePreferences`] implementation.
///
/// Native preference calls block, so each one runs on Tokio's blocking pool.
pub struct PreferencesStore<P> {
    prefs: Arc<P>,
    namespace: String,
}

impl<P> PreferencesStore<P>
where
    P: NativePreferences + Send + Sync + 'static,
{
    pub fn new(prefs: Arc<P>, namespace: impl Into<String>) -> Self {
        Self {
            prefs,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl<P> PendingRequestStore for PreferencesStore<P>
where
    P: NativePreferences + Send + Sync + 'static,
{
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn store(&self, request: &PendingRequest) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        let namespace = self.namespace.clone();
        let value = request.as_str().to_owned();
        tokio::task::spawn_blocking(move || {
            prefs.put_string(&namespace, PENDING_REQUEST_KEY, &value)
        })
        .await
        .map_err(join_err)??;

        debug!("pending request stored");
        Ok(())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn get(&self) -> Result<Option<PendingRequest>> {
        let prefs = Arc::clone(&self.prefs);
        let namespace = self.namespace.clone();
        let value = tokio::task::spawn_blocking(move || {
            prefs.get_string(&namespace, PENDING_REQUEST_KEY)
        })
        .await
        .map_err(join_err)??;

        Ok(value.map(PendingRequest::new))
    }

    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn clear(&self) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        let namespace = self.namespace.clone();
        tokio::task::spawn_blocking(move || prefs.remove(&namespace, PENDING_REQUEST_KEY))
            .await
            .map_err(join_err)??;

        debug!("pending request cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use popupbridge_core::error::PopupBridgeError;

    use super::*;

    /// Preferences kept in a map keyed by (namespace, key).
    #[derive(Default)]
    struct MapPreferences {
        values: Mutex<HashMap<(String, String), String>>,
    }

    impl NativePreferences for MapPreferences {
        fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>> {
            let values = self.values.lock().unwrap();
            Ok(values.get(&(namespace.into(), key.into())).cloned())
        }

        fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert((namespace.into(), key.into()), value.into());
            Ok(())
        }

        fn remove(&self, namespace: &str, key: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .remove(&(namespace.into(), key.into()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn round_trips_through_native_preferences() {
        let prefs = Arc::new(MapPreferences::default());
        let store = PreferencesStore::new(prefs.clone(), "popup_bridge_preferences");

        assert_eq!(store.get().await.expect("get"), None);
        store.store(&PendingRequest::new("tok")).await.expect("store");
        assert_eq!(
            prefs
                .get_string("popup_bridge_preferences", PENDING_REQUEST_KEY)
                .expect("native get")
                .as_deref(),
            Some("tok")
        );

        store.clear().await.expect("clear");
        assert_eq!(store.get().await.expect("get"), None);
    }

    #[cfg(not(target_os = "android"))]
    #[tokio::test]
    async fn stub_platform_surfaces_unavailable() {
        let store = PreferencesStore::new(
            Arc::new(popupbridge_webview::stub::StubBridge),
            "popup_bridge_preferences",
        );
        assert!(matches!(
            store.get().await,
            Err(PopupBridgeError::PlatformUnavailable)
        ));
    }
}
