// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-facing listeners. Each slot is optional; firing an empty slot is a
// no-op.

use std::sync::{Arc, PoisonError, RwLock};

use popupbridge_core::error::PopupBridgeError;

pub type NavigationListener = Arc<dyn Fn(&str) + Send + Sync>;
pub type MessageListener = Arc<dyn Fn(&str, Option<&str>) + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(&PopupBridgeError) + Send + Sync>;

#[derive(Default)]
pub struct Listeners {
    navigation: RwLock<Option<NavigationListener>>,
    message: RwLock<Option<MessageListener>>,
    error: RwLock<Option<ErrorListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_navigation(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        *self.navigation.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    pub fn set_message(&self, listener: impl Fn(&str, Option<&str>) + Send + Sync + 'static) {
        *self.message.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    pub fn set_error(&self, listener: impl Fn(&PopupBridgeError) + Send + Sync + 'static) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    /// The page asked to open `url`.
    pub fn navigated(&self, url: &str) {
        let listener = self
            .navigation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(url);
        }
    }

    /// The page sent a named message.
    pub fn message(&self, name: &str, data: Option<&str>) {
        let listener = self
            .message
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(name, data);
        }
    }

    pub fn error(&self, error: &PopupBridgeError) {
        let listener = self
            .error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(error);
        }
    }
}
