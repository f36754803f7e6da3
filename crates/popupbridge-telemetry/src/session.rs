// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analytics session context.
//
// The session id ties the events of one bridge instance together. It is
// owned by whoever constructs the client and reset explicitly there; there
// is no process-global session.

use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

/// Holder of the current analytics session id.
#[derive(Debug)]
pub struct SessionContext {
    session_id: RwLock<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: RwLock::new(formatted_uuid()),
        }
    }

    /// Current session id: 32 lowercase hex characters.
    pub fn session_id(&self) -> String {
        self.session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new session.
    pub fn reset(&self) {
        *self
            .session_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = formatted_uuid();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Random UUID v4 without dashes.
fn formatted_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}
