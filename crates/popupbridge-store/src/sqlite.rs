// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Durable pending-request slot backed by SQLite.
//
// Schema:
//   preferences(
//     namespace  TEXT NOT NULL,   -- e.g. "popup_bridge_preferences"
//     key        TEXT NOT NULL,   -- "pending_request"
//     value      TEXT NOT NULL,   -- opaque token
//     updated_at TEXT NOT NULL,   -- RFC 3339
//     PRIMARY KEY (namespace, key)
//   )
//
// The namespace column keeps this slot apart from anything else sharing the
// database file.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use popupbridge_core::error::{PopupBridgeError, Result};
use popupbridge_core::types::PendingRequest;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use crate::{PENDING_REQUEST_KEY, PendingRequestStore, join_err};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS preferences (
        namespace  TEXT NOT NULL,
        key        TEXT NOT NULL,
        value      TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (namespace, key)
    )
"#;

/// Convert a `rusqlite::Error` into a `PopupBridgeError::Store`.
fn db_err(e: rusqlite::Error) -> PopupBridgeError {
    PopupBridgeError::Store(e.to_string())
}

/// Single-slot store in a SQLite database.
///
/// `rusqlite` is synchronous, so every operation runs on Tokio's blocking
/// pool. The connection sits behind a mutex, which also serializes writes.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) the store database at `path`.
    ///
    /// Enables WAL with `synchronous = FULL` so a write that returned is on
    /// disk even if the process is killed right after the app is backgrounded.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), %namespace))]
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        info!("pending request store opened");
        Ok(Self::from_connection(conn, namespace))
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory(namespace: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory pending request store opened");
        Ok(Self::from_connection(conn, namespace))
    }

    fn from_connection(conn: Connection, namespace: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            namespace: namespace.to_owned(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let namespace = self.namespace.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn, &namespace).map_err(db_err)
        })
        .await
        .map_err(join_err)?
    }
}

#[async_trait]
impl PendingRequestStore for SqliteStore {
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn store(&self, request: &PendingRequest) -> Result<()> {
        let value = request.as_str().to_owned();
        self.with_conn(move |conn, namespace| {
            conn.execute(
                "INSERT INTO preferences (namespace, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, key)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![namespace, PENDING_REQUEST_KEY, value, Utc::now().to_rfc3339()],
            )
        })
        .await?;

        debug!("pending request stored");
        Ok(())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn get(&self) -> Result<Option<PendingRequest>> {
        let value = self
            .with_conn(|conn, namespace| {
                conn.query_row(
                    "SELECT value FROM preferences WHERE namespace = ?1 AND key = ?2",
                    params![namespace, PENDING_REQUEST_KEY],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await?;

        debug!(found = value.is_some(), "pending request read");
        Ok(value.map(PendingRequest::new))
    }

    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn clear(&self) -> Result<()> {
        let rows = self
            .with_conn(|conn, namespace| {
                conn.execute(
                    "DELETE FROM preferences WHERE namespace = ?1 AND key = ?2",
                    params![namespace, PENDING_REQUEST_KEY],
                )
            })
            .await?;

        debug!(rows, "pending request cleared");
        Ok(())
    }
}
