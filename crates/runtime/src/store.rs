// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Opens the runtime database in WAL journal mode — "one writer, many
//! concurrent readers" (§4.F) — and exposes a single shared connection
//! guarded by a `parking_lot::Mutex`, matching the teacher's
//! `Arc<Mutex<State>>` pattern around its own state store.

use crate::schema;
use lodestar_core::LodestarError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RuntimeStore {
    conn: Arc<Mutex<Connection>>,
}

impl RuntimeStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LodestarError> {
        let mut conn = Connection::open(path)
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot open database: {e}") })?;
        Self::configure(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory database for tests; shares all schema/migration behavior
    /// with [`Self::open`].
    pub fn open_in_memory() -> Result<Self, LodestarError> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot open in-memory database: {e}") })?;
        Self::configure(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn configure(conn: &mut Connection) -> Result<(), LodestarError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot set WAL journal mode: {e}") })?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot set busy timeout: {e}") })?;
        schema::run_migrations(conn)
    }

    /// Run `f` with exclusive access to the connection, inside a
    /// transaction. Any error returned from `f` rolls the transaction back.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, LodestarError>,
    ) -> Result<T, LodestarError> {
        let mut guard = self.conn.lock();
        let tx = guard.transaction().map_err(Self::map_busy)?;
        let result = f(&tx)?;
        tx.commit().map_err(Self::map_busy)?;
        Ok(result)
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T, LodestarError>) -> Result<T, LodestarError> {
        let guard = self.conn.lock();
        f(&guard)
    }

    fn map_busy(err: rusqlite::Error) -> LodestarError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
                LodestarError::RuntimeBusy { reason: err.to_string() }
            }
            _ => LodestarError::RuntimeCorrupt { reason: err.to_string() },
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
