//! SQLite slot backend.
//!
//! RULE: Only this file talks to the database.
//! Each write is a single upsert inside a transaction, so the slot row
//! holds either the old payload or the new one.

use crate::{
    error::{StoreError, StoreResult},
    store::backend::SlotBackend,
    types::ProfileId,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct SqliteSlots {
    conn: Mutex<Connection>,
}

impl SqliteSlots {
    /// Open (or create) the slot database at `path`.
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; in-memory ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StoreResult<()> {
        self.conn()
            .execute_batch(include_str!("../../../migrations/001_profile_slots.sql"))?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert(&self, id: &ProfileId, payload: &[u8]) -> rusqlite::Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO profile_slot (slot_name, slot_index, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (slot_name, slot_index)
             DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            params![
                id.slot_name,
                i64::from(id.slot_index),
                payload,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()
    }
}

impl SlotBackend for SqliteSlots {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn read(&self, id: &ProfileId) -> StoreResult<Option<Vec<u8>>> {
        let payload = self
            .conn()
            .query_row(
                "SELECT payload FROM profile_slot WHERE slot_name = ?1 AND slot_index = ?2",
                params![id.slot_name, i64::from(id.slot_index)],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn write(&self, id: &ProfileId, payload: &[u8]) -> StoreResult<()> {
        self.upsert(id, payload).map_err(|e| {
            log::error!("write to slot {id} failed: {e}");
            StoreError::WriteFailure { id: id.clone(), source: std::io::Error::other(e) }
        })
    }

    fn remove(&self, id: &ProfileId) -> StoreResult<bool> {
        let removed = self.conn().execute(
            "DELETE FROM profile_slot WHERE slot_name = ?1 AND slot_index = ?2",
            params![id.slot_name, i64::from(id.slot_index)],
        )?;
        Ok(removed > 0)
    }

    fn slots(&self) -> StoreResult<Vec<ProfileId>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT slot_name, slot_index FROM profile_slot
             ORDER BY slot_name ASC, slot_index ASC",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids = Vec::with_capacity(rows.len());
        for (name, index) in rows {
            let Ok(index) = u32::try_from(index) else {
                log::warn!("ignoring slot row '{name}' with out-of-range index {index}");
                continue;
            };
            let id = ProfileId::new(name, index);
            match id.validate() {
                Ok(()) => ids.push(id),
                Err(reason) => log::warn!("ignoring slot row {id}: {reason}"),
            }
        }
        Ok(ids)
    }
}
