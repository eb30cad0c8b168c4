//! Profile store — persists snapshots to named, indexed slots.
//!
//! RULES:
//!   - Only the store encodes/decodes payloads (via `codec`) and only
//!     backends touch storage.
//!   - Save and load on the same slot never interleave: each call holds
//!     that slot's lock for its full duration, released on every exit path.
//!     Distinct slots proceed in parallel.
//!   - A failed call never leaves a partial result: loads return a whole
//!     snapshot or an error, saves replace the slot atomically or not at all.

mod backend;
mod file;
mod sqlite;

pub use backend::SlotBackend;
pub use file::{FileSlots, SLOT_EXTENSION};
pub use sqlite::SqliteSlots;

use crate::{
    codec,
    error::{StoreError, StoreResult},
    slices::ProfileMetadata,
    snapshot::SnapshotAggregate,
    types::{ProfileId, SchemaVersion, CURRENT_SCHEMA_VERSION},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// One row of a slot listing. Only Meta was decoded to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub id:             ProfileId,
    pub meta:           ProfileMetadata,
    pub schema_version: SchemaVersion,
}

/// Cooperative cancellation for long-running loads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-slot mutual exclusion. An entry lives only while some call holds
/// or waits on it.
#[derive(Default)]
struct SlotLocks {
    slots: Mutex<HashMap<ProfileId, Arc<Mutex<()>>>>,
}

impl SlotLocks {
    /// Run `f` while holding slot `id`'s lock.
    fn with_slot<T>(&self, id: &ProfileId, f: impl FnOnce() -> T) -> T {
        let slot = self.slot(id);
        let out = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(id, slot);
        out
    }

    fn slot(&self, id: &ProfileId) -> Arc<Mutex<()>> {
        let mut slots = self.map();
        slots.entry(id.clone()).or_default().clone()
    }

    /// Clones are only handed out under the map lock, so a count of one
    /// here means no other call holds or waits on this slot.
    fn release(&self, id: &ProfileId, slot: Arc<Mutex<()>>) {
        let mut slots = self.map();
        drop(slot);
        if slots.get(id).is_some_and(|s| Arc::strong_count(s) == 1) {
            slots.remove(id);
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<ProfileId, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

pub struct ProfileStore<B: SlotBackend> {
    backend:       B,
    locks:         SlotLocks,
    write_version: SchemaVersion,
}

impl<B: SlotBackend> ProfileStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: SlotLocks::default(),
            write_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Write payloads at an older schema version so older builds can
    /// read them. Slices that version does not know are not written.
    pub fn with_write_version(mut self, version: SchemaVersion) -> Self {
        self.write_version = version;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn write_version(&self) -> SchemaVersion {
        self.write_version
    }

    /// Serialize `snapshot` in canonical order and replace slot `id`.
    pub fn save_profile(&self, id: &ProfileId, snapshot: &SnapshotAggregate) -> StoreResult<()> {
        validate_id(id)?;
        if snapshot.profile_id != *id {
            log::warn!(
                "snapshot built for {} is being saved to slot {id}",
                snapshot.profile_id
            );
        }

        // Encoding fails before the slot is touched; the previous payload stays.
        let payload = codec::encode_at_version(snapshot, self.write_version).map_err(|e| {
            log::error!("refusing to save slot {id}: {e}");
            StoreError::UnsavableSnapshot { id: id.clone(), reason: e.to_string() }
        })?;

        self.locks.with_slot(id, || self.backend.write(id, &payload))?;
        log::info!(
            "saved profile {id} ({} bytes, schema v{}, {} backend)",
            payload.len(),
            self.write_version,
            self.backend.name()
        );
        Ok(())
    }

    /// Decode slot `id` into a fresh snapshot.
    pub fn load_profile(&self, id: &ProfileId) -> StoreResult<SnapshotAggregate> {
        self.load_inner(id, None)
    }

    /// Like `load_profile`, but gives up with `Cancelled` once `cancel`
    /// fires. Nothing outside the store has been touched at that point.
    pub fn load_profile_cancellable(
        &self,
        id: &ProfileId,
        cancel: &CancelToken,
    ) -> StoreResult<SnapshotAggregate> {
        self.load_inner(id, Some(cancel))
    }

    fn load_inner(
        &self,
        id: &ProfileId,
        cancel: Option<&CancelToken>,
    ) -> StoreResult<SnapshotAggregate> {
        validate_id(id)?;
        let check = || match cancel {
            Some(token) if token.is_cancelled() => Err(StoreError::Cancelled { id: id.clone() }),
            _ => Ok(()),
        };

        check()?;
        self.locks.with_slot(id, || -> StoreResult<SnapshotAggregate> {
            check()?;
            let payload = self
                .backend
                .read(id)?
                .ok_or_else(|| StoreError::SlotNotFound { id: id.clone() })?;

            check()?;
            let snapshot = codec::decode(&payload, id.clone()).map_err(|e| {
                log::warn!("slot {id} failed to decode: {e}");
                StoreError::CorruptPayload { id: id.clone(), reason: e.to_string() }
            })?;

            check()?;
            log::info!("loaded profile {id} ({} bytes)", payload.len());
            Ok(snapshot)
        })
    }

    /// Every slot with a readable Meta section, newest `last_played_utc`
    /// first. Slots that cannot be read or whose Meta does not decode are
    /// skipped.
    pub fn list_profiles(&self) -> StoreResult<Vec<ProfileSummary>> {
        let mut summaries = Vec::new();
        for id in self.backend.slots()? {
            let payload = match self.backend.read(&id) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("skipping unreadable slot {id} in listing: {e}");
                    continue;
                }
            };
            match codec::decode_meta(&payload) {
                Ok((schema_version, meta)) => {
                    summaries.push(ProfileSummary { id, meta, schema_version })
                }
                Err(e) => log::warn!("skipping slot {id} in listing: {e}"),
            }
        }

        summaries.sort_by(|a, b| {
            b.meta
                .last_played_utc
                .cmp(&a.meta.last_played_utc)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(summaries)
    }

    pub fn slot_exists(&self, id: &ProfileId) -> StoreResult<bool> {
        validate_id(id)?;
        Ok(self.backend.read(id)?.is_some())
    }

    /// Returns whether a payload was removed.
    pub fn delete_profile(&self, id: &ProfileId) -> StoreResult<bool> {
        validate_id(id)?;
        let removed = self.locks.with_slot(id, || self.backend.remove(id))?;
        if removed {
            log::info!("deleted profile {id}");
        }
        Ok(removed)
    }
}

impl<B: SlotBackend + 'static> ProfileStore<B> {
    /// Encode and write on a worker thread. The snapshot is already an
    /// immutable value, so the caller's world can move on immediately.
    pub fn save_profile_in_background(
        self: &Arc<Self>,
        id: ProfileId,
        snapshot: SnapshotAggregate,
    ) -> BackgroundSave {
        let store = Arc::clone(self);
        let worker_id = id.clone();
        let handle = std::thread::spawn(move || store.save_profile(&worker_id, &snapshot));
        BackgroundSave { id, handle }
    }
}

/// A save running on a worker thread.
pub struct BackgroundSave {
    id:     ProfileId,
    handle: JoinHandle<StoreResult<()>>,
}

impl BackgroundSave {
    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the save completes.
    pub fn wait(self) -> StoreResult<()> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(StoreError::WorkerPanicked { id: self.id }))
    }
}

fn validate_id(id: &ProfileId) -> StoreResult<()> {
    id.validate()
        .map_err(|reason| StoreError::InvalidProfileId { reason })
}
