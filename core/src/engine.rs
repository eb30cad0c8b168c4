//! The profile engine — wires builder, store and applier together.
//!
//! SAVE: build (caller's thread, reads live state) → encode + write.
//! LOAD: read + decode → apply (caller's thread, writes live state).
//!
//! RULES:
//!   - The builder runs on the caller's thread because it reads live,
//!     mutable objects. Only the finished snapshot may go to a worker.
//!   - The applier is invoked only after the store returned a complete
//!     snapshot. A failed or cancelled load never touches live state.

use crate::{
    applier::{ApplyReport, SnapshotApplier},
    builder::{BuildReport, MissingSlicePolicy, SnapshotBuilder},
    config::StoreConfig,
    error::{ProfileResult, StoreResult},
    store::{BackgroundSave, CancelToken, ProfileStore, SlotBackend},
    subsystem::WorldContext,
    types::ProfileId,
};
use std::sync::Arc;

pub struct ProfileEngine<B: SlotBackend> {
    store:   Arc<ProfileStore<B>>,
    builder: SnapshotBuilder,
    applier: SnapshotApplier,
}

impl<B: SlotBackend> ProfileEngine<B> {
    pub fn new(store: ProfileStore<B>, policy: MissingSlicePolicy) -> Self {
        Self {
            store:   Arc::new(store),
            builder: SnapshotBuilder::new(policy),
            applier: SnapshotApplier::new(),
        }
    }

    pub fn store(&self) -> &ProfileStore<B> {
        &self.store
    }

    /// Capture the world and write it to slot `id`.
    pub fn save_world(&self, ctx: &WorldContext<'_>, id: &ProfileId) -> ProfileResult<BuildReport> {
        let (snapshot, report) = self.builder.build(ctx, id.clone())?;
        self.store.save_profile(id, &snapshot)?;
        Ok(report)
    }

    /// Read slot `id` and push it into the world.
    pub fn load_into_world(
        &self,
        ctx: &mut WorldContext<'_>,
        id: &ProfileId,
    ) -> ProfileResult<ApplyReport> {
        let snapshot = self.store.load_profile(id)?;
        Ok(self.applier.apply(ctx, snapshot))
    }

    /// As `load_into_world`; if `cancel` fires before the snapshot is
    /// fully decoded, returns `Cancelled` and the world is untouched.
    pub fn load_into_world_cancellable(
        &self,
        ctx: &mut WorldContext<'_>,
        id: &ProfileId,
        cancel: &CancelToken,
    ) -> ProfileResult<ApplyReport> {
        let snapshot = self.store.load_profile_cancellable(id, cancel)?;
        Ok(self.applier.apply(ctx, snapshot))
    }
}

impl<B: SlotBackend + 'static> ProfileEngine<B> {
    /// Capture on this thread, then encode and write on a worker.
    pub fn save_world_in_background(
        &self,
        ctx: &WorldContext<'_>,
        id: &ProfileId,
    ) -> ProfileResult<(BackgroundSave, BuildReport)> {
        let (snapshot, report) = self.builder.build(ctx, id.clone())?;
        let pending = self.store.save_profile_in_background(id.clone(), snapshot);
        Ok((pending, report))
    }
}

impl ProfileEngine<Box<dyn SlotBackend>> {
    /// Build a fully wired engine from a config.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let store = config.open_store()?;
        Ok(Self::new(store, config.missing_slice_policy))
    }
}
