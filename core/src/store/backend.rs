//! Raw slot storage. Backends move opaque payload bytes; they never
//! interpret them. Encoding lives in `codec.rs`.

use crate::{error::StoreResult, types::ProfileId};

pub trait SlotBackend: Send + Sync {
    /// Stable backend name for logs.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when nothing is stored at `id`.
    fn read(&self, id: &ProfileId) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the payload at `id` atomically: afterwards the slot holds
    /// either the old payload or the complete new one, never a mix.
    fn write(&self, id: &ProfileId, payload: &[u8]) -> StoreResult<()>;

    /// Returns whether a payload was removed.
    fn remove(&self, id: &ProfileId) -> StoreResult<bool>;

    /// Every slot that currently holds a payload.
    fn slots(&self) -> StoreResult<Vec<ProfileId>>;
}

impl<B: SlotBackend + ?Sized> SlotBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, id: &ProfileId) -> StoreResult<Option<Vec<u8>>> {
        (**self).read(id)
    }

    fn write(&self, id: &ProfileId, payload: &[u8]) -> StoreResult<()> {
        (**self).write(id, payload)
    }

    fn remove(&self, id: &ProfileId) -> StoreResult<bool> {
        (**self).remove(id)
    }

    fn slots(&self) -> StoreResult<Vec<ProfileId>> {
        (**self).slots()
    }
}
