//! One file per slot: `<root>/<slot_name>.<slot_index>.sav`.
//!
//! Writes go to a uniquely named file under `<root>/.staging/`, are
//! flushed to disk, then renamed over the slot file. Rename within one
//! filesystem is atomic, so a failed or interrupted save leaves the
//! previous payload as the durable state.

use crate::{
    error::{StoreError, StoreResult},
    store::backend::SlotBackend,
    types::ProfileId,
};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const SLOT_EXTENSION: &str = "sav";
const STAGING_DIR: &str = ".staging";
const STAGING_EXTENSION: &str = "tmp";
/// Staging files younger than this may belong to a save still in flight
/// from another process sharing the root.
const STALE_STAGING_AGE: Duration = Duration::from_secs(10 * 60);

pub struct FileSlots {
    root:    PathBuf,
    staging: PathBuf,
    fsync:   bool,
}

impl FileSlots {
    /// Open (or create) a slot directory at `root`. Staging files left by
    /// a crashed save are removed once they are older than ten minutes.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging)?;

        let slots = Self { root, staging, fsync: true };
        slots.sweep_staging()?;
        Ok(slots)
    }

    /// Skip fsync on write. Faster, loses durability on power loss; the
    /// rename is still atomic.
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn path_for(&self, id: &ProfileId) -> PathBuf {
        self.root
            .join(format!("{}.{}.{SLOT_EXTENSION}", id.slot_name, id.slot_index))
    }

    fn sweep_staging(&self) -> StoreResult<()> {
        let now = SystemTime::now();
        for entry in fs::read_dir(&self.staging)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STAGING_EXTENSION) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            match age {
                Some(age) if age >= STALE_STAGING_AGE => {
                    log::warn!("removing stale staging file {}", path.display());
                    let _ = fs::remove_file(&path);
                }
                _ => log::debug!("leaving recent staging file {}", path.display()),
            }
        }
        Ok(())
    }

    fn write_staged(&self, tmp: &Path, payload: &[u8]) -> io::Result<()> {
        let mut file = File::create(tmp)?;
        file.write_all(payload)?;
        if self.fsync {
            file.sync_all()?;
        }
        Ok(())
    }

    #[cfg(unix)]
    fn sync_root(&self) {
        if let Err(e) = File::open(&self.root).and_then(|dir| dir.sync_all()) {
            log::warn!("could not sync slot directory {}: {e}", self.root.display());
        }
    }

    #[cfg(not(unix))]
    fn sync_root(&self) {}
}

/// Parse `<name>.<index>.sav`.
fn parse_slot_file(file_name: &str) -> Option<ProfileId> {
    let stem = file_name.strip_suffix(SLOT_EXTENSION)?.strip_suffix('.')?;
    let (name, index) = stem.rsplit_once('.')?;
    let id = ProfileId::new(name, index.parse().ok()?);
    id.validate().ok()?;
    Some(id)
}

impl SlotBackend for FileSlots {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&self, id: &ProfileId) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, id: &ProfileId, payload: &[u8]) -> StoreResult<()> {
        let tmp = self
            .staging
            .join(format!("{}.{STAGING_EXTENSION}", uuid::Uuid::new_v4()));
        let target = self.path_for(id);

        let result = self
            .write_staged(&tmp, payload)
            .and_then(|()| fs::rename(&tmp, &target));

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            log::error!("write to slot {id} failed: {source}");
            return Err(StoreError::WriteFailure { id: id.clone(), source });
        }
        if self.fsync {
            self.sync_root();
        }
        Ok(())
    }

    fn remove(&self, id: &ProfileId) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn slots(&self) -> StoreResult<Vec<ProfileId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_slot_file) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
