use crate::{
    builder::MissingSlicePolicy,
    error::StoreResult,
    store::{FileSlots, ProfileStore, SlotBackend, SqliteSlots},
    types::{SchemaVersion, CURRENT_SCHEMA_VERSION},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

fn default_fsync() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Slot directory for `file`, database path for `sqlite`.
    pub root: PathBuf,
    #[serde(default = "default_fsync")]
    pub fsync: bool,
    #[serde(default)]
    pub missing_slice_policy: MissingSlicePolicy,
    /// Schema version to write. Defaults to the current one.
    #[serde(default)]
    pub write_version: Option<SchemaVersion>,
}

impl StoreConfig {
    /// Load from a JSON file.
    /// In tests, use StoreConfig::default_test().
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// File backend at `root`, fsync off.
    pub fn default_test(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            root: root.into(),
            fsync: false,
            missing_slice_policy: MissingSlicePolicy::UseDefault,
            write_version: None,
        }
    }

    pub fn write_version(&self) -> SchemaVersion {
        self.write_version.unwrap_or(CURRENT_SCHEMA_VERSION)
    }

    fn check(&self) -> anyhow::Result<()> {
        let version = self.write_version();
        if version == 0 || version > CURRENT_SCHEMA_VERSION {
            anyhow::bail!(
                "write_version {version} not in 1..={CURRENT_SCHEMA_VERSION}"
            );
        }
        Ok(())
    }

    /// Construct the configured backend and wrap it in a store.
    pub fn open_store(&self) -> StoreResult<ProfileStore<Box<dyn SlotBackend>>> {
        let backend: Box<dyn SlotBackend> = match self.backend {
            BackendKind::File => {
                let slots = FileSlots::open(&self.root)?;
                if self.fsync {
                    Box::new(slots)
                } else {
                    Box::new(slots.without_fsync())
                }
            }
            BackendKind::Sqlite => {
                let slots = SqliteSlots::open(&self.root.to_string_lossy())?;
                slots.migrate()?;
                Box::new(slots)
            }
        };
        log::debug!("opened {} slot store at {}", backend.name(), self.root.display());
        Ok(ProfileStore::new(backend).with_write_version(self.write_version()))
    }
}
