use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{
    CreateStoreDirectorySnafu, ParseStoreSnafu, ReadStoreSnafu, ReplaceStoreSnafu,
    SerializeStoreSnafu, StorageResult, WriteStoreSnafu,
};

type Entries = BTreeMap<String, String>;

/// Local-storage replacement backed by one JSON object on disk.
///
/// Reads are served from an in-memory snapshot; every write rewrites the whole
/// file through a temporary sibling so a crash never leaves a torn file behind.
pub struct FileStore {
    path: PathBuf,
    entries: ArcSwap<Entries>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened local store");

        Ok(Self {
            path,
            entries: ArcSwap::from_pointee(entries),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modify(&self, apply: impl FnOnce(&mut Entries) -> bool) -> StorageResult<()> {
        // Poisoning only means another writer panicked mid-update; the snapshot is still whole.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut next = Entries::clone(&self.entries.load());
        if !apply(&mut next) {
            return Ok(());
        }

        persist_entries(&self.path, &next)?;
        self.entries.store(Arc::new(next));
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.load().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|entries| {
            let previous = entries.insert(key.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }
}

fn load_entries(path: &Path) -> StorageResult<Entries> {
    if !path.exists() {
        return Ok(Entries::new());
    }

    let content = std::fs::read_to_string(path).context(ReadStoreSnafu {
        stage: "read-store-file",
        path: display_path(path),
    })?;
    if content.trim().is_empty() {
        return Ok(Entries::new());
    }

    serde_json::from_str(&content).context(ParseStoreSnafu {
        stage: "parse-store-file",
        path: display_path(path),
    })
}

fn persist_entries(path: &Path, entries: &Entries) -> StorageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateStoreDirectorySnafu {
            stage: "create-store-directory",
            path: display_path(parent),
        })?;
    }

    let content = serde_json::to_string_pretty(entries).context(SerializeStoreSnafu {
        stage: "serialize-store-json",
    })?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content).context(WriteStoreSnafu {
        stage: "write-temporary-store-file",
        path: display_path(&temp_path),
    })?;

    std::fs::rename(&temp_path, path).context(ReplaceStoreSnafu {
        stage: "rename-temporary-store-file",
        from: display_path(&temp_path),
        to: display_path(path),
    })
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
