//! Synchronous key-value stores for the credential pair.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key of the persisted access token.
pub const ACCESS_TOKEN_KEY: &str = "auth-token";

/// Key of the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh-token";

/// Origin-scoped, synchronous string store.
pub trait CredentialStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;

    fn remove(&self, key: &str) -> std::io::Result<()>;
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// JSON-file store. Every mutation rewrites the whole file.
///
/// Writes go to a temporary sibling that is renamed over the target, so the
/// file on disk is always either the old or the new contents. A failed write
/// rolls the in-memory entry back.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open `path`, loading existing entries when the file exists.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let raw: HashMap<String, Value> = serde_json::from_reader(reader)?;
            entries.extend(
                raw.into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string()))),
            );
            tracing::debug!(path = ?path, entries = entries.len(), "Loaded credential store");
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &HashMap<String, String>) -> std::io::Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, entries)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut entries = lock(&self.entries);
        let previous = entries.insert(key.to_string(), value.to_string());
        self.save(&entries).inspect_err(|_| restore(&mut entries, key, previous))
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut entries = lock(&self.entries);
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        self.save(&entries)
            .inspect_err(|_| restore(&mut entries, key, Some(previous)))
    }
}

fn restore(entries: &mut HashMap<String, String>, key: &str, previous: Option<String>) {
    match previous {
        Some(value) => entries.insert(key.to_string(), value),
        None => entries.remove(key),
    };
}

// A panic while holding the lock cannot leave a HashMap half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
