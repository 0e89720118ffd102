use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Storage keys, one per persisted session field.
pub mod keys {
    pub const RECENT_PROMPT: &str = "recent_prompt";
    pub const PROMPT_HISTORY: &str = "prompt_history";
    pub const TRANSCRIPT: &str = "transcript";
    pub const DISPLAYED_RESPONSE: &str = "displayed_response";
    pub const RESULT_VISIBLE: &str = "result_visible";
    pub const SELECTED_MODEL: &str = "selected_model";
}

/// Durable key/value string storage.
pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key under a state directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(key)))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("read state file: {}", path.display()))?;
        Ok(Some(data))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create state dir: {}", self.dir.display()))?;
        let path = self.path_for(key);
        let mut tmp = path.clone();
        tmp.set_extension("json.tmp");
        {
            let mut f =
                fs::File::create(&tmp).with_context(|| format!("create tmp: {}", tmp.display()))?;
            f.write_all(value.as_bytes())?;
            f.flush()?;
        }
        fs::rename(&tmp, &path).with_context(|| format!("persist {} to {}", key, path.display()))?;
        Ok(())
    }
}

/// In-process storage; nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }
    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }
}

pub fn state_dir() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    Some(base.data_dir().join("gemchat").join("state"))
}

/// Storage for the running app: files under the user's data dir, or memory
/// when no home directory can be resolved.
pub fn default_storage() -> Box<dyn Storage> {
    match state_dir() {
        Some(dir) => Box::new(FileStorage::new(dir)),
        None => {
            warn!(target: "tui::persist", "no data directory; session state will not be saved");
            Box::new(MemoryStorage::default())
        }
    }
}

/// Read and decode one field. Missing, unreadable, or corrupt entries give `None`.
pub fn load_field<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(target: "tui::persist", "cannot read {}: {:#}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(target: "tui::persist", "discarding corrupt {}: {}", key, e);
            None
        }
    }
}

/// Encode and write one field. Failures are logged, never returned.
pub fn save_field<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            warn!(target: "tui::persist", "cannot encode {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = storage.write(key, &encoded) {
        warn!(target: "tui::persist", "cannot save {}: {:#}", key, e);
    }
}

fn sanitize(name: &str) -> String {
    let mut s = name
        .trim()
        .replace(['<', '>', ':', '"', '/', '\\', '|', '?', '*'], "_");
    if s.is_empty() {
        s = "default".to_string();
    }
    s
}
