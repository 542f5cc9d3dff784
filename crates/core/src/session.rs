//! Session ids and the client storage they persist in.

use chrono::Utc;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::limits::MAX_SESSION_ID_LEN;

/// Storage key the session id persists under.
pub const SESSION_STORAGE_KEY: &str = "boltpromo_session_id";

/// Prefix of disposable ids generated outside a browser.
pub const SERVER_SESSION_PREFIX: &str = "ssr_";

/// Length of the random base36 suffix.
const SUFFIX_LEN: usize = 13;

static PERSISTED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+_[0-9a-z]+$").expect("static regex"));

/// A session id: `<unix-millis>_<base36 suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh id.
    pub fn generate() -> Self {
        Self(format!("{}_{}", Utc::now().timestamp_millis(), random_suffix()))
    }

    /// Generates a per-render id for contexts without persistent storage.
    pub fn disposable() -> Self {
        Self(format!("{}{}", SERVER_SESSION_PREFIX, Self::generate().0))
    }

    /// Accepts a previously persisted id if it has the expected shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (raw.len() <= MAX_SESSION_ID_LEN && PERSISTED_ID.is_match(raw))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_disposable(&self) -> bool {
        self.0.starts_with(SERVER_SESSION_PREFIX)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base36 rendering of fresh randomness, `SUFFIX_LEN` chars.
fn random_suffix() -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    out
}

/// Key-value client storage (the browser's `localStorage` equivalent).
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Returns the persisted session id, creating and persisting one on first use.
///
/// A stored value that does not look like a session id is replaced.
pub fn resolve_session_id(store: &dyn SessionStore) -> Result<SessionId> {
    if let Some(existing) = store.get(SESSION_STORAGE_KEY)?.as_deref().and_then(SessionId::parse) {
        return Ok(existing);
    }

    let id = SessionId::generate();
    store.set(SESSION_STORAGE_KEY, id.as_str())?;
    Ok(id)
}

/// In-memory storage, cleared when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file (one per profile).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::storage(format!("corrupt storage file {}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
