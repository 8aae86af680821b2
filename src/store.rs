//! Reactive key-value documents persisted to a single JSON file.
//!
//! A [`MetadataStore`] stays empty until [`MetadataStore::bind`] points it at
//! a file. Every mutation after that writes the whole document back through
//! a temp file and a rename, so a crash may lose the last write but never
//! leaves a half-written file behind. In strict mode, mutating an unbound
//! store is refused instead of silently keeping values that would never reach
//! disk.

use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, warn};

use crate::{error::StoreError, fs::FileSystemGateway};

pub type Document = serde_json::Map<String, Value>;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A single key changing value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub key: String,
    pub value: Value,
}

/// What [`MetadataStore::bind`] found at the bound path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file existed and was merged into memory.
    Loaded,
    /// No file existed; an empty document was written.
    Created,
    /// The file existed but was not a JSON object. Memory is left empty and
    /// the file is not rewritten until the next successful write.
    Malformed(String),
}

struct StoreState {
    path: Option<PathBuf>,
    defaults: Document,
    values: Document,
}

pub struct MetadataStore {
    name: String,
    strict: bool,
    fs: Arc<dyn FileSystemGateway>,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<FieldChange>,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("name", &self.name)
            .field("strict", &self.strict)
            .field("path", &self.path())
            .finish()
    }
}

impl MetadataStore {
    /// Creates an unbound store in strict mode.
    pub fn new(name: impl Into<String>, fs: Arc<dyn FileSystemGateway>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            strict: true,
            fs,
            state: RwLock::new(StoreState {
                path: None,
                defaults: Document::new(),
                values: Document::new(),
            }),
            write_lock: Mutex::new(()),
            changes,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.read_state().path.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.read_state().path.is_some()
    }

    /// True when nothing but registered defaults is held in memory.
    pub fn is_empty(&self) -> bool {
        self.read_state().values.is_empty()
    }

    /// Registers a persisted field and the value it reports until set.
    pub fn register(&self, key: &str, default: Value) {
        self.write_state().defaults.insert(key.to_string(), default);
    }

    /// Typed handle on a field of this store.
    pub fn field<T>(self: &Arc<Self>, key: &str) -> Field<T> {
        Field {
            store: Arc::clone(self),
            key: key.to_string(),
            _marker: PhantomData,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.read_state();
        state
            .values
            .get(key)
            .or_else(|| state.defaults.get(key))
            .cloned()
    }

    /// Stored value for `key` decoded as `T`, or `default` when missing or of
    /// the wrong shape.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                debug!(store = %self.name, key, error = %e, "stored value has unexpected shape");
                default
            }),
            None => default,
        }
    }

    /// Full document: registered defaults overlaid by stored values.
    pub fn to_document(&self) -> Document {
        let state = self.read_state();
        let mut document = state.defaults.clone();
        for (key, value) in state.values.iter() {
            document.insert(key.clone(), value.clone());
        }
        document
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldChange> {
        self.changes.subscribe()
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_writable(key)?;
        let changed = {
            let mut state = self.write_state();
            if state.values.get(key) == Some(&value) {
                false
            } else {
                state.values.insert(key.to_string(), value.clone());
                true
            }
        };
        if changed {
            self.notify(key, value);
            self.persist().await;
        }
        Ok(())
    }

    /// Merges `data` into memory. See [`merge_documents`] for the rules.
    /// Returns whether anything changed; changes are persisted.
    pub async fn merge_inbound(&self, data: Document, force: bool) -> Result<bool, StoreError> {
        self.ensure_writable("<merge>")?;
        let changed = {
            let mut state = self.write_state();
            merge_documents(&mut state.values, data, force)
        };
        if changed.is_empty() {
            return Ok(false);
        }
        for key in changed.iter() {
            if let Some(value) = self.get(key) {
                self.notify(key, value);
            }
        }
        self.persist().await;
        Ok(true)
    }

    /// Binds the store to `path` and loads it.
    ///
    /// Binding to a different path than the current one first discards
    /// everything held in memory. A missing file is created empty. A file
    /// that does not hold a JSON object is reported as
    /// [`LoadOutcome::Malformed`] and left on disk untouched.
    pub async fn bind(&self, path: &Path) -> Result<LoadOutcome, StoreError> {
        {
            let mut state = self.write_state();
            if state.path.as_deref() != Some(path) {
                if !state.values.is_empty() {
                    debug!(store = %self.name, "discarding values cached before binding");
                }
                state.values.clear();
            }
            state.path = Some(path.to_path_buf());
        }

        if !self.fs.exists(path).await {
            debug!(store = %self.name, path = %path.display(), "creating empty document");
            self.fs
                .write_file(path, "{}")
                .await
                .map_err(|source| StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            return Ok(LoadOutcome::Created);
        }

        let raw = self
            .fs
            .read_file(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(data)) => {
                let mut state = self.write_state();
                merge_documents(&mut state.values, data, false);
                Ok(LoadOutcome::Loaded)
            }
            Ok(other) => {
                let reason = format!("expected a JSON object, found {}", json_kind(&other));
                warn!(store = %self.name, path = %path.display(), "{reason}; treating as empty");
                Ok(LoadOutcome::Malformed(reason))
            }
            Err(e) => {
                warn!(store = %self.name, path = %path.display(), error = %e, "malformed document; treating as empty");
                Ok(LoadOutcome::Malformed(e.to_string()))
            }
        }
    }

    /// Points the store at `path` without reloading. Used after the file
    /// itself was moved along with its folder.
    pub fn relocate(&self, path: &Path) {
        self.write_state().path = Some(path.to_path_buf());
    }

    /// Writes the full document to the bound file. Failures are logged.
    pub async fn persist(&self) {
        let _guard = self.write_lock.lock().await;
        let Some(path) = self.path() else {
            warn!(store = %self.name, "not bound to a file; nothing persisted");
            return;
        };
        let raw = match serde_json::to_string_pretty(&Value::Object(self.to_document())) {
            Ok(raw) => raw,
            Err(e) => {
                error!(store = %self.name, error = %e, "failed to serialize document");
                return;
            }
        };

        let temp = temp_path(&path);
        if let Err(e) = self.fs.write_file(&temp, &raw).await {
            error!(store = %self.name, path = %temp.display(), error = %e, "failed to write document");
            return;
        }
        if let Err(e) = self.fs.rename_file(&temp, &path).await {
            error!(store = %self.name, path = %path.display(), error = %e, "failed to finalize document");
            if let Err(e) = self.fs.delete_file(&temp).await {
                debug!(path = %temp.display(), error = %e, "failed to clean up temp document");
            }
            return;
        }
        debug!(store = %self.name, path = %path.display(), "document saved");
    }

    fn ensure_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.strict && !self.is_bound() {
            error!(store = %self.name, key, "strict store mutated before binding");
            return Err(StoreError::StrictModeViolation {
                store: self.name.clone(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn notify(&self, key: &str, value: Value) {
        // No receivers is the common case.
        let _ = self.changes.send(FieldChange {
            key: key.to_string(),
            value,
        });
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Typed accessor for one field of a [`MetadataStore`].
pub struct Field<T> {
    store: Arc<MetadataStore>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.store.get_or(&self.key, T::default())
    }

    pub async fn set(&self, value: T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.store.set(&self.key, value).await
    }

    pub fn subscribe(&self) -> FieldSubscription<T> {
        FieldSubscription {
            rx: self.store.subscribe(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

pub struct FieldSubscription<T> {
    rx: broadcast::Receiver<FieldChange>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> FieldSubscription<T> {
    /// Waits for the next change of this field. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.key == self.key => {
                    match serde_json::from_value(change.value) {
                        Ok(value) => return Some(value),
                        Err(e) => debug!(key = %self.key, error = %e, "skipping undecodable change"),
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(key = %self.key, skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Merges `incoming` into `existing` and returns the keys that changed.
///
/// - `existing` empty: `incoming` is adopted as is.
/// - `force`: every incoming key overwrites.
/// - otherwise arrays are unioned (existing order first, duplicates dropped)
///   and any other value is only taken when the existing one is empty.
pub fn merge_documents(existing: &mut Document, incoming: Document, force: bool) -> Vec<String> {
    if existing.is_empty() {
        let keys = incoming.keys().cloned().collect();
        *existing = incoming;
        return keys;
    }

    let mut changed = Vec::new();
    for (key, value) in incoming {
        if force {
            if existing.get(&key) != Some(&value) {
                existing.insert(key.clone(), value);
                changed.push(key);
            }
            continue;
        }
        match existing.get_mut(&key) {
            None => {
                existing.insert(key.clone(), value);
                changed.push(key);
            }
            Some(Value::Array(current)) if value.is_array() => {
                let before = current.len();
                if let Value::Array(items) = value {
                    for item in items {
                        if !current.contains(&item) {
                            current.push(item);
                        }
                    }
                }
                if current.len() != before {
                    changed.push(key);
                }
            }
            Some(current) if is_empty_value(current) && !is_empty_value(&value) => {
                *current = value;
                changed.push(key);
            }
            Some(_) => {}
        }
    }
    changed
}

/// `null`, `""`, `[]` and `{}` count as empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
