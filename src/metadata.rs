use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::Local;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    error::StoreError,
    store::{Document, MetadataStore},
};

/// Name of the metadata file inside every mod folder.
pub const MOD_FILE: &str = "mod.json";
pub const SCHEMA_VERSION: u32 = 1;

/// Keys of the persisted `mod.json` document.
pub mod keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "modName";
    pub const LOCATION: &str = "location";
    pub const URL: &str = "url";
    pub const ADD_DATE: &str = "addDate";
    pub const SCHEMA_VERSION: &str = "JSONVersion";
    pub const CATEGORY: &str = "category";
    pub const TAGS: &str = "tags";
    pub const PREVIEW: &str = "preview";
    pub const DESCRIPTION: &str = "description";
    pub const HOTKEYS: &str = "hotkeys";
    pub const REQUIRES: &str = "requires";
    pub const CONFLICTS_WITH: &str = "conflictsWith";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    pub key: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMetadata {
    pub id: String,
    pub name: String,
    pub location: PathBuf,
    pub url: Option<String>,
    pub add_date: String,
    pub schema_version: u32,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub preview: Option<String>,
    pub description: Option<String>,
    pub hotkeys: Vec<Hotkey>,
    pub requires: Vec<String>,
    pub conflicts_with: Vec<String>,
}

impl ModMetadata {
    /// Reads the current values of `store`. Empty strings become `None`.
    pub fn from_store(store: &MetadataStore) -> Self {
        let text = |key: &str| store.get_or(key, String::new());
        let optional = |key: &str| Some(text(key)).filter(|value| !value.is_empty());
        Self {
            id: text(keys::ID),
            name: text(keys::NAME),
            location: PathBuf::from(text(keys::LOCATION)),
            url: optional(keys::URL),
            add_date: text(keys::ADD_DATE),
            schema_version: store.get_or(keys::SCHEMA_VERSION, SCHEMA_VERSION),
            category: optional(keys::CATEGORY),
            tags: normalize_labels(store.get_or(keys::TAGS, Vec::new())),
            preview: optional(keys::PREVIEW),
            description: optional(keys::DESCRIPTION),
            hotkeys: store.get_or(keys::HOTKEYS, Vec::new()),
            requires: store.get_or(keys::REQUIRES, Vec::new()),
            conflicts_with: store.get_or(keys::CONFLICTS_WITH, Vec::new()),
        }
    }

    /// Metadata for a mod whose `mod.json` could not be used.
    pub fn fallback(location: &Path) -> Self {
        Self {
            id: mod_id_for(location),
            name: folder_name(location).unwrap_or_default(),
            location: location.to_path_buf(),
            url: None,
            add_date: String::new(),
            schema_version: SCHEMA_VERSION,
            category: None,
            tags: Vec::new(),
            preview: None,
            description: None,
            hotkeys: Vec::new(),
            requires: Vec::new(),
            conflicts_with: Vec::new(),
        }
    }

    pub fn folder_name(&self) -> Option<String> {
        folder_name(&self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModStatus {
    Inactive,
    Active,
    Conflicted,
    Error,
}

impl fmt::Display for ModStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModStatus::Inactive => "inactive",
            ModStatus::Active => "active",
            ModStatus::Conflicted => "conflicted",
            ModStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Registers every `mod.json` field with its default on `store`.
pub fn register_fields(store: &MetadataStore) {
    store.register(keys::ID, json!(""));
    store.register(keys::NAME, json!(""));
    store.register(keys::LOCATION, json!(""));
    store.register(keys::URL, json!(""));
    store.register(keys::ADD_DATE, json!(""));
    store.register(keys::SCHEMA_VERSION, json!(SCHEMA_VERSION));
    store.register(keys::CATEGORY, json!(""));
    store.register(keys::TAGS, json!([]));
    store.register(keys::PREVIEW, json!(""));
    store.register(keys::DESCRIPTION, json!(""));
    store.register(keys::HOTKEYS, json!([]));
    store.register(keys::REQUIRES, json!([]));
    store.register(keys::CONFLICTS_WITH, json!([]));
}

/// Fills in the values a freshly loaded mod must have: its location, and an
/// id, name and add date when missing. With `keep_name_pinned` the name is
/// forced to the folder name. Everything is written in one persist.
pub async fn initialize(
    store: &MetadataStore,
    location: &Path,
    keep_name_pinned: bool,
) -> Result<(), StoreError> {
    let current = ModMetadata::from_store(store);
    let folder = folder_name(location).unwrap_or_default();
    let mut updates = Document::new();

    if current.location != location {
        updates.insert(keys::LOCATION.into(), path_value(location));
    }
    if current.add_date.is_empty() {
        updates.insert(keys::ADD_DATE.into(), json!(Local::now().to_rfc3339()));
    }
    if current.id.is_empty() {
        updates.insert(keys::ID.into(), json!(mod_id_for(location)));
    }
    if current.name.is_empty() || (keep_name_pinned && current.name != folder) {
        updates.insert(keys::NAME.into(), json!(folder));
    }
    let stored_tags: Vec<String> = store.get_or(keys::TAGS, Vec::new());
    if stored_tags != current.tags {
        updates.insert(keys::TAGS.into(), json!(current.tags));
    }

    if !updates.is_empty() {
        store.merge_inbound(updates, true).await?;
    }
    Ok(())
}

/// Content-addressed mod id: the xxh3 hash of the absolute location.
pub fn mod_id_for(location: &Path) -> String {
    format!("{:016x}", xxh3_64(location.to_string_lossy().as_bytes()))
}

pub fn folder_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
}

/// Trims labels, drops empty ones and removes duplicates, keeping first
/// occurrences in order.
pub fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .unique()
        .collect()
}

pub fn path_value(path: &Path) -> Value {
    json!(path.to_string_lossy())
}
