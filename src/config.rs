//! Application settings persisted as one JSON document.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{json, Value};
use tracing::debug;

use crate::{
    catalog::CatalogOptions,
    deploy::DeploymentTarget,
    error::StoreError,
    fs::FileSystemGateway,
    metadata::path_value,
    store::MetadataStore,
};

pub const CONFIG_FILE: &str = "config.json";

pub mod keys {
    pub const SOURCE_FOLDERS: &str = "sourceFolders";
    pub const TARGET: &str = "target";
    pub const KEEP_NAME_PINNED: &str = "keepModNameAsModFolderName";
    pub const SELECTED_MODS: &str = "selectedMods";
    pub const PRESET_FOLDER: &str = "presetFolder";
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    store: Arc<MetadataStore>,
}

impl AppConfig {
    /// Loads the document at `path`, creating it and its parent directory
    /// when missing.
    pub async fn load(fs: Arc<dyn FileSystemGateway>, path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !fs.is_dir(parent).await {
                debug!("Creating config directory {}", parent.display());
                fs.create_directory(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
        let store = Arc::new(MetadataStore::new("config", fs));
        store.register(keys::SOURCE_FOLDERS, json!([]));
        store.register(keys::TARGET, Value::Null);
        store.register(keys::KEEP_NAME_PINNED, json!(false));
        store.register(keys::SELECTED_MODS, json!([]));
        store.register(keys::PRESET_FOLDER, json!(""));
        store.bind(path).await?;
        Ok(Self { store })
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn source_folders(&self) -> Vec<PathBuf> {
        self.store.get_or(keys::SOURCE_FOLDERS, Vec::new())
    }

    pub async fn add_source_folder(&self, path: &Path) -> Result<bool, StoreError> {
        let mut folders = self.source_folders();
        if folders.iter().any(|f| f == path) {
            return Ok(false);
        }
        folders.push(path.to_path_buf());
        self.set_source_folders(&folders).await?;
        Ok(true)
    }

    pub async fn remove_source_folder(&self, path: &Path) -> Result<bool, StoreError> {
        let mut folders = self.source_folders();
        let before = folders.len();
        folders.retain(|f| f != path);
        if folders.len() == before {
            return Ok(false);
        }
        self.set_source_folders(&folders).await?;
        Ok(true)
    }

    pub fn target(&self) -> Option<DeploymentTarget> {
        self.store.get_or(keys::TARGET, None)
    }

    pub async fn set_target(&self, target: &DeploymentTarget) -> Result<(), StoreError> {
        self.store.set(keys::TARGET, serde_json::to_value(target)?).await
    }

    pub fn keep_name_pinned(&self) -> bool {
        self.store.get_or(keys::KEEP_NAME_PINNED, false)
    }

    pub async fn set_keep_name_pinned(&self, pinned: bool) -> Result<(), StoreError> {
        self.store.set(keys::KEEP_NAME_PINNED, json!(pinned)).await
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            keep_name_pinned: self.keep_name_pinned(),
        }
    }

    pub fn selected_mods(&self) -> BTreeSet<String> {
        self.store.get_or(keys::SELECTED_MODS, BTreeSet::new())
    }

    pub async fn set_selected_mods(&self, ids: &BTreeSet<String>) -> Result<(), StoreError> {
        self.store.set(keys::SELECTED_MODS, json!(ids)).await
    }

    pub async fn select<I: IntoIterator<Item = String>>(&self, ids: I) -> Result<(), StoreError> {
        let mut selected = self.selected_mods();
        selected.extend(ids);
        self.set_selected_mods(&selected).await
    }

    pub async fn deselect<I: IntoIterator<Item = String>>(&self, ids: I) -> Result<(), StoreError> {
        let mut selected = self.selected_mods();
        for id in ids {
            selected.remove(&id);
        }
        self.set_selected_mods(&selected).await
    }

    /// Configured preset folder, if any.
    pub fn preset_folder(&self) -> Option<PathBuf> {
        Some(self.store.get_or(keys::PRESET_FOLDER, String::new()))
            .filter(|folder| !folder.is_empty())
            .map(PathBuf::from)
    }

    pub async fn set_preset_folder(&self, folder: &Path) -> Result<(), StoreError> {
        self.store.set(keys::PRESET_FOLDER, path_value(folder)).await
    }

    async fn set_source_folders(&self, folders: &[PathBuf]) -> Result<(), StoreError> {
        let values: Vec<Value> = folders.iter().map(|f| path_value(f)).collect();
        self.store.set(keys::SOURCE_FOLDERS, Value::Array(values)).await
    }
}
