//! Named selections saved as JSON files in a preset folder.
//!
//! A preset may inherit other presets; its resolved selection is its own mod
//! ids plus those of every preset reachable through `inherits`.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    error::{PresetError, StoreError},
    fs::FileSystemGateway,
    store::{LoadOutcome, MetadataStore},
};

const PRESET_EXTENSION: &str = "json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mod_ids: Vec<String>,
    pub inherits: Vec<String>,
}

impl Preset {
    fn from_store(store: &MetadataStore) -> Option<Self> {
        serde_json::from_value(Value::Object(store.to_document())).ok()
    }
}

struct Entry {
    preset: Preset,
    store: Arc<MetadataStore>,
}

pub struct PresetLibrary {
    fs: Arc<dyn FileSystemGateway>,
    folder: PathBuf,
    presets: BTreeMap<String, Entry>,
}

impl PresetLibrary {
    /// Loads every `*.json` file in `folder`, creating the folder when
    /// missing. Unreadable files are skipped.
    pub async fn load(fs: Arc<dyn FileSystemGateway>, folder: &Path) -> Result<Self, PresetError> {
        if !fs.exists(folder).await {
            fs.create_directory(folder)
                .await
                .map_err(|source| PresetError::Io {
                    path: folder.to_path_buf(),
                    source,
                })?;
        } else if !fs.is_dir(folder).await {
            return Err(PresetError::NotADirectory(folder.to_path_buf()));
        }

        let mut library = Self {
            fs: Arc::clone(&fs),
            folder: folder.to_path_buf(),
            presets: BTreeMap::new(),
        };
        let files = fs
            .list_directory(folder)
            .await
            .map_err(|source| PresetError::Io {
                path: folder.to_path_buf(),
                source,
            })?;
        for file in files {
            if file.extension().and_then(|e| e.to_str()) != Some(PRESET_EXTENSION)
                || fs.is_dir(&file).await
            {
                continue;
            }
            match library.load_file(&file).await {
                Ok(Some(id)) => debug!("Loaded preset {id} from {}", file.display()),
                Ok(None) => warn!("Skipping unreadable preset {}", file.display()),
                Err(e) => warn!("Failed to load preset {}: {e}", file.display()),
            }
        }
        Ok(library)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id).map(|entry| &entry.preset)
    }

    pub fn list(&self) -> Vec<&Preset> {
        self.presets.values().map(|entry| &entry.preset).collect()
    }

    /// Writes `preset` to `<folder>/<id>.json`, replacing any preset with
    /// the same id.
    pub async fn save(&mut self, mut preset: Preset) -> Result<(), PresetError> {
        let id = preset.id.trim().to_string();
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(PresetError::InvalidId(preset.id));
        }
        preset.id = id.clone();
        if preset.name.is_empty() {
            preset.name = id.clone();
        }

        let store = match self.presets.get(&id) {
            Some(entry) => Arc::clone(&entry.store),
            None => {
                let store = new_store(&self.fs, &id);
                store
                    .bind(&self.folder.join(format!("{id}.{PRESET_EXTENSION}")))
                    .await?;
                store
            }
        };
        let document = match serde_json::to_value(&preset).map_err(StoreError::from)? {
            Value::Object(document) => document,
            _ => return Err(PresetError::InvalidId(id)),
        };
        store.merge_inbound(document, true).await?;
        info!("Saved preset {id} with {} mods", preset.mod_ids.len());
        self.presets.insert(id, Entry { preset, store });
        Ok(())
    }

    /// Mod ids of preset `id` and everything it inherits. Cycles and unknown
    /// inherited presets are ignored.
    pub fn resolve(&self, id: &str) -> Result<BTreeSet<String>, PresetError> {
        let root = self
            .get(id)
            .ok_or_else(|| PresetError::UnknownPreset(id.to_string()))?;
        let mut visited = HashSet::from([root.id.as_str()]);
        let mut pending = vec![root];
        let mut mod_ids = BTreeSet::new();
        while let Some(preset) = pending.pop() {
            mod_ids.extend(preset.mod_ids.iter().cloned());
            for parent in preset.inherits.iter() {
                if !visited.insert(parent.as_str()) {
                    continue;
                }
                match self.get(parent) {
                    Some(inherited) => pending.push(inherited),
                    None => warn!("Preset {} inherits unknown preset {parent}", preset.id),
                }
            }
        }
        Ok(mod_ids)
    }

    async fn load_file(&mut self, file: &Path) -> Result<Option<String>, PresetError> {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let store = new_store(&self.fs, &stem);
        if let LoadOutcome::Malformed(_) = store.bind(file).await? {
            return Ok(None);
        }
        let Some(mut preset) = Preset::from_store(&store) else {
            return Ok(None);
        };
        if preset.id.is_empty() {
            preset.id = stem;
            store.set("id", json!(preset.id)).await?;
        }
        if preset.name.is_empty() {
            preset.name = preset.id.clone();
        }
        let id = preset.id.clone();
        if self.presets.contains_key(&id) {
            warn!("Preset id {id} is defined twice; keeping the first");
            return Ok(None);
        }
        self.presets.insert(id.clone(), Entry { preset, store });
        Ok(Some(id))
    }
}

fn new_store(fs: &Arc<dyn FileSystemGateway>, id: &str) -> Arc<MetadataStore> {
    let store = Arc::new(MetadataStore::new(format!("preset:{id}"), Arc::clone(fs)));
    store.register("id", json!(""));
    store.register("name", json!(""));
    store.register("description", json!(""));
    store.register("modIds", json!([]));
    store.register("inherits", json!([]));
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;

    fn preset(id: &str, mods: &[&str], inherits: &[&str]) -> Preset {
        Preset {
            id: id.to_string(),
            mod_ids: mods.iter().map(|m| m.to_string()).collect(),
            inherits: inherits.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn saved_presets_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let fs: Arc<dyn FileSystemGateway> = Arc::new(LocalFs::new());
        let mut library = PresetLibrary::load(fs.clone(), tmp.path()).await.unwrap();

        library.save(preset("base", &["a", "b"], &[])).await.unwrap();

        let reloaded = PresetLibrary::load(fs, tmp.path()).await.unwrap();
        let base = reloaded.get("base").unwrap();
        assert_eq!(base.name, "base");
        assert_eq!(base.mod_ids, vec!["a", "b"]);
        assert!(tmp.path().join("base.json").exists());
    }

    #[tokio::test]
    async fn resolve_follows_inheritance_and_survives_cycles() {
        let tmp = tempfile::tempdir().unwrap();
        let mut library = PresetLibrary::load(Arc::new(LocalFs::new()), tmp.path())
            .await
            .unwrap();
        library.save(preset("base", &["a"], &["top"])).await.unwrap();
        library.save(preset("mid", &["b"], &["base"])).await.unwrap();
        library
            .save(preset("top", &["c"], &["mid", "ghost"]))
            .await
            .unwrap();

        assert_eq!(library.resolve("top").unwrap(), ids(&["a", "b", "c"]));
        assert_eq!(library.resolve("base").unwrap(), ids(&["a", "b", "c"]));
        assert!(matches!(
            library.resolve("nope"),
            Err(PresetError::UnknownPreset(_))
        ));
    }

    #[tokio::test]
    async fn files_without_id_use_their_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("quick.json"), r#"{"modIds":["x"]}"#).unwrap();
        std::fs::write(tmp.path().join("broken.json"), "nope").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "{}").unwrap();

        let library = PresetLibrary::load(Arc::new(LocalFs::new()), tmp.path())
            .await
            .unwrap();

        assert_eq!(library.list().len(), 1);
        assert_eq!(library.resolve("quick").unwrap(), ids(&["x"]));
        assert_eq!(std::fs::read_to_string(tmp.path().join("broken.json")).unwrap(), "nope");
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let mut library = PresetLibrary::load(Arc::new(LocalFs::new()), tmp.path())
            .await
            .unwrap();

        assert!(matches!(
            library.save(preset("../escape", &[], &[])).await,
            Err(PresetError::InvalidId(_))
        ));
    }
}
