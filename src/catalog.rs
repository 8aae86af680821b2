//! In-memory catalog of mods found in the source folders.
//!
//! Every record is backed by its own [`MetadataStore`] bound to the mod's
//! `mod.json`. Records are kept sorted by id. Every change to the record set
//! or to indexed metadata is forwarded to the [`IndexManager`].

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    conflict::Conflict,
    error::CatalogError,
    fs::FileSystemGateway,
    index::IndexManager,
    metadata::{
        self, folder_name, keys, mod_id_for, normalize_labels, path_value, Hotkey, ModMetadata,
        ModStatus, MOD_FILE,
    },
    store::{LoadOutcome, MetadataStore},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Keep every mod name equal to its folder name.
    pub keep_name_pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFolder {
    pub path: PathBuf,
    pub valid: bool,
    pub mod_count: usize,
}

#[derive(Debug, Clone)]
pub struct ModRecord {
    id: String,
    store: Arc<MetadataStore>,
    status: ModStatus,
    conflicts: Vec<String>,
    is_new: bool,
    problem: Option<String>,
}

impl ModRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    /// Current metadata, read from the store. Records whose `mod.json` could
    /// not be read report metadata derived from their folder.
    pub fn metadata(&self) -> ModMetadata {
        match self.problem {
            Some(_) => {
                let mut fallback = ModMetadata::fallback(&self.location());
                fallback.id = self.id.clone();
                fallback
            }
            None => ModMetadata::from_store(&self.store),
        }
    }

    /// Folder of the mod, taken from where its store is bound.
    pub fn location(&self) -> PathBuf {
        self.store
            .path()
            .and_then(|file| file.parent().map(Path::to_path_buf))
            .unwrap_or_default()
    }

    pub fn folder_name(&self) -> Option<String> {
        folder_name(&self.location())
    }

    pub fn status(&self) -> ModStatus {
        self.status
    }

    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// No `mod.json` existed when the mod was loaded.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn problem(&self) -> Option<&str> {
        self.problem.as_deref()
    }

    pub fn is_usable(&self) -> bool {
        self.problem.is_none()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ModStatus::Active | ModStatus::Conflicted)
    }
}

pub struct ModCatalog {
    fs: Arc<dyn FileSystemGateway>,
    options: CatalogOptions,
    source_folders: Vec<SourceFolder>,
    records: Vec<ModRecord>,
    by_id: HashMap<String, usize>,
    index: IndexManager,
}

impl ModCatalog {
    pub fn new(fs: Arc<dyn FileSystemGateway>, options: CatalogOptions) -> Self {
        Self {
            fs,
            options,
            source_folders: Vec::new(),
            records: Vec::new(),
            by_id: HashMap::new(),
            index: IndexManager::new(),
        }
    }

    pub fn options(&self) -> CatalogOptions {
        self.options
    }

    pub fn set_options(&mut self, options: CatalogOptions) {
        self.options = options;
    }

    pub fn source_folders(&self) -> &[SourceFolder] {
        &self.source_folders
    }

    pub fn records(&self) -> &[ModRecord] {
        &self.records
    }

    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ModRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// Records currently deployed, conflicted or not.
    pub fn active_records(&self) -> Vec<ModRecord> {
        self.records
            .iter()
            .filter(|record| record.is_active())
            .cloned()
            .collect()
    }

    pub async fn add_source_folder(&mut self, path: &Path) -> Result<(), CatalogError> {
        if !self.fs.is_dir(path).await {
            return Err(CatalogError::NotADirectory(path.to_path_buf()));
        }
        if let Some(folder) = self.source_folders.iter_mut().find(|f| f.path == path) {
            folder.valid = true;
            return Ok(());
        }
        info!("Adding source folder {}", path.display());
        self.source_folders.push(SourceFolder {
            path: path.to_path_buf(),
            valid: true,
            mod_count: 0,
        });
        Ok(())
    }

    /// Forgets `path` and every mod scanned from it. Returns whether the
    /// folder was known.
    pub fn remove_source_folder(&mut self, path: &Path) -> bool {
        let before = self.source_folders.len();
        self.source_folders.retain(|folder| folder.path != path);
        if self.source_folders.len() == before {
            return false;
        }
        let removed: Vec<String> = self
            .records
            .iter()
            .filter(|record| record.location().parent() == Some(path))
            .map(|record| record.id.clone())
            .collect();
        self.records.retain(|record| !removed.contains(&record.id));
        self.reindex_ids();
        self.index.apply_delta(&[], &removed);
        info!(
            "Removed source folder {} ({} mods)",
            path.display(),
            removed.len()
        );
        true
    }

    /// Rebuilds the record set from every source folder.
    pub async fn scan(&mut self) -> Vec<ModRecord> {
        let options = self.options;
        let scans = self
            .source_folders
            .iter()
            .map(|folder| scan_folder(Arc::clone(&self.fs), folder.path.clone(), options));
        let results = join_all(scans).await;

        let mut records = Vec::new();
        for (folder, result) in self.source_folders.iter_mut().zip(results) {
            match result {
                Some(found) => {
                    folder.valid = true;
                    records.extend(found);
                }
                None => {
                    warn!("Source folder {} is no longer available", folder.path.display());
                    folder.valid = false;
                }
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.location().cmp(&b.location())));
        let mut seen = HashSet::new();
        records.retain(|record| {
            let fresh = seen.insert(record.id.clone());
            if !fresh {
                warn!(
                    "Skipping {}: id {} is already used by another mod",
                    record.location().display(),
                    record.id
                );
            }
            fresh
        });

        self.records = records;
        self.reindex_ids();
        let metadata: Vec<ModMetadata> = self.records.iter().map(ModRecord::metadata).collect();
        self.index.rebuild_full(&metadata);
        self.recount();
        info!(
            "Scanned {} mods from {} source folders",
            self.records.len(),
            self.source_folders.len()
        );
        self.records.clone()
    }

    /// Loads a single mod folder, replacing any record with the same id.
    pub async fn load_mod(&mut self, path: &Path) -> Result<ModRecord, CatalogError> {
        if !self.fs.is_dir(path).await {
            return Err(CatalogError::NotADirectory(path.to_path_buf()));
        }
        let record = load_record(Arc::clone(&self.fs), path.to_path_buf(), self.options).await;
        self.insert(record.clone());
        Ok(record)
    }

    /// Drops a record from the catalog. The mod folder is left alone.
    pub fn remove_mod(&mut self, id: &str) -> Option<ModRecord> {
        let position = *self.by_id.get(id)?;
        let record = self.records.remove(position);
        self.reindex_ids();
        self.index.apply_delta(&[], &[record.id.clone()]);
        self.recount();
        Some(record)
    }

    pub async fn set_tags(&mut self, id: &str, tags: Vec<String>) -> Result<(), CatalogError> {
        self.write_field(id, keys::TAGS, json!(normalize_labels(tags)))
            .await
    }

    pub async fn set_category(
        &mut self,
        id: &str,
        category: Option<String>,
    ) -> Result<(), CatalogError> {
        let category = category.map(|c| c.trim().to_string()).unwrap_or_default();
        self.write_field(id, keys::CATEGORY, json!(category)).await
    }

    pub async fn set_name(&mut self, id: &str, name: &str) -> Result<(), CatalogError> {
        if self.options.keep_name_pinned {
            return Err(CatalogError::NamePinned);
        }
        self.write_field(id, keys::NAME, json!(name.trim())).await
    }

    pub async fn set_url(&mut self, id: &str, url: Option<String>) -> Result<(), CatalogError> {
        self.write_field(id, keys::URL, json!(url.unwrap_or_default()))
            .await
    }

    pub async fn set_description(
        &mut self,
        id: &str,
        description: Option<String>,
    ) -> Result<(), CatalogError> {
        self.write_field(id, keys::DESCRIPTION, json!(description.unwrap_or_default()))
            .await
    }

    pub async fn set_hotkeys(&mut self, id: &str, hotkeys: Vec<Hotkey>) -> Result<(), CatalogError> {
        self.write_field(id, keys::HOTKEYS, json!(hotkeys)).await
    }

    /// Renames the folder of mod `id` within its source folder. The id stays
    /// the same. Returns the new location.
    pub async fn rename_mod(&mut self, id: &str, new_folder: &str) -> Result<PathBuf, CatalogError> {
        let new_folder = new_folder.trim();
        if new_folder.is_empty()
            || new_folder == "."
            || new_folder == ".."
            || new_folder.contains(['/', '\\'])
        {
            return Err(CatalogError::InvalidFolderName(new_folder.to_string()));
        }
        let record = self.usable(id)?;
        let from = record.location();
        let store = Arc::clone(&record.store);
        let parent = from
            .parent()
            .ok_or_else(|| CatalogError::InvalidFolderName(from.display().to_string()))?;
        let to = parent.join(new_folder);
        if to == from {
            return Ok(to);
        }
        if self.fs.exists(&to).await {
            return Err(CatalogError::DestinationExists(to));
        }

        self.fs
            .rename_directory(&from, &to)
            .await
            .map_err(|source| CatalogError::Io {
                path: from.clone(),
                source,
            })?;
        info!("Renamed {} to {}", from.display(), to.display());
        store.relocate(&to.join(MOD_FILE));
        store.set(keys::LOCATION, path_value(&to)).await?;
        if self.options.keep_name_pinned {
            store.set(keys::NAME, json!(new_folder)).await?;
        }
        self.index.apply_delta(&[ModMetadata::from_store(&store)], &[]);
        self.recount();
        Ok(to)
    }

    /// Sets every usable record to active when its id is in `deployed` and
    /// to inactive otherwise. Conflict lists are cleared.
    pub fn apply_deployment_state(&mut self, deployed: &HashSet<String>) {
        for record in self.records.iter_mut() {
            record.conflicts.clear();
            if record.problem.is_some() {
                record.status = ModStatus::Error;
            } else if deployed.contains(&record.id) {
                record.status = ModStatus::Active;
            } else {
                record.status = ModStatus::Inactive;
            }
        }
    }

    /// Marks active records involved in `conflicts` as conflicted.
    pub fn apply_conflicts(&mut self, conflicts: &[Conflict]) {
        let mut partners: HashMap<String, HashSet<String>> = HashMap::new();
        for conflict in conflicts {
            for other in conflict.conflicting_mod_ids.iter() {
                partners
                    .entry(conflict.mod_id.clone())
                    .or_default()
                    .insert(other.clone());
                partners
                    .entry(other.clone())
                    .or_default()
                    .insert(conflict.mod_id.clone());
            }
        }
        for record in self.records.iter_mut().filter(|r| r.is_active()) {
            match partners.remove(&record.id) {
                Some(ids) => {
                    let mut ids: Vec<String> = ids.into_iter().collect();
                    ids.sort();
                    record.conflicts = ids;
                    record.status = ModStatus::Conflicted;
                }
                None => {
                    record.conflicts.clear();
                    record.status = ModStatus::Active;
                }
            }
        }
    }

    async fn write_field(&mut self, id: &str, key: &str, value: Value) -> Result<(), CatalogError> {
        let store = Arc::clone(&self.usable(id)?.store);
        store.set(key, value).await?;
        self.index.apply_delta(&[ModMetadata::from_store(&store)], &[]);
        Ok(())
    }

    fn usable(&self, id: &str) -> Result<&ModRecord, CatalogError> {
        let record = self
            .get_by_id(id)
            .ok_or_else(|| CatalogError::UnknownMod(id.to_string()))?;
        match &record.problem {
            Some(reason) => Err(CatalogError::Malformed {
                id: id.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(record),
        }
    }

    fn insert(&mut self, record: ModRecord) {
        let metadata = record.metadata();
        match self.records.binary_search_by(|r| r.id.as_str().cmp(&record.id)) {
            Ok(i) => self.records[i] = record,
            Err(i) => self.records.insert(i, record),
        }
        self.reindex_ids();
        self.index.apply_delta(&[metadata], &[]);
        self.recount();
    }

    fn reindex_ids(&mut self) {
        self.by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
    }

    fn recount(&mut self) {
        for folder in self.source_folders.iter_mut() {
            folder.mod_count = self
                .records
                .iter()
                .filter(|record| record.location().parent() == Some(folder.path.as_path()))
                .count();
        }
    }
}

/// Loads every mod directory directly under `path`. `None` when the folder is
/// gone or unreadable.
async fn scan_folder(
    fs: Arc<dyn FileSystemGateway>,
    path: PathBuf,
    options: CatalogOptions,
) -> Option<Vec<ModRecord>> {
    if !fs.is_dir(&path).await {
        return None;
    }
    let children = match fs.list_directory(&path).await {
        Ok(children) => children,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to list source folder");
            return None;
        }
    };

    let loads = children.into_iter().map(|child| {
        let fs = Arc::clone(&fs);
        async move {
            if !fs.is_dir(&child).await {
                return None;
            }
            Some(load_record(fs, child, options).await)
        }
    });
    let records: Vec<ModRecord> = join_all(loads).await.into_iter().flatten().collect();
    debug!("Found {} mods in {}", records.len(), path.display());
    Some(records)
}

async fn load_record(
    fs: Arc<dyn FileSystemGateway>,
    location: PathBuf,
    options: CatalogOptions,
) -> ModRecord {
    let name = format!("mod:{}", folder_name(&location).unwrap_or_default());
    let store = Arc::new(MetadataStore::new(name, fs));
    metadata::register_fields(&store);

    let failed = |store: Arc<MetadataStore>, reason: String| {
        warn!("Mod at {} is unusable: {}", location.display(), reason);
        ModRecord {
            id: mod_id_for(&location),
            store,
            status: ModStatus::Error,
            conflicts: Vec::new(),
            is_new: false,
            problem: Some(reason),
        }
    };

    let outcome = store.bind(&location.join(MOD_FILE)).await;
    let is_new = match outcome {
        Ok(LoadOutcome::Loaded) => false,
        Ok(LoadOutcome::Created) => true,
        Ok(LoadOutcome::Malformed(reason)) => return failed(store, reason),
        Err(e) => return failed(store, e.to_string()),
    };
    if let Err(e) = metadata::initialize(&store, &location, options.keep_name_pinned).await {
        return failed(store, e.to_string());
    }
    if is_new {
        debug!("New mod at {}", location.display());
    }

    ModRecord {
        id: ModMetadata::from_store(&store).id,
        store,
        status: ModStatus::Inactive,
        conflicts: Vec::new(),
        is_new,
        problem: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{conflict::ConflictKind, fs::LocalFs};
    use tempfile::TempDir;

    fn catalog() -> ModCatalog {
        ModCatalog::new(Arc::new(LocalFs::new()), CatalogOptions::default())
    }

    fn mod_dir(root: &Path, name: &str, json: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(json) = json {
            std::fs::write(dir.join(MOD_FILE), json).unwrap();
        }
        dir
    }

    async fn scanned(tmp: &TempDir) -> ModCatalog {
        let mut catalog = catalog();
        catalog.add_source_folder(tmp.path()).await.unwrap();
        catalog.scan().await;
        catalog
    }

    #[tokio::test]
    async fn add_source_folder_rejects_files_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        std::fs::write(&file, "").unwrap();
        let mut catalog = catalog();

        assert!(matches!(
            catalog.add_source_folder(&file).await,
            Err(CatalogError::NotADirectory(_))
        ));
        catalog.add_source_folder(tmp.path()).await.unwrap();
        catalog.add_source_folder(tmp.path()).await.unwrap();
        assert_eq!(catalog.source_folders().len(), 1);
    }

    #[tokio::test]
    async fn scan_seeds_new_mods_and_skips_files() {
        let tmp = tempfile::tempdir().unwrap();
        let fresh = mod_dir(tmp.path(), "Fresh", None);
        mod_dir(tmp.path(), "Known", Some(r#"{"id":"known","modName":"Known Mod","tags":["ui"]}"#));
        std::fs::write(tmp.path().join("readme.txt"), "").unwrap();

        let catalog = scanned(&tmp).await;

        assert_eq!(catalog.len(), 2);
        let record = catalog.get_by_id(&mod_id_for(&fresh)).unwrap();
        assert!(record.is_new());
        assert_eq!(record.metadata().name, "Fresh");
        assert!(fresh.join(MOD_FILE).exists());

        let known = catalog.get_by_id("known").unwrap();
        assert!(!known.is_new());
        assert_eq!(catalog.index().by_tag("ui"), vec!["known"]);
        assert_eq!(catalog.source_folders()[0].mod_count, 2);
    }

    #[tokio::test]
    async fn records_are_sorted_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        mod_dir(tmp.path(), "one", Some(r#"{"id":"c"}"#));
        mod_dir(tmp.path(), "two", Some(r#"{"id":"a"}"#));
        mod_dir(tmp.path(), "three", Some(r#"{"id":"b"}"#));

        let catalog = scanned(&tmp).await;

        let ids: Vec<_> = catalog.records().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn malformed_mod_is_kept_in_error_without_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = mod_dir(tmp.path(), "Broken", Some("[1, 2"));
        mod_dir(tmp.path(), "Fine", None);

        let mut catalog = scanned(&tmp).await;

        assert_eq!(catalog.len(), 2);
        let id = mod_id_for(&broken);
        let record = catalog.get_by_id(&id).unwrap();
        assert_eq!(record.status(), ModStatus::Error);
        assert!(record.problem().is_some());
        assert_eq!(record.metadata().name, "Broken");
        assert_eq!(std::fs::read_to_string(broken.join(MOD_FILE)).unwrap(), "[1, 2");

        assert!(matches!(
            catalog.set_tags(&id, vec!["x".into()]).await,
            Err(CatalogError::Malformed { .. })
        ));

        catalog.apply_deployment_state(&HashSet::from([id.clone()]));
        assert_eq!(catalog.get_by_id(&id).unwrap().status(), ModStatus::Error);
        assert!(catalog.active_records().is_empty());
    }

    #[tokio::test]
    async fn vanished_source_folder_is_marked_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        mod_dir(&source, "A", None);
        let mut catalog = catalog();
        catalog.add_source_folder(&source).await.unwrap();
        assert_eq!(catalog.scan().await.len(), 1);

        std::fs::remove_dir_all(&source).unwrap();
        let records = catalog.scan().await;

        assert!(records.is_empty());
        assert!(!catalog.source_folders()[0].valid);
        assert!(catalog.index().is_empty());
    }

    #[tokio::test]
    async fn edits_write_through_and_update_index() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = mod_dir(tmp.path(), "A", Some(r#"{"id":"a","tags":["ui"],"custom":1}"#));
        let mut catalog = scanned(&tmp).await;

        catalog
            .set_tags("a", vec!["combat".into(), " combat ".into()])
            .await
            .unwrap();
        catalog.set_category("a", Some("Armor".into())).await.unwrap();
        catalog
            .set_hotkeys(
                "a",
                vec![Hotkey {
                    key: "F1".into(),
                    description: "Toggle".into(),
                }],
            )
            .await
            .unwrap();

        assert!(catalog.index().by_tag("ui").is_empty());
        assert_eq!(catalog.index().by_tag("combat"), vec!["a"]);
        assert_eq!(catalog.index().by_category("Armor"), vec!["a"]);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(MOD_FILE)).unwrap()).unwrap();
        assert_eq!(written["tags"], json!(["combat"]));
        assert_eq!(written["custom"], json!(1));
        assert_eq!(written["hotkeys"][0]["key"], json!("F1"));

        assert!(matches!(
            catalog.set_url("missing", None).await,
            Err(CatalogError::UnknownMod(_))
        ));
    }

    #[tokio::test]
    async fn rename_keeps_id_and_relocates_store() {
        let tmp = tempfile::tempdir().unwrap();
        mod_dir(tmp.path(), "Old", Some(r#"{"id":"a"}"#));
        mod_dir(tmp.path(), "Taken", None);
        let mut catalog = scanned(&tmp).await;

        assert!(matches!(
            catalog.rename_mod("a", "Taken").await,
            Err(CatalogError::DestinationExists(_))
        ));
        assert!(matches!(
            catalog.rename_mod("a", "../escape").await,
            Err(CatalogError::InvalidFolderName(_))
        ));

        let to = catalog.rename_mod("a", "New").await.unwrap();

        assert_eq!(to, tmp.path().join("New"));
        assert!(!tmp.path().join("Old").exists());
        let record = catalog.get_by_id("a").unwrap();
        assert_eq!(record.location(), to);
        assert_eq!(record.metadata().location, to);

        catalog.set_description("a", Some("moved".into())).await.unwrap();
        let written = std::fs::read_to_string(to.join(MOD_FILE)).unwrap();
        assert!(written.contains("moved"));
    }

    #[tokio::test]
    async fn pinned_names_follow_renames() {
        let tmp = tempfile::tempdir().unwrap();
        mod_dir(tmp.path(), "Old", Some(r#"{"id":"a","modName":"Custom"}"#));
        let mut catalog = ModCatalog::new(
            Arc::new(LocalFs::new()),
            CatalogOptions {
                keep_name_pinned: true,
            },
        );
        catalog.add_source_folder(tmp.path()).await.unwrap();
        catalog.scan().await;
        assert_eq!(catalog.get_by_id("a").unwrap().metadata().name, "Old");

        catalog.rename_mod("a", "New").await.unwrap();

        assert_eq!(catalog.get_by_id("a").unwrap().metadata().name, "New");
        assert!(matches!(
            catalog.set_name("a", "Other").await,
            Err(CatalogError::NamePinned)
        ));
    }

    #[tokio::test]
    async fn load_and_remove_single_mods() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = mod_dir(tmp.path(), "Solo", Some(r#"{"id":"solo","tags":["ui"]}"#));
        let mut catalog = catalog();

        let record = catalog.load_mod(&dir).await.unwrap();
        assert_eq!(record.id(), "solo");
        assert_eq!(catalog.index().by_tag("ui"), vec!["solo"]);

        assert!(catalog.remove_mod("solo").is_some());
        assert!(catalog.get_by_id("solo").is_none());
        assert!(catalog.index().by_tag("ui").is_empty());
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn remove_source_folder_drops_its_mods() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        mod_dir(&first, "A", Some(r#"{"id":"a","tags":["ui"]}"#));
        mod_dir(&second, "B", Some(r#"{"id":"b","tags":["ui"]}"#));
        let mut catalog = catalog();
        catalog.add_source_folder(&first).await.unwrap();
        catalog.add_source_folder(&second).await.unwrap();
        catalog.scan().await;

        assert!(catalog.remove_source_folder(&first));

        assert!(catalog.get_by_id("a").is_none());
        assert_eq!(catalog.index().by_tag("ui"), vec!["b"]);
        assert!(!catalog.remove_source_folder(&first));
    }

    #[tokio::test]
    async fn conflicts_mark_active_records() {
        let tmp = tempfile::tempdir().unwrap();
        mod_dir(tmp.path(), "A", Some(r#"{"id":"a"}"#));
        mod_dir(tmp.path(), "B", Some(r#"{"id":"b"}"#));
        mod_dir(tmp.path(), "C", Some(r#"{"id":"c"}"#));
        let mut catalog = scanned(&tmp).await;
        catalog.apply_deployment_state(&HashSet::from(["a".to_string(), "b".to_string()]));

        catalog.apply_conflicts(&[Conflict {
            mod_id: "a".into(),
            conflicting_mod_ids: vec!["b".into(), "c".into()],
            kind: ConflictKind::File,
            description: String::new(),
        }]);

        assert_eq!(catalog.get_by_id("a").unwrap().status(), ModStatus::Conflicted);
        assert_eq!(catalog.get_by_id("a").unwrap().conflicts(), ["b", "c"]);
        assert_eq!(catalog.get_by_id("b").unwrap().conflicts(), ["a"]);
        assert_eq!(catalog.get_by_id("c").unwrap().status(), ModStatus::Inactive);
        assert_eq!(catalog.active_records().len(), 2);
    }
}
