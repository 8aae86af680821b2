//! Converges a deployment target to the selected set of mods.
//!
//! Two strategies exist. [`DeploymentTarget::Symlink`] overlays links to the
//! selected mod folders onto a separate directory. [`DeploymentTarget::Traditional`]
//! works inside the source folder itself and disables mods by prefixing their
//! folder with [`DISABLED_PREFIX`].
//!
//! Every pass first validates its preconditions and classifies the current
//! state into a [`DeploymentPlan`]. Nothing is touched when validation fails.
//! Operations of a plan run independently, so one failing entry never stops
//! the others.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    catalog::{ModCatalog, ModRecord},
    error::ValidationError,
    fs::FileSystemGateway,
    metadata::{folder_name, keys, path_value, MOD_FILE},
};

pub const DISABLED_PREFIX: &str = "disable_";

pub const FOREIGN_ENTRY: &str = "target already contains a foreign entry";
pub const SYMLINK_UNSUPPORTED: &str = "symlink unsupported";

/// Receives advisory messages meant for the user.
pub type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

/// Notifier that forwards every message to the log.
pub fn log_notifier() -> Notifier {
    Arc::new(|message: &str| warn!("{message}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeploymentTarget {
    Symlink { directory: PathBuf },
    Traditional { directory: PathBuf },
}

impl DeploymentTarget {
    pub fn directory(&self) -> &Path {
        match self {
            DeploymentTarget::Symlink { directory } | DeploymentTarget::Traditional { directory } => {
                directory
            }
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentTarget::Symlink { directory } => {
                write!(f, "symlink into {}", directory.display())
            }
            DeploymentTarget::Traditional { directory } => {
                write!(f, "traditional in {}", directory.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeployOperation {
    /// Remove the stale entry of a managed mod that is no longer selected.
    Remove { mod_id: String, path: PathBuf },
    /// Link a selected mod into the target.
    Link {
        mod_id: String,
        source: PathBuf,
        link: PathBuf,
    },
    /// Strip the disable prefix from a selected mod's folder.
    Enable {
        mod_id: String,
        from: PathBuf,
        to: PathBuf,
    },
    /// Prefix an unselected mod's folder.
    Disable {
        mod_id: String,
        from: PathBuf,
        to: PathBuf,
    },
}

impl DeployOperation {
    pub fn mod_id(&self) -> &str {
        match self {
            DeployOperation::Remove { mod_id, .. }
            | DeployOperation::Link { mod_id, .. }
            | DeployOperation::Enable { mod_id, .. }
            | DeployOperation::Disable { mod_id, .. } => mod_id,
        }
    }
}

impl fmt::Display for DeployOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployOperation::Remove { path, .. } => write!(f, "remove {}", path.display()),
            DeployOperation::Link { source, link, .. } => {
                write!(f, "link {} -> {}", link.display(), source.display())
            }
            DeployOperation::Enable { from, to, .. } => {
                write!(f, "enable {} -> {}", from.display(), to.display())
            }
            DeployOperation::Disable { from, to, .. } => {
                write!(f, "disable {} -> {}", from.display(), to.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFailure {
    pub mod_id: String,
    pub reason: String,
}

/// What a pass would do. Produced by [`Reconciler::plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    pub operations: Vec<DeployOperation>,
    /// Entries that fail before any operation runs.
    pub failed: Vec<DeployFailure>,
    /// Mods already in the desired state.
    pub unchanged: Vec<String>,
}

/// Outcome of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    /// Ids of mods whose operation succeeded.
    pub succeeded: Vec<String>,
    pub failed: Vec<DeployFailure>,
    pub unchanged: Vec<String>,
    /// Every operation attempted, successful or not.
    pub operations: Vec<DeployOperation>,
}

impl DeploymentReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.succeeded.len() + self.failed.len();
        if total == 0 {
            return write!(f, "already up to date, {} unchanged", self.unchanged.len());
        }
        write!(f, "{}/{} succeeded", self.succeeded.len(), total)?;
        if !self.failed.is_empty() {
            let reasons: Vec<&str> = self.failed.iter().map(|f| f.reason.as_str()).collect();
            write!(f, ", {} failed: {}", self.failed.len(), reasons.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Undeployed,
    Deployed,
}

pub struct Reconciler {
    fs: Arc<dyn FileSystemGateway>,
    notifier: Notifier,
}

impl Reconciler {
    pub fn new(fs: Arc<dyn FileSystemGateway>, notifier: Notifier) -> Self {
        Self { fs, notifier }
    }

    /// Validates `target` and classifies its current state against
    /// `selection` without changing anything.
    pub async fn plan(
        &self,
        catalog: &ModCatalog,
        target: &DeploymentTarget,
        selection: &HashSet<String>,
    ) -> Result<DeploymentPlan, ValidationError> {
        let directory = target.directory();
        if !self.fs.is_dir(directory).await {
            return Err(ValidationError::TargetMissing(directory.to_path_buf()));
        }

        let mut plan = DeploymentPlan::default();
        let selected = self.resolve_selection(catalog, selection, &mut plan);
        match target {
            DeploymentTarget::Symlink { directory } => {
                self.validate_symlink(catalog, directory).await?;
                self.classify_links(catalog, directory, &selected, &mut plan)
                    .await?;
            }
            DeploymentTarget::Traditional { directory } => {
                validate_traditional(catalog, directory, &selected)?;
                classify_prefixes(catalog, directory, selection, &mut plan);
            }
        }
        debug!(
            operations = plan.operations.len(),
            failed = plan.failed.len(),
            unchanged = plan.unchanged.len(),
            "planned deployment"
        );
        Ok(plan)
    }

    /// Brings `target` in line with `selection`.
    pub async fn reconcile(
        &self,
        catalog: &ModCatalog,
        target: &DeploymentTarget,
        selection: &HashSet<String>,
    ) -> Result<DeploymentReport, ValidationError> {
        let plan = self.plan(catalog, target, selection).await?;
        let report = self.execute(catalog, plan).await;
        info!("Deployment ({target}): {report}");
        Ok(report)
    }

    /// Runs the operations of `plan`. Removals finish before any link is
    /// created.
    pub async fn execute(&self, catalog: &ModCatalog, plan: DeploymentPlan) -> DeploymentReport {
        let mut report = DeploymentReport {
            failed: plan.failed,
            unchanged: plan.unchanged,
            ..Default::default()
        };

        let (removals, rest): (Vec<_>, Vec<_>) = plan
            .operations
            .into_iter()
            .partition(|op| matches!(op, DeployOperation::Remove { .. }));
        for batch in [removals, rest] {
            let results = join_all(batch.iter().map(|op| self.apply(catalog, op))).await;
            for (op, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.succeeded.push(op.mod_id().to_string()),
                    Err(reason) => {
                        warn!("Failed to {op}: {reason}");
                        report.failed.push(DeployFailure {
                            mod_id: op.mod_id().to_string(),
                            reason,
                        });
                    }
                }
            }
            report.operations.extend(batch);
        }
        report
    }

    /// Deployment state of every catalog mod, read from the filesystem.
    pub async fn deployment_state(
        &self,
        catalog: &ModCatalog,
        target: &DeploymentTarget,
    ) -> BTreeMap<String, DeploymentState> {
        let checks = catalog.records().iter().map(|record| async move {
            let deployed = match target {
                DeploymentTarget::Symlink { directory } => {
                    self.is_linked(record, directory).await
                }
                DeploymentTarget::Traditional { directory } => {
                    let location = record.location();
                    location.parent() == Some(directory.as_path())
                        && !is_disabled(&record.folder_name().unwrap_or_default())
                }
            };
            let state = if deployed {
                DeploymentState::Deployed
            } else {
                DeploymentState::Undeployed
            };
            (record.id().to_string(), state)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Recomputes every record's status from the filesystem.
    pub async fn refresh(&self, catalog: &mut ModCatalog, target: &DeploymentTarget) {
        let deployed: HashSet<String> = self
            .deployment_state(catalog, target)
            .await
            .into_iter()
            .filter(|(_, state)| *state == DeploymentState::Deployed)
            .map(|(id, _)| id)
            .collect();
        catalog.apply_deployment_state(&deployed);
    }

    fn resolve_selection<'a>(
        &self,
        catalog: &'a ModCatalog,
        selection: &HashSet<String>,
        plan: &mut DeploymentPlan,
    ) -> Vec<&'a ModRecord> {
        let mut ids: Vec<&String> = selection.iter().collect();
        ids.sort();
        let mut selected = Vec::new();
        for id in ids {
            match catalog.get_by_id(id) {
                Some(record) if record.is_usable() => selected.push(record),
                Some(record) => plan.failed.push(DeployFailure {
                    mod_id: id.clone(),
                    reason: format!(
                        "mod.json is unreadable: {}",
                        record.problem().unwrap_or_default()
                    ),
                }),
                None => plan.failed.push(DeployFailure {
                    mod_id: id.clone(),
                    reason: "not in the catalog".to_string(),
                }),
            }
        }
        selected
    }

    async fn validate_symlink(
        &self,
        catalog: &ModCatalog,
        directory: &Path,
    ) -> Result<(), ValidationError> {
        if let Some(record) = catalog
            .records()
            .iter()
            .find(|record| record.location().parent() == Some(directory))
        {
            return Err(ValidationError::TargetIsSourceFolder {
                target: directory.to_path_buf(),
                mod_id: record.id().to_string(),
            });
        }
        if catalog.source_folders().iter().any(|f| f.path == directory) {
            return Err(ValidationError::TargetIsEmptySourceFolder(
                directory.to_path_buf(),
            ));
        }
        if !self.fs.is_symlink_supported(directory).await {
            (self.notifier)(SYMLINK_UNSUPPORTED);
            return Err(ValidationError::SymlinkUnsupported(directory.to_path_buf()));
        }
        Ok(())
    }

    async fn classify_links(
        &self,
        catalog: &ModCatalog,
        directory: &Path,
        selected: &[&ModRecord],
        plan: &mut DeploymentPlan,
    ) -> Result<(), ValidationError> {
        let mut managed: HashMap<String, &str> = HashMap::new();
        for record in catalog.records() {
            if let Some(name) = record.folder_name() {
                managed.entry(name).or_insert(record.id());
            }
        }

        let mut wanted: BTreeMap<String, &ModRecord> = BTreeMap::new();
        for &record in selected {
            let Some(name) = record.folder_name() else {
                continue;
            };
            if let Some(first) = wanted.get(&name) {
                plan.failed.push(DeployFailure {
                    mod_id: record.id().to_string(),
                    reason: format!("folder name {name} is already used by mod {}", first.id()),
                });
                continue;
            }
            wanted.insert(name, record);
        }

        let entries =
            self.fs
                .list_directory(directory)
                .await
                .map_err(|e| ValidationError::Probe {
                    path: directory.to_path_buf(),
                    reason: e.to_string(),
                })?;
        let mut present = HashSet::new();
        for entry in entries {
            let Some(name) = folder_name(&entry) else {
                continue;
            };
            if let Some(record) = wanted.get(&name) {
                present.insert(name);
                if self.is_linked(record, directory).await {
                    plan.unchanged.push(record.id().to_string());
                } else {
                    (self.notifier)(FOREIGN_ENTRY);
                    plan.failed.push(DeployFailure {
                        mod_id: record.id().to_string(),
                        reason: FOREIGN_ENTRY.to_string(),
                    });
                }
            } else if let Some(id) = managed.get(&name) {
                // Only links are ours to remove. A real file or folder under a
                // managed name belongs to the user.
                if matches!(self.fs.read_link(&entry).await, Ok(Some(_))) {
                    plan.operations.push(DeployOperation::Remove {
                        mod_id: id.to_string(),
                        path: entry,
                    });
                } else {
                    (self.notifier)(FOREIGN_ENTRY);
                    plan.failed.push(DeployFailure {
                        mod_id: id.to_string(),
                        reason: FOREIGN_ENTRY.to_string(),
                    });
                }
            } else {
                debug!("Leaving foreign entry {}", entry.display());
            }
        }

        for (name, record) in wanted {
            if present.contains(&name) {
                continue;
            }
            plan.operations.push(DeployOperation::Link {
                mod_id: record.id().to_string(),
                source: record.location(),
                link: directory.join(&name),
            });
        }
        Ok(())
    }

    async fn is_linked(&self, record: &ModRecord, directory: &Path) -> bool {
        let Some(name) = record.folder_name() else {
            return false;
        };
        let link = directory.join(name);
        match self.fs.read_link(&link).await {
            Ok(Some(points_to)) => {
                let resolved = if points_to.is_absolute() {
                    points_to
                } else {
                    directory.join(points_to)
                };
                resolved == record.location()
            }
            _ => false,
        }
    }

    async fn apply(&self, catalog: &ModCatalog, op: &DeployOperation) -> Result<(), String> {
        match op {
            DeployOperation::Remove { path, .. } => self
                .fs
                .delete_directory(path)
                .await
                .map_err(|e| format!("failed to remove {}: {e}", path.display())),
            DeployOperation::Link { source, link, .. } => {
                if self.fs.exists(link).await {
                    (self.notifier)(FOREIGN_ENTRY);
                    return Err(FOREIGN_ENTRY.to_string());
                }
                self.fs
                    .create_symlink(source, link)
                    .await
                    .map_err(|e| format!("failed to link {}: {e}", link.display()))
            }
            DeployOperation::Enable { mod_id, from, to }
            | DeployOperation::Disable { mod_id, from, to } => {
                self.move_mod(catalog, mod_id, from, to).await
            }
        }
    }

    async fn move_mod(
        &self,
        catalog: &ModCatalog,
        mod_id: &str,
        from: &Path,
        to: &Path,
    ) -> Result<(), String> {
        if self.fs.exists(to).await {
            return Err(format!("{} already exists", to.display()));
        }
        self.fs
            .rename_directory(from, to)
            .await
            .map_err(|e| format!("failed to rename {}: {e}", from.display()))?;
        let Some(record) = catalog.get_by_id(mod_id) else {
            return Ok(());
        };
        let store = record.store();
        store.relocate(&to.join(MOD_FILE));
        store
            .set(keys::LOCATION, path_value(to))
            .await
            .map_err(|e| format!("renamed to {} but could not record it: {e}", to.display()))
    }
}

fn validate_traditional(
    catalog: &ModCatalog,
    directory: &Path,
    selected: &[&ModRecord],
) -> Result<(), ValidationError> {
    if catalog.options().keep_name_pinned {
        return Err(ValidationError::NamePinned);
    }
    if let Some(record) = selected
        .iter()
        .find(|record| record.location().parent() != Some(directory))
    {
        return Err(ValidationError::NotCommonSourceFolder {
            target: directory.to_path_buf(),
            mod_id: record.id().to_string(),
        });
    }
    let is_source_folder = catalog.source_folders().iter().any(|f| f.path == directory);
    let holds_mods = catalog
        .records()
        .iter()
        .any(|record| record.location().parent() == Some(directory));
    if !is_source_folder || !holds_mods {
        return Err(ValidationError::TargetNotSourceFolder(directory.to_path_buf()));
    }
    Ok(())
}

fn classify_prefixes(
    catalog: &ModCatalog,
    directory: &Path,
    selection: &HashSet<String>,
    plan: &mut DeploymentPlan,
) {
    for record in catalog.records().iter().filter(|r| r.is_usable()) {
        let location = record.location();
        if location.parent() != Some(directory) {
            continue;
        }
        let Some(name) = record.folder_name() else {
            continue;
        };
        let id = record.id().to_string();
        match (is_disabled(&name), selection.contains(&id)) {
            (true, true) => {
                let enabled = strip_disabled(&name);
                if enabled.is_empty() {
                    plan.failed.push(DeployFailure {
                        mod_id: id,
                        reason: format!("cannot enable {name}: nothing left after the prefix"),
                    });
                    continue;
                }
                plan.operations.push(DeployOperation::Enable {
                    mod_id: id,
                    to: directory.join(enabled),
                    from: location,
                });
            }
            (false, false) => plan.operations.push(DeployOperation::Disable {
                mod_id: id,
                to: directory.join(format!("{DISABLED_PREFIX}{name}")),
                from: location,
            }),
            _ => plan.unchanged.push(id),
        }
    }
}

pub fn is_disabled(folder: &str) -> bool {
    folder.starts_with(DISABLED_PREFIX)
}

/// Removes every leading disable prefix.
pub fn strip_disabled(folder: &str) -> &str {
    let mut name = folder;
    while let Some(rest) = name.strip_prefix(DISABLED_PREFIX) {
        name = rest;
    }
    name
}
