//! Pairwise conflict analysis over the active mods.
//!
//! Detection only reads the filesystem. Conflicts are advisory and never stop
//! a deployment on their own.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    catalog::ModRecord,
    fs::FileSystemGateway,
    metadata::{ModMetadata, MOD_FILE},
};

/// Overlapping paths listed in a conflict description.
const LISTED_PATHS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    File,
    Dependency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub mod_id: String,
    pub conflicting_mod_ids: Vec<String>,
    pub kind: ConflictKind,
    pub description: String,
}

pub struct ConflictDetector {
    fs: Arc<dyn FileSystemGateway>,
}

impl ConflictDetector {
    pub fn new(fs: Arc<dyn FileSystemGateway>) -> Self {
        Self { fs }
    }

    pub async fn detect(&self, active: &[ModRecord]) -> Vec<Conflict> {
        let mods: Vec<ModMetadata> = active
            .iter()
            .filter(|record| record.is_usable())
            .map(ModRecord::metadata)
            .collect();
        let manifests = join_all(mods.iter().map(|m| self.manifest(m))).await;

        let mut conflicts = Vec::new();
        for ((a, files_a), (b, files_b)) in mods.iter().zip(manifests.iter()).tuple_combinations() {
            let shared: Vec<&PathBuf> = files_a.intersection(files_b).collect();
            if shared.is_empty() {
                continue;
            }
            debug!("{} and {} share {} files", a.id, b.id, shared.len());
            conflicts.push(Conflict {
                mod_id: a.id.clone(),
                conflicting_mod_ids: vec![b.id.clone()],
                kind: ConflictKind::File,
                description: describe_files(&b.name, &shared),
            });
        }

        let active_ids: HashSet<&str> = mods.iter().map(|m| m.id.as_str()).collect();
        for metadata in mods.iter() {
            let missing: Vec<String> = metadata
                .requires
                .iter()
                .filter(|id| !active_ids.contains(id.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                conflicts.push(Conflict {
                    mod_id: metadata.id.clone(),
                    description: format!("Requires inactive mods: {}", missing.join(", ")),
                    conflicting_mod_ids: missing,
                    kind: ConflictKind::Dependency,
                });
            }

            let clashing: Vec<String> = metadata
                .conflicts_with
                .iter()
                .filter(|id| *id != &metadata.id && active_ids.contains(id.as_str()))
                .cloned()
                .collect();
            if !clashing.is_empty() {
                conflicts.push(Conflict {
                    mod_id: metadata.id.clone(),
                    description: format!(
                        "Declared incompatible with active mods: {}",
                        clashing.join(", ")
                    ),
                    conflicting_mod_ids: clashing,
                    kind: ConflictKind::Dependency,
                });
            }
        }
        conflicts
    }

    /// Paths of every file below the mod folder, relative to it. The mod's
    /// own `mod.json` and preview are left out, and symlinked directories are
    /// not entered.
    pub async fn manifest(&self, metadata: &ModMetadata) -> BTreeSet<PathBuf> {
        let root = metadata.location.as_path();
        let skipped: Vec<PathBuf> = std::iter::once(PathBuf::from(MOD_FILE))
            .chain(metadata.preview.as_ref().map(PathBuf::from))
            .collect();

        let mut files = BTreeSet::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let children = match self.fs.list_directory(&dir).await {
                Ok(children) => children,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "failed to list mod directory");
                    continue;
                }
            };
            for child in children {
                if self.fs.is_dir(&child).await {
                    if let Ok(Some(_)) = self.fs.read_link(&child).await {
                        continue;
                    }
                    pending.push(child);
                } else if let Some(relative) = relative_to(root, &child) {
                    if !skipped.contains(&relative) {
                        files.insert(relative);
                    }
                }
            }
        }
        files
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

fn describe_files(other: &str, shared: &[&PathBuf]) -> String {
    let mut listed = shared
        .iter()
        .take(LISTED_PATHS)
        .map(|path| path.display().to_string())
        .join(", ");
    if shared.len() > LISTED_PATHS {
        listed.push_str(&format!(" and {} more", shared.len() - LISTED_PATHS));
    }
    format!("File conflicts with {other}: {listed}")
}
