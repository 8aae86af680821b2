//! Error types for the catalog, stores and deployment.

use std::path::PathBuf;

/// Errors raised by a [`crate::store::MetadataStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store {store} is in strict mode and not bound to a file; refusing to set {key}")]
    StrictModeViolation { store: String, key: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building or editing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("unknown mod: {0}")]
    UnknownMod(String),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("invalid folder name: {0}")]
    InvalidFolderName(String),

    #[error("mod {id} has an unreadable mod.json: {reason}")]
    Malformed { id: String, reason: String },

    #[error("mod names are pinned to folder names; rename the folder instead")]
    NamePinned,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A deployment precondition that failed. Nothing on disk has been touched
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("target directory does not exist: {}", .0.display())]
    TargetMissing(PathBuf),

    #[error("symlinks are not supported in {}", .0.display())]
    SymlinkUnsupported(PathBuf),

    #[error("target directory {} is also a source folder of mod {mod_id}", .target.display())]
    TargetIsSourceFolder { target: PathBuf, mod_id: String },

    #[error("target directory {} is a source folder", .0.display())]
    TargetIsEmptySourceFolder(PathBuf),

    #[error("target directory {} is not a source folder holding cataloged mods", .0.display())]
    TargetNotSourceFolder(PathBuf),

    #[error("mod {mod_id} does not live in target directory {}", .target.display())]
    NotCommonSourceFolder { target: PathBuf, mod_id: String },

    #[error("traditional deployment cannot be used while mod names are pinned to folder names")]
    NamePinned,

    #[error("I/O error while validating {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },
}

/// Errors raised while loading presets.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("invalid preset id: {0:?}")]
    InvalidId(String),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
