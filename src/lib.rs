//! Catalog mod folders and deploy a selection of them into a game's mod
//! directory.

pub mod catalog;
pub mod config;
pub mod conflict;
pub mod deploy;
pub mod error;
pub mod fs;
pub mod index;
pub mod metadata;
pub mod preset;
pub mod store;

pub use catalog::{CatalogOptions, ModCatalog, ModRecord, SourceFolder};
pub use config::AppConfig;
pub use conflict::{Conflict, ConflictDetector, ConflictKind};
pub use deploy::{
    DeployFailure, DeployOperation, DeploymentPlan, DeploymentReport, DeploymentState,
    DeploymentTarget, Notifier, Reconciler,
};
pub use error::{CatalogError, PresetError, StoreError, ValidationError};
pub use fs::{FileSystemGateway, LocalFs};
pub use index::IndexManager;
pub use metadata::{ModMetadata, ModStatus};
pub use preset::{Preset, PresetLibrary};
pub use store::MetadataStore;
