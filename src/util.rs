use std::{
    io::{Error as IOError, ErrorKind as IOErrorKind},
    path::PathBuf,
    sync::Arc,
};

use modshelf::{
    config::CONFIG_FILE, deploy::log_notifier, AppConfig, FileSystemGateway, LocalFs, ModCatalog,
    ModRecord, PresetLibrary, Reconciler,
};
use tracing::{debug, warn};
use tracing_unwrap::OptionExt;

use crate::Result;

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .expect_or_log("Failed to get user config directory")
        .join("modshelf")
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

/// Everything a command needs: settings and a freshly scanned catalog.
pub struct Session {
    pub fs: Arc<dyn FileSystemGateway>,
    pub config: AppConfig,
    pub catalog: ModCatalog,
}

impl Session {
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.fs), log_notifier())
    }

    /// Scans again and, when a target is configured, reads deployment
    /// status from it.
    pub async fn refresh(&mut self) {
        self.catalog.scan().await;
        if let Some(target) = self.config.target() {
            self.reconciler().refresh(&mut self.catalog, &target).await;
        }
    }
}

pub async fn open_config(fs: Arc<dyn FileSystemGateway>) -> Result<AppConfig> {
    let path = get_config_path();
    debug!("Config path: {}", path.display());
    Ok(AppConfig::load(fs, &path).await?)
}

pub async fn open_session() -> Result<Session> {
    let fs: Arc<dyn FileSystemGateway> = Arc::new(LocalFs::new());
    let config = open_config(Arc::clone(&fs)).await?;
    let mut catalog = ModCatalog::new(Arc::clone(&fs), config.catalog_options());
    for folder in config.source_folders() {
        if let Err(e) = catalog.add_source_folder(&folder).await {
            warn!("Skipping source folder: {e}");
        }
    }
    let mut session = Session {
        fs,
        config,
        catalog,
    };
    session.refresh().await;
    Ok(session)
}

pub async fn open_presets(session: &Session) -> Result<PresetLibrary> {
    let folder = session
        .config
        .preset_folder()
        .unwrap_or_else(|| get_config_dir().join("presets"));
    Ok(PresetLibrary::load(Arc::clone(&session.fs), &folder).await?)
}

/// Finds a mod by id, or by a name or folder name only one mod has.
pub fn find_mod<'a>(catalog: &'a ModCatalog, query: &str) -> Result<&'a ModRecord> {
    if let Some(record) = catalog.get_by_id(query) {
        return Ok(record);
    }
    let matches: Vec<&ModRecord> = catalog
        .records()
        .iter()
        .filter(|record| {
            record.metadata().name == query || record.folder_name().as_deref() == Some(query)
        })
        .collect();
    match matches.as_slice() {
        [record] => Ok(*record),
        [] => Err(IOError::new(IOErrorKind::NotFound, format!("No mod matches {query}")).into()),
        _ => Err(IOError::new(
            IOErrorKind::InvalidInput,
            format!("{} mods match {query}; use the mod ID", matches.len()),
        )
        .into()),
    }
}
