use std::sync::Arc;

use colored::Colorize;
use modshelf::{FileSystemGateway, LocalFs, ModCatalog};
use tracing::info;

use crate::SourceCommand;

pub async fn source(action: SourceCommand) -> crate::Result<()> {
    let fs: Arc<dyn FileSystemGateway> = Arc::new(LocalFs::new());
    let config = crate::util::open_config(Arc::clone(&fs)).await?;

    match action {
        SourceCommand::Add { path } => {
            let path = std::fs::canonicalize(&path).unwrap_or(path);
            let mut catalog = ModCatalog::new(fs, config.catalog_options());
            catalog.add_source_folder(&path).await?;
            if config.add_source_folder(&path).await? {
                let found = catalog.scan().await;
                info!("Added source folder {}", path.display());
                println!(
                    "Added {} ({} mods)",
                    path.display().to_string().bold().blue(),
                    found.len()
                );
            } else {
                println!("{} is already a source folder", path.display());
            }
        }
        SourceCommand::Remove { path } => {
            let path = std::fs::canonicalize(&path).unwrap_or(path);
            if config.remove_source_folder(&path).await? {
                println!("Removed {}", path.display().to_string().bold());
            } else {
                eprintln!("Not a source folder: {}", path.display());
                return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
            }
        }
        SourceCommand::List => {
            let mut catalog = ModCatalog::new(fs, config.catalog_options());
            for folder in config.source_folders() {
                if catalog.add_source_folder(&folder).await.is_err() {
                    println!("- {} ({})", folder.display(), "missing".red().bold());
                }
            }
            catalog.scan().await;
            for folder in catalog.source_folders() {
                println!(
                    "- {} ({} mods)",
                    folder.path.display().to_string().bold(),
                    folder.mod_count
                );
            }
        }
    }
    Ok(())
}
