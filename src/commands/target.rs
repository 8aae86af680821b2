use std::path::PathBuf;

use colored::Colorize;
use modshelf::deploy::DeploymentTarget;
use tracing::info;

pub async fn target(
    symlink: Option<PathBuf>,
    traditional: Option<PathBuf>,
    pin_names: Option<bool>,
) -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let config = &session.config;

    let new_target = match (symlink, traditional) {
        (Some(directory), _) => Some(DeploymentTarget::Symlink {
            directory: std::fs::canonicalize(&directory).unwrap_or(directory),
        }),
        (_, Some(directory)) => Some(DeploymentTarget::Traditional {
            directory: std::fs::canonicalize(&directory).unwrap_or(directory),
        }),
        _ => None,
    };
    if let Some(new_target) = &new_target {
        if !session.fs.is_dir(new_target.directory()).await {
            eprintln!("{} is not a directory", new_target.directory().display());
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
        }
        config.set_target(new_target).await?;
        info!("Deployment target set to {}", new_target);
    }
    if let Some(pinned) = pin_names {
        config.set_keep_name_pinned(pinned).await?;
        info!("Keep mod name as folder name: {}", pinned);
    }

    match config.target() {
        Some(target) => println!("{} {}", "Target:".bold(), target),
        None => println!("{} {}", "Target:".bold(), "not set".yellow()),
    }
    println!(
        "{} {}",
        "Keep mod name as folder name:".bold(),
        if config.keep_name_pinned() { "yes" } else { "no" }
    );
    Ok(())
}
