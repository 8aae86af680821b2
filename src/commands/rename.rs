use colored::Colorize;
use tracing::info;

pub async fn rename(mod_id: String, folder: String) -> crate::Result<()> {
    let mut session = crate::util::open_session().await?;
    let id = crate::util::find_mod(&session.catalog, &mod_id)?
        .id()
        .to_string();
    let location = session.catalog.rename_mod(&id, &folder).await?;
    info!("Renamed mod {} to {}", id, location.display());
    println!(
        "{} is now at {}",
        id.bold(),
        location.display().to_string().bold().blue()
    );
    Ok(())
}
