use std::collections::BTreeSet;

use colored::Colorize;
use tracing::info;

use crate::util::{find_mod, open_session, Session};

fn resolve_ids(session: &Session, mods: &[String]) -> crate::Result<Vec<String>> {
    mods.iter()
        .map(|query| -> crate::Result<String> {
            Ok(find_mod(&session.catalog, query)?.id().to_string())
        })
        .collect()
}

pub async fn select(mods: Vec<String>, all: bool) -> crate::Result<()> {
    let session = open_session().await?;
    let ids = if all {
        session
            .catalog
            .records()
            .iter()
            .filter(|record| record.is_usable())
            .map(|record| record.id().to_string())
            .collect()
    } else {
        resolve_ids(&session, &mods)?
    };
    session.config.select(ids.iter().cloned()).await?;
    info!("Selected {} mods", ids.len());
    print_selection(&session);
    Ok(())
}

pub async fn deselect(mods: Vec<String>, all: bool) -> crate::Result<()> {
    let session = open_session().await?;
    if all {
        session.config.set_selected_mods(&BTreeSet::new()).await?;
        println!("Selection cleared");
        return Ok(());
    }
    // Ids of mods that have since disappeared can still be deselected.
    let ids: Vec<String> = mods
        .iter()
        .map(|query| match find_mod(&session.catalog, query) {
            Ok(record) => record.id().to_string(),
            Err(_) => query.clone(),
        })
        .collect();
    session.config.deselect(ids).await?;
    print_selection(&session);
    Ok(())
}

fn print_selection(session: &Session) {
    let selected = session.config.selected_mods();
    println!("{} {}", "Selected mods:".bold(), selected.len());
    for id in selected {
        match session.catalog.get_by_id(&id) {
            Some(record) => println!("- {} ({})", super::util::mod_label(record), id),
            None => println!("- {} ({})", id, "missing".red()),
        }
    }
}
