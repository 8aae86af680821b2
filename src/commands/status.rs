use std::sync::Arc;

use colored::Colorize;
use modshelf::{Conflict, ConflictDetector, ConflictKind, ModStatus};

use super::util;
use crate::util::Session;

async fn detect_conflicts(session: &mut Session) -> Vec<Conflict> {
    let detector = ConflictDetector::new(Arc::clone(&session.fs));
    let conflicts = detector.detect(&session.catalog.active_records()).await;
    session.catalog.apply_conflicts(&conflicts);
    conflicts
}

pub async fn status() -> crate::Result<()> {
    let mut session = crate::util::open_session().await?;
    detect_conflicts(&mut session).await;

    match session.config.target() {
        Some(target) => println!("{} {}", "Target:".bold(), target),
        None => println!("{} {}", "Target:".bold(), "not set".yellow()),
    }
    let selected = session.config.selected_mods();
    for record in session.catalog.records() {
        println!(
            "- {} ({}) {}{}",
            util::mod_label(record),
            record.id(),
            util::status_label(record.status()),
            if selected.contains(record.id()) {
                " *".blue().bold().to_string()
            } else {
                String::new()
            }
        );
    }

    let count = |status: ModStatus| {
        session
            .catalog
            .records()
            .iter()
            .filter(|record| record.status() == status)
            .count()
    };
    println!(
        "{} active, {} conflicted, {} inactive, {} broken",
        count(ModStatus::Active),
        count(ModStatus::Conflicted),
        count(ModStatus::Inactive),
        count(ModStatus::Error)
    );
    Ok(())
}

pub async fn conflicts() -> crate::Result<()> {
    let mut session = crate::util::open_session().await?;
    let conflicts = detect_conflicts(&mut session).await;
    if conflicts.is_empty() {
        println!("{}", "No conflicts between deployed mods".green());
        return Ok(());
    }

    for conflict in conflicts.iter() {
        let title = session
            .catalog
            .get_by_id(&conflict.mod_id)
            .map(|record| record.metadata().name)
            .unwrap_or_else(|| conflict.mod_id.clone());
        let kind = match conflict.kind {
            ConflictKind::File => "file".yellow(),
            ConflictKind::Dependency => "dependency".red(),
        };
        util::print_title(&title, title.bold());
        util::print_branches([
            format!("{} {}", "Kind:".bold(), kind),
            format!(
                "{} {}",
                "Mods:".bold(),
                conflict.conflicting_mod_ids.join(", ")
            ),
            conflict.description.clone(),
        ]);
    }
    Ok(())
}
