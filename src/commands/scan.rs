use colored::*;

pub async fn scan() -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let catalog = &session.catalog;

    for folder in catalog.source_folders() {
        if folder.valid {
            println!(
                "{} {} mods",
                folder.path.display().to_string().bold(),
                folder.mod_count
            );
        } else {
            println!(
                "{} {}",
                folder.path.display().to_string().bold(),
                "unavailable".red().bold()
            );
        }
    }

    let new_mods: Vec<_> = catalog.records().iter().filter(|r| r.is_new()).collect();
    if !new_mods.is_empty() {
        println!("{}", "New mods:".blue().bold());
        for record in new_mods {
            println!("- {} ({})", record.metadata().name.bold(), record.id());
        }
    }

    let broken: Vec<_> = catalog
        .records()
        .iter()
        .filter_map(|r| r.problem().map(|problem| (r, problem)))
        .collect();
    if !broken.is_empty() {
        println!("{}", "Unreadable mod.json:".red().bold());
        for (record, problem) in broken {
            println!("- {}: {}", record.location().display(), problem);
        }
    }

    println!("{} mods cataloged", catalog.len());
    Ok(())
}
