use std::collections::HashSet;

use colored::Colorize;
use tracing::info;

pub async fn deploy(dry_run: bool, preset: Option<String>) -> crate::Result<()> {
    let mut session = crate::util::open_session().await?;
    let Some(target) = session.config.target() else {
        eprintln!("No deployment target set. Use `modshelf target` first.");
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
    };

    let selection: HashSet<String> = match preset {
        Some(id) => {
            let presets = crate::util::open_presets(&session).await?;
            let ids = presets.resolve(&id)?;
            if !dry_run {
                session.config.set_selected_mods(&ids).await?;
                info!("Selection replaced by preset {}", id);
            }
            ids.into_iter().collect()
        }
        None => session.config.selected_mods().into_iter().collect(),
    };

    let reconciler = session.reconciler();
    if dry_run {
        let plan = reconciler.plan(&session.catalog, &target, &selection).await?;
        if plan.operations.is_empty() {
            println!("Nothing to do, {} unchanged", plan.unchanged.len());
        }
        for operation in plan.operations.iter() {
            println!("- {} {}", operation.mod_id().bold(), operation);
        }
        for failure in plan.failed.iter() {
            println!(
                "- {} {}",
                failure.mod_id.bold(),
                failure.reason.red()
            );
        }
        return Ok(());
    }

    let report = reconciler
        .reconcile(&session.catalog, &target, &selection)
        .await?;
    if report.is_clean() {
        println!("{}", report.to_string().green().bold());
    } else {
        println!("{}", report.to_string().yellow().bold());
        for failure in report.failed.iter() {
            eprintln!("- {}: {}", failure.mod_id.bold(), failure.reason);
        }
    }
    session.refresh().await;
    Ok(())
}
