use colored::Colorize;
use modshelf::Preset;

use super::util;
use crate::PresetCommand;

pub async fn preset(action: PresetCommand) -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let mut presets = crate::util::open_presets(&session).await?;

    match action {
        PresetCommand::Save {
            id,
            name,
            description,
            inherits,
        } => {
            let mod_ids: Vec<String> = session.config.selected_mods().into_iter().collect();
            let count = mod_ids.len();
            presets
                .save(Preset {
                    id: id.clone(),
                    name: name.unwrap_or_default(),
                    description: description.unwrap_or_default(),
                    mod_ids,
                    inherits: inherits.unwrap_or_default(),
                })
                .await?;
            println!(
                "Saved preset {} with {} mods to {}",
                id.bold().blue(),
                count,
                presets.folder().display()
            );
        }
        PresetCommand::List => {
            if presets.list().is_empty() {
                println!("No presets in {}", presets.folder().display());
            }
            for preset in presets.list() {
                println!(
                    "- {} ({}) {} mods{}",
                    preset.name.bold(),
                    preset.id,
                    preset.mod_ids.len(),
                    if preset.inherits.is_empty() {
                        String::new()
                    } else {
                        format!(", inherits {}", preset.inherits.join(", "))
                    }
                );
            }
        }
        PresetCommand::Show { id } => {
            let mod_ids = presets.resolve(&id)?;
            let Some(preset) = presets.get(&id) else {
                return Ok(());
            };
            util::print_title(&preset.name, preset.name.bold());
            util::print_branches(mod_ids.iter().map(|mod_id| {
                match session.catalog.get_by_id(mod_id) {
                    Some(record) => format!("{} ({})", util::mod_label(record), mod_id),
                    None => format!("{} ({})", mod_id, "missing".red()),
                }
            }));
            if !preset.description.is_empty() {
                println!("{}", preset.description.italic());
            }
        }
    }
    Ok(())
}
