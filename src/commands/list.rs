use std::collections::BTreeSet;

use colored::Colorize;
use modshelf::ModRecord;

use super::util;

pub async fn list(
    tags: Option<Vec<String>>,
    any: bool,
    category: Option<String>,
    details: bool,
) -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let catalog = &session.catalog;
    let index = catalog.index();

    let mut ids: Option<BTreeSet<String>> = None;
    if let Some(tags) = tags {
        let found = if any {
            index.by_any_tag(&tags)
        } else {
            index.by_all_tags(&tags)
        };
        ids = Some(found.into_iter().collect());
    }
    if let Some(category) = category {
        let found: BTreeSet<String> = index.by_category(&category).into_iter().collect();
        ids = Some(match ids {
            Some(ids) => ids.intersection(&found).cloned().collect(),
            None => found,
        });
    }

    let selected = session.config.selected_mods();
    let records: Vec<&ModRecord> = catalog
        .records()
        .iter()
        .filter(|r| ids.as_ref().map_or(true, |ids| ids.contains(r.id())))
        .collect();

    for record in records {
        if details {
            print_details(record, selected.contains(record.id()));
        } else {
            println!(
                "- {} ({}){}",
                util::mod_label(record),
                record.id(),
                if selected.contains(record.id()) {
                    " *".blue().bold().to_string()
                } else {
                    String::new()
                }
            );
        }
    }
    Ok(())
}

fn print_details(record: &ModRecord, selected: bool) {
    let metadata = record.metadata();
    let left_branch_more = boxy::Char::right_tee(boxy::Weight::Normal);
    let left_branch_done = boxy::Char::lower_left(boxy::Weight::Normal);
    let left_node = boxy::Char::left_half(boxy::Weight::Normal);
    let down_branch = boxy::Char::down_tee(boxy::Weight::Normal);

    util::print_title(&metadata.name, util::mod_label(record));

    let mut fields = vec![
        ("Mod ID:", record.id().to_string()),
        ("Status:", util::status_label(record.status()).to_string()),
        ("Selected:", if selected { "yes" } else { "no" }.to_string()),
        ("Location:", metadata.location.display().to_string()),
        ("Added:", metadata.add_date.clone()),
    ];
    if let Some(url) = &metadata.url {
        fields.push(("Source:", url.clone()));
    }
    if let Some(category) = &metadata.category {
        fields.push(("Category:", category.clone()));
    }
    if let Some(description) = &metadata.description {
        fields.push(("Description:", description.clone()));
    }
    if let Some(problem) = record.problem() {
        fields.push(("Problem:", problem.red().to_string()));
    }
    if !record.conflicts().is_empty() {
        fields.push(("Conflicts with:", record.conflicts().join(", ")));
    }
    for hotkey in metadata.hotkeys.iter() {
        fields.push(("Hotkey:", format!("{} ({})", hotkey.key, hotkey.description)));
    }

    let has_tags = !metadata.tags.is_empty();
    let mut fields = fields.into_iter().peekable();
    while let Some((label, value)) = fields.next() {
        println!(
            "{}{}{} {}",
            if fields.peek().is_some() || has_tags {
                left_branch_more
            } else {
                left_branch_done
            },
            left_node,
            label.bold(),
            value
        );
    }

    if has_tags {
        println!(
            "{}{}{}{}",
            left_branch_done,
            down_branch,
            left_node,
            "Tags:".bold()
        );
        let mut tags = metadata.tags.iter().peekable();
        while let Some(tag) = tags.next() {
            println!(
                " {}{}{}",
                if tags.peek().is_some() {
                    left_branch_more
                } else {
                    left_branch_done
                },
                left_node,
                tag
            );
        }
    }
}
