use colored::Colorize;
use modshelf::index::{CategoryNode, LabelCount};

use super::util;

pub async fn tags(
    tags: Option<Vec<String>>,
    search: Option<String>,
    stats: bool,
) -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let catalog = &session.catalog;
    let index = catalog.index();

    let entries: Vec<LabelCount> = if let Some(query) = search {
        index.search_tags(&query)
    } else if let Some(tags) = tags {
        index
            .tags_by_frequency(None)
            .into_iter()
            .filter(|entry| tags.contains(&entry.label))
            .collect()
    } else {
        index.tags_by_frequency(None)
    };

    for entry in entries.iter() {
        util::print_title(&entry.label, entry.label.bold());
        util::print_branches(entry.mods.iter().map(|id| {
            catalog
                .get_by_id(id)
                .map(util::mod_label)
                .map(|label| label.to_string())
                .unwrap_or_else(|| id.clone())
        }));
    }

    if stats {
        let stats = index.statistics();
        println!("{}", "Statistics".bold().underline());
        println!("{} {}", "Tags:".bold(), stats.total_tags);
        println!("{} {}", "Categories:".bold(), stats.total_categories);
        if let Some(tag) = stats.most_used_tag {
            println!("{} {}", "Most used tag:".bold(), tag);
        }
        if let Some(category) = stats.most_used_category {
            println!("{} {}", "Most used category:".bold(), category);
        }
        println!("{} {:.2}", "Tags per mod:".bold(), stats.average_tags_per_mod);
        println!(
            "{} {:.2}",
            "Mods per category:".bold(),
            stats.average_mods_per_category
        );
    }
    Ok(())
}

pub async fn categories(tree: bool, search: Option<String>) -> crate::Result<()> {
    let session = crate::util::open_session().await?;
    let index = session.catalog.index();

    if tree {
        print_tree(&index.category_tree('/'), "");
        return Ok(());
    }

    let entries = match search {
        Some(query) => index.search_categories(&query),
        None => index.categories_by_frequency(None),
    };
    for entry in entries {
        println!("- {} ({})", entry.label.bold(), entry.count);
    }
    Ok(())
}

fn print_tree(node: &CategoryNode, indent: &str) {
    let left_branch_more = boxy::Char::right_tee(boxy::Weight::Normal);
    let left_branch_done = boxy::Char::lower_left(boxy::Weight::Normal);
    let left_node = boxy::Char::left_half(boxy::Weight::Normal);
    let branch_v = boxy::Char::vertical(boxy::Weight::Normal).to_string();

    let mut children = node.children.iter().peekable();
    while let Some((label, child)) = children.next() {
        let last = children.peek().is_none();
        println!(
            "{}{}{}{} ({})",
            indent,
            if last { left_branch_done } else { left_branch_more },
            left_node,
            label.bold(),
            child.count
        );
        let next_indent = format!("{}{} ", indent, if last { " " } else { &branch_v });
        print_tree(child, &next_indent);
    }
}
