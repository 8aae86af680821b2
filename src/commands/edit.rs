use inquire::error::InquireResult;
use inquire::{Confirm, InquireError, Select, Text};
use modshelf::ModCatalog;
use tracing::info;

use super::util::{self, TagAutoComplete};

/// Values to set on a mod in non-interactive mode.
#[derive(Debug, Default)]
pub struct EditFields {
    pub name: Option<String>,
    pub source_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl EditFields {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.source_url.is_none()
            && self.tags.is_none()
            && self.category.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EditMenuAction {
    MainMenu,
    TagList,
    TagModList(String),
    AllModList,
    EditMod(String, String),
    EditModName(String, String),
    EditModSource(String, Option<String>),
    EditModCategory(String, Option<String>),
    EditModTags(String),
    AddTag(String),
    DeleteTag(String, String),
    Quit,
}

impl std::fmt::Display for EditMenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EditMenuAction::MainMenu => write!(f, "Back to main menu"),
            EditMenuAction::TagList => write!(f, "Mods by tag"),
            EditMenuAction::TagModList(tag_name) => write!(f, "{}", tag_name),
            EditMenuAction::AllModList => write!(f, "All mods"),
            EditMenuAction::EditMod(mod_name, mod_id) => {
                write!(f, "{} ({})", mod_name, mod_id)
            }
            EditMenuAction::EditModName(_, name) => write!(f, "Name: {}", name),
            EditMenuAction::EditModSource(_, url) => {
                write!(f, "Source: {}", url.as_deref().unwrap_or("-"))
            }
            EditMenuAction::EditModCategory(_, category) => {
                write!(f, "Category: {}", category.as_deref().unwrap_or("-"))
            }
            EditMenuAction::EditModTags(_) => write!(f, "Edit tags"),
            EditMenuAction::AddTag(_) => write!(f, "Add tag"),
            EditMenuAction::DeleteTag(_, tag_name) => write!(f, "Delete tag {}", tag_name),
            EditMenuAction::Quit => write!(f, "Quit"),
        }
    }
}

trait InterruptedDefault<T> {
    fn with_interrupted_default(self, d: T) -> InquireResult<T>;
}

impl<T> InterruptedDefault<T> for InquireResult<T> {
    fn with_interrupted_default(self, d: T) -> InquireResult<T> {
        match &self {
            Ok(_) => self,
            Err(ie) => match ie {
                InquireError::OperationCanceled | InquireError::OperationInterrupted => Ok(d),
                _ => self,
            },
        }
    }
}

/// Prompt result, or `None` when the user backed out.
fn answered<T>(result: InquireResult<T>) -> InquireResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn edit(interactive: bool, id: Option<String>, fields: EditFields) -> crate::Result<()> {
    let mut session = crate::util::open_session().await?;
    if interactive {
        if id.is_some() || !fields.is_empty() {
            eprintln!("Interactive mode is not compatible with other arguments");
            return Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into());
        }
        return edit_interactive(&mut session.catalog).await;
    }

    let query = id.unwrap_or_default();
    let id = crate::util::find_mod(&session.catalog, &query)?.id().to_string();
    let catalog = &mut session.catalog;
    if let Some(name) = fields.name {
        catalog.set_name(&id, &name).await?;
    }
    if let Some(source_url) = fields.source_url {
        util::check_source_url(&source_url)?;
        catalog.set_url(&id, Some(source_url)).await?;
    }
    if let Some(tags) = fields.tags {
        catalog.set_tags(&id, tags).await?;
    }
    if let Some(category) = fields.category {
        catalog.set_category(&id, Some(category)).await?;
    }
    if let Some(description) = fields.description {
        catalog.set_description(&id, Some(description)).await?;
    }
    info!("Updated mod {}", id);
    Ok(())
}

async fn edit_interactive(catalog: &mut ModCatalog) -> crate::Result<()> {
    let mut current_state = EditMenuAction::MainMenu;
    let mut previous_menu_state = EditMenuAction::AllModList;
    while current_state != EditMenuAction::Quit {
        match current_state {
            EditMenuAction::MainMenu => {
                let options: Vec<EditMenuAction> = vec![
                    EditMenuAction::TagList,
                    EditMenuAction::AllModList,
                    EditMenuAction::Quit,
                ];
                current_state = Select::new("Main Menu:", options)
                    .prompt()
                    .with_interrupted_default(EditMenuAction::Quit)?;
            }
            EditMenuAction::TagList => {
                let menu_entries: Vec<EditMenuAction> = catalog
                    .index()
                    .tags_by_frequency(None)
                    .into_iter()
                    .map(|entry| EditMenuAction::TagModList(entry.label))
                    .collect();
                if menu_entries.is_empty() {
                    eprintln!("No tags found!");
                    current_state = EditMenuAction::MainMenu;
                } else {
                    current_state = Select::new("Mods by tag:", menu_entries)
                        .prompt()
                        .with_interrupted_default(EditMenuAction::MainMenu)?;
                }
            }
            EditMenuAction::TagModList(tag_name) => {
                let menu_entries: Vec<_> = catalog
                    .index()
                    .by_tag(&tag_name)
                    .into_iter()
                    .filter_map(|id| catalog.get_by_id(&id))
                    .map(|record| EditMenuAction::EditMod(record.metadata().name, record.id().to_string()))
                    .collect();
                previous_menu_state = EditMenuAction::TagModList(tag_name.clone());
                if menu_entries.is_empty() {
                    current_state = EditMenuAction::TagList;
                } else {
                    current_state =
                        Select::new(format!("Mods for tag {}:", tag_name).as_str(), menu_entries)
                            .prompt()
                            .with_interrupted_default(EditMenuAction::TagList)?;
                }
            }
            EditMenuAction::AllModList => {
                let mod_list_options: Vec<EditMenuAction> = catalog
                    .records()
                    .iter()
                    .filter(|record| record.is_usable())
                    .map(|record| EditMenuAction::EditMod(record.metadata().name, record.id().to_string()))
                    .collect();
                previous_menu_state = EditMenuAction::AllModList;
                if mod_list_options.is_empty() {
                    eprintln!("No mods found!");
                    current_state = EditMenuAction::MainMenu;
                } else {
                    current_state = Select::new("All Mods:", mod_list_options)
                        .prompt()
                        .with_interrupted_default(EditMenuAction::MainMenu)?;
                }
            }
            EditMenuAction::EditMod(mod_name, mod_id) => {
                let Some(record) = catalog.get_by_id(&mod_id) else {
                    eprintln!("Mod {} disappeared", mod_id);
                    current_state = previous_menu_state.clone();
                    continue;
                };
                let metadata = record.metadata();
                let mut options: Vec<EditMenuAction> = Vec::new();
                if !catalog.options().keep_name_pinned {
                    options.push(EditMenuAction::EditModName(mod_id.clone(), metadata.name));
                }
                options.push(EditMenuAction::EditModSource(mod_id.clone(), metadata.url));
                options.push(EditMenuAction::EditModCategory(
                    mod_id.clone(),
                    metadata.category,
                ));
                options.push(EditMenuAction::EditModTags(mod_id.clone()));
                options.push(previous_menu_state.clone());
                current_state = Select::new(format!("Edit mod {}:", mod_name).as_str(), options)
                    .prompt()
                    .with_interrupted_default(previous_menu_state.clone())?;
            }
            EditMenuAction::EditModName(mod_id, name) => {
                let new_name = answered(
                    Text::new("Mod name:")
                        .with_initial_value(&name)
                        .with_default(&name)
                        .with_validator(inquire::required!())
                        .prompt(),
                )?;
                if let Some(new_name) = new_name {
                    catalog.set_name(&mod_id, &new_name).await?;
                }
                current_state = back_to_mod(catalog, mod_id);
            }
            EditMenuAction::EditModSource(mod_id, url) => {
                if let Some(new_source) = answered(util::get_source_url_raw(url.as_deref()))? {
                    catalog.set_url(&mod_id, Some(new_source)).await?;
                }
                current_state = back_to_mod(catalog, mod_id);
            }
            EditMenuAction::EditModCategory(mod_id, category) => {
                let current = category.unwrap_or_default();
                let new_category = answered(
                    Text::new("Category:")
                        .with_initial_value(&current)
                        .with_help_message("Use / to nest categories, leave empty to clear")
                        .prompt(),
                )?;
                if let Some(new_category) = new_category {
                    catalog.set_category(&mod_id, Some(new_category)).await?;
                }
                current_state = back_to_mod(catalog, mod_id);
            }
            EditMenuAction::EditModTags(mod_id) => {
                let tags = catalog
                    .get_by_id(&mod_id)
                    .map(|record| record.metadata().tags)
                    .unwrap_or_default();
                let mut tag_options: Vec<_> = tags
                    .into_iter()
                    .map(|tag| EditMenuAction::DeleteTag(mod_id.clone(), tag))
                    .collect();
                tag_options.push(EditMenuAction::AddTag(mod_id.clone()));
                let return_option = back_to_mod(catalog, mod_id);
                tag_options.push(return_option.clone());
                current_state = Select::new("Edit tags:", tag_options)
                    .prompt()
                    .with_interrupted_default(return_option)?;
            }
            EditMenuAction::DeleteTag(mod_id, tag_name) => {
                let confirm = answered(
                    Confirm::new(format!("Remove tag '{}'?", tag_name).as_str())
                        .with_default(false)
                        .prompt(),
                )?;
                if confirm == Some(true) {
                    let mut tags = catalog
                        .get_by_id(&mod_id)
                        .map(|record| record.metadata().tags)
                        .unwrap_or_default();
                    tags.retain(|t| t != &tag_name);
                    catalog.set_tags(&mod_id, tags).await?;
                }
                current_state = EditMenuAction::EditModTags(mod_id);
            }
            EditMenuAction::AddTag(mod_id) => {
                let mut tags = catalog
                    .get_by_id(&mod_id)
                    .map(|record| record.metadata().tags)
                    .unwrap_or_default();
                let new_tag = answered(
                    Text::new("Enter tag:")
                        .with_autocomplete(TagAutoComplete::create_with_exclusions(
                            catalog.index(),
                            &tags,
                        ))
                        .with_validator(inquire::required!())
                        .prompt(),
                )?;
                if let Some(new_tag) = new_tag {
                    if !tags.contains(&new_tag) {
                        tags.push(new_tag);
                        catalog.set_tags(&mod_id, tags).await?;
                    }
                }
                current_state = EditMenuAction::EditModTags(mod_id);
            }
            EditMenuAction::Quit => {}
        }
    }
    println!("Exiting...");
    Ok(())
}

fn back_to_mod(catalog: &ModCatalog, mod_id: String) -> EditMenuAction {
    let name = catalog
        .get_by_id(&mod_id)
        .map(|record| record.metadata().name)
        .unwrap_or_default();
    EditMenuAction::EditMod(name, mod_id)
}
