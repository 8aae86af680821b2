use std::fmt::Display;

use colored::{ColoredString, Colorize};
use inquire::autocompletion::Replacement;
use inquire::error::InquireResult;
use inquire::CustomUserError;
use modshelf::{IndexManager, ModRecord, ModStatus};
use radix_trie::TrieCommon;

use crate::Result as CrateResult;

#[derive(Clone)]
pub struct URLValidator {}

impl URLValidator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for URLValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl inquire::validator::StringValidator for URLValidator {
    fn validate(
        &self,
        input: &str,
    ) -> Result<inquire::validator::Validation, inquire::CustomUserError> {
        match url::Url::parse(input) {
            Ok(_) => Ok(inquire::validator::Validation::Valid),
            Err(e) => Ok(inquire::validator::Validation::Invalid(
                format!("Failed to validate URL: {}", e).as_str().into(),
            )),
        }
    }
}

pub fn get_source_url_raw(current: Option<&str>) -> InquireResult<String> {
    let prompt = inquire::Text::new("Source URL:").with_placeholder("https://example.com/mod");

    if let Some(current) = current {
        prompt.with_default(current).with_initial_value(current)
    } else {
        prompt
    }
    .with_validator(inquire::required!())
    .with_validator(URLValidator::default())
    .prompt()
}

/// Validates a URL given on the command line.
pub fn check_source_url(input: &str) -> CrateResult<()> {
    url::Url::parse(input)?;
    Ok(())
}

#[derive(Clone)]
pub struct TagAutoComplete {
    pub tag_trie: radix_trie::Trie<String, ()>,
}

impl TagAutoComplete {
    pub fn create_with_exclusions(index: &IndexManager, exclusions: &[String]) -> TagAutoComplete {
        TagAutoComplete {
            tag_trie: index
                .tags_by_frequency(None)
                .into_iter()
                .filter(|entry| !exclusions.contains(&entry.label))
                .map(|entry| (entry.label, ()))
                .collect::<radix_trie::Trie<String, ()>>(),
        }
    }
}

impl inquire::Autocomplete for TagAutoComplete {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, CustomUserError> {
        if let Some(suggestions) = self.tag_trie.subtrie(input) {
            return Ok(suggestions.keys().cloned().collect());
        }
        Ok(vec![])
    }

    fn get_completion(
        &mut self,
        input: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, CustomUserError> {
        if highlighted_suggestion.is_some() {
            Ok(highlighted_suggestion)
        } else {
            let suggestions = self.get_suggestions(input)?;
            Ok(suggestions.first().cloned())
        }
    }
}

pub fn status_label(status: ModStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ModStatus::Active => label.green(),
        ModStatus::Inactive => label.normal(),
        ModStatus::Conflicted => label.yellow(),
        ModStatus::Error => label.red(),
    }
    .bold()
}

pub fn mod_label(record: &ModRecord) -> ColoredString {
    let name = record.metadata().name;
    match record.status() {
        ModStatus::Active => name.green(),
        ModStatus::Conflicted => name.yellow(),
        ModStatus::Error => name.red(),
        ModStatus::Inactive => name.normal(),
    }
    .bold()
}

/// Prints `title` in a heavy box whose lower left corner branches into the
/// lines that follow.
pub fn print_title(title: &str, styled: impl Display) {
    let title_corner = boxy::Char::upper_left(boxy::Weight::Thick);
    let title_side_h = boxy::Char::horizontal(boxy::Weight::Thick).to_string();
    let title_side_v = boxy::Char::vertical(boxy::Weight::Thick);
    let title_branch = boxy::Char::right_tee(boxy::Weight::Thick).down(boxy::Weight::Normal);
    let width = title.chars().count() + 2;

    println!(
        "{}{}{}",
        title_corner,
        title_side_h.repeat(width),
        title_corner.rotate_cw(1)
    );
    println!("{} {} {}", title_side_v, styled, title_side_v);
    println!(
        "{}{}{}",
        title_branch,
        title_side_h.repeat(width),
        title_corner.rotate_cw(2)
    );
}

/// Prints `items` as branches below a title box.
pub fn print_branches<I, T>(items: I)
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let left_branch_more_str = boxy::Char::right_tee(boxy::Weight::Normal).to_string();
    let left_branch_done_str = boxy::Char::lower_left(boxy::Weight::Normal).to_string();
    let left_node = boxy::Char::left_half(boxy::Weight::Normal);

    let mut items = items.into_iter().peekable();
    while let Some(item) = items.next() {
        println!(
            "{}{}{}",
            if items.peek().is_some() {
                &left_branch_more_str
            } else {
                &left_branch_done_str
            },
            left_node,
            item
        );
    }
}
