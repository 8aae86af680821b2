//! Category and tag indices over the catalog.
//!
//! The index is only ever changed through [`IndexManager::rebuild_full`] and
//! [`IndexManager::apply_delta`]. It remembers which buckets each id was put
//! in, so removing an id never needs the metadata it was indexed with.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::metadata::ModMetadata;

/// A label together with the ids filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub mods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub total_categories: usize,
    pub total_tags: usize,
    pub most_used_category: Option<String>,
    pub most_used_tag: Option<String>,
    pub average_mods_per_category: f64,
    pub average_tags_per_mod: f64,
}

/// Node of the `/`-separated category hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub count: usize,
    pub children: BTreeMap<String, CategoryNode>,
}

#[derive(Debug, Clone, Default)]
struct Membership {
    category: Option<String>,
    tags: Vec<String>,
}

#[derive(Debug, Default)]
pub struct IndexManager {
    categories: HashMap<String, BTreeSet<String>>,
    tags: HashMap<String, BTreeSet<String>>,
    memberships: HashMap<String, Membership>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild_full(&mut self, mods: &[ModMetadata]) {
        self.categories.clear();
        self.tags.clear();
        self.memberships.clear();
        for metadata in mods {
            self.insert(metadata);
        }
        debug!(
            mods = self.memberships.len(),
            categories = self.categories.len(),
            tags = self.tags.len(),
            "rebuilt index"
        );
    }

    /// Drops `removed` ids, then files `added` mods. An added id that is
    /// already indexed replaces its previous entries.
    pub fn apply_delta(&mut self, added: &[ModMetadata], removed: &[String]) {
        for id in removed {
            self.remove(id);
        }
        for metadata in added {
            self.remove(&metadata.id);
            self.insert(metadata);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.memberships.contains_key(id)
    }

    /// Number of indexed mods.
    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    pub fn tags_of(&self, id: &str) -> Option<&[String]> {
        self.memberships.get(id).map(|m| m.tags.as_slice())
    }

    pub fn category_of(&self, id: &str) -> Option<&str> {
        self.memberships.get(id).and_then(|m| m.category.as_deref())
    }

    pub fn by_category(&self, category: &str) -> Vec<String> {
        members(&self.categories, category.trim())
    }

    pub fn by_tag(&self, tag: &str) -> Vec<String> {
        members(&self.tags, tag.trim())
    }

    /// Mods carrying every one of `tags`. No tags selects every mod.
    pub fn by_all_tags(&self, tags: &[String]) -> Vec<String> {
        let mut sets = tags.iter().map(|tag| self.tags.get(tag.trim()));
        let Some(first) = sets.next() else {
            return self.all_ids();
        };
        let Some(first) = first else {
            return Vec::new();
        };
        let mut result = first.clone();
        for set in sets {
            match set {
                Some(set) => result.retain(|id| set.contains(id)),
                None => return Vec::new(),
            }
        }
        result.into_iter().collect()
    }

    /// Mods carrying at least one of `tags`. No tags selects every mod.
    pub fn by_any_tag(&self, tags: &[String]) -> Vec<String> {
        if tags.is_empty() {
            return self.all_ids();
        }
        tags.iter()
            .filter_map(|tag| self.tags.get(tag.trim()))
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn categories_by_frequency(&self, limit: Option<usize>) -> Vec<LabelCount> {
        by_frequency(&self.categories, limit, |_| true)
    }

    pub fn tags_by_frequency(&self, limit: Option<usize>) -> Vec<LabelCount> {
        by_frequency(&self.tags, limit, |_| true)
    }

    /// Categories whose label contains `query`, ignoring case.
    pub fn search_categories(&self, query: &str) -> Vec<LabelCount> {
        let query = query.to_lowercase();
        by_frequency(&self.categories, None, |label| {
            label.to_lowercase().contains(&query)
        })
    }

    /// Tags whose label contains `query`, ignoring case.
    pub fn search_tags(&self, query: &str) -> Vec<LabelCount> {
        let query = query.to_lowercase();
        by_frequency(&self.tags, None, |label| label.to_lowercase().contains(&query))
    }

    pub fn statistics(&self) -> IndexStatistics {
        let category_members: usize = self.categories.values().map(BTreeSet::len).sum();
        let tag_members: usize = self.tags.values().map(BTreeSet::len).sum();
        IndexStatistics {
            total_categories: self.categories.len(),
            total_tags: self.tags.len(),
            most_used_category: self
                .categories_by_frequency(Some(1))
                .pop()
                .map(|entry| entry.label),
            most_used_tag: self.tags_by_frequency(Some(1)).pop().map(|entry| entry.label),
            average_mods_per_category: average(category_members, self.categories.len()),
            average_tags_per_mod: average(tag_members, self.memberships.len()),
        }
    }

    /// Category labels split on `separator` into a tree. Each node counts the
    /// mods filed at or below it.
    pub fn category_tree(&self, separator: char) -> CategoryNode {
        let mut root = CategoryNode::default();
        for (label, ids) in self.categories.iter() {
            let mut node = &mut root;
            node.count += ids.len();
            for part in label.split(separator).map(str::trim).filter(|p| !p.is_empty()) {
                node = node.children.entry(part.to_string()).or_default();
                node.count += ids.len();
            }
        }
        root
    }

    fn all_ids(&self) -> Vec<String> {
        self.memberships
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn insert(&mut self, metadata: &ModMetadata) {
        let category = metadata
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let tags = crate::metadata::normalize_labels(metadata.tags.clone());

        if let Some(category) = &category {
            self.categories
                .entry(category.clone())
                .or_default()
                .insert(metadata.id.clone());
        }
        for tag in tags.iter() {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(metadata.id.clone());
        }
        self.memberships
            .insert(metadata.id.clone(), Membership { category, tags });
    }

    fn remove(&mut self, id: &str) {
        let Some(membership) = self.memberships.remove(id) else {
            return;
        };
        if let Some(category) = membership.category {
            drop_member(&mut self.categories, &category, id);
        }
        for tag in membership.tags {
            drop_member(&mut self.tags, &tag, id);
        }
    }
}

fn drop_member(buckets: &mut HashMap<String, BTreeSet<String>>, label: &str, id: &str) {
    if let Some(bucket) = buckets.get_mut(label) {
        bucket.remove(id);
        if bucket.is_empty() {
            buckets.remove(label);
        }
    }
}

fn members(buckets: &HashMap<String, BTreeSet<String>>, label: &str) -> Vec<String> {
    buckets
        .get(label)
        .map(|ids| ids.iter().cloned().collect())
        .unwrap_or_default()
}

fn by_frequency(
    buckets: &HashMap<String, BTreeSet<String>>,
    limit: Option<usize>,
    keep: impl Fn(&str) -> bool,
) -> Vec<LabelCount> {
    let mut entries: Vec<LabelCount> = buckets
        .iter()
        .filter(|(label, _)| keep(label))
        .map(|(label, ids)| LabelCount {
            label: label.clone(),
            count: ids.len(),
            mods: ids.iter().cloned().collect(),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total as f64 / count as f64 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn meta(id: &str, category: Option<&str>, tags: &[&str]) -> ModMetadata {
        let mut metadata = ModMetadata::fallback(&PathBuf::from(format!("/mods/{id}")));
        metadata.id = id.to_string();
        metadata.category = category.map(str::to_string);
        metadata.tags = tags.iter().map(|t| t.to_string()).collect();
        metadata
    }

    fn tags(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    fn assert_consistent(index: &IndexManager, mods: &[ModMetadata]) {
        assert_eq!(index.len(), mods.len());
        for m in mods {
            for tag in m.tags.iter() {
                assert!(index.by_tag(tag).contains(&m.id), "{} missing under {tag}", m.id);
            }
        }
        for entry in index.tags_by_frequency(None) {
            for id in entry.mods.iter() {
                let m = mods.iter().find(|m| &m.id == id).expect("indexed id not in catalog");
                assert!(m.tags.contains(&entry.label));
            }
        }
    }

    #[test]
    fn rebuild_indexes_categories_and_tags() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[
            meta("a", Some("Armor"), &["ui"]),
            meta("b", Some("Armor"), &["ui", "combat"]),
            meta("c", None, &[]),
        ]);

        assert_eq!(index.by_category("Armor"), vec!["a", "b"]);
        assert_eq!(index.by_tag("ui"), vec!["a", "b"]);
        assert_eq!(index.by_tag("combat"), vec!["b"]);
        assert!(index.contains("c"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn delta_drops_empty_buckets() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[meta("a", Some("Armor"), &["ui"]), meta("b", None, &["ui", "combat"])]);

        index.apply_delta(&[], &["b".to_string()]);

        assert!(index.by_tag("combat").is_empty());
        assert!(index.tags_by_frequency(None).iter().all(|e| e.label != "combat"));
        assert_eq!(index.by_tag("ui"), vec!["a"]);

        index.apply_delta(&[], &["a".to_string()]);
        assert!(index.categories_by_frequency(None).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn delta_replaces_changed_mod() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[meta("a", Some("Armor"), &["ui"])]);

        index.apply_delta(&[meta("a", Some("Weapons"), &["combat"])], &[]);

        assert!(index.by_tag("ui").is_empty());
        assert!(index.by_category("Armor").is_empty());
        assert_eq!(index.by_category("Weapons"), vec!["a"]);
        assert_eq!(index.tags_of("a").unwrap(), ["combat".to_string()]);
    }

    #[test]
    fn intersection_and_union_queries() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[
            meta("a", None, &["ui"]),
            meta("b", None, &["ui", "combat"]),
            meta("c", None, &["sound"]),
        ]);

        assert_eq!(index.by_all_tags(&tags(&["ui", "combat"])), vec!["b"]);
        assert!(index.by_all_tags(&tags(&["ui", "missing"])).is_empty());
        assert_eq!(index.by_any_tag(&tags(&["combat", "sound"])), vec!["b", "c"]);
        assert_eq!(index.by_all_tags(&[]), vec!["a", "b", "c"]);
    }

    #[test]
    fn labels_are_frequency_ordered() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[
            meta("a", None, &["b-tag", "common"]),
            meta("b", None, &["a-tag", "common"]),
        ]);

        let labels: Vec<_> = index
            .tags_by_frequency(None)
            .into_iter()
            .map(|e| (e.label, e.count))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("common".to_string(), 2),
                ("a-tag".to_string(), 1),
                ("b-tag".to_string(), 1)
            ]
        );
        assert_eq!(index.tags_by_frequency(Some(1)).len(), 1);
    }

    #[test]
    fn stays_consistent_through_add_remove_sequences() {
        let mut index = IndexManager::new();
        let mut catalog = vec![meta("a", None, &["ui"]), meta("b", None, &["ui", "combat"])];
        index.rebuild_full(&catalog);
        assert_consistent(&index, &catalog);

        let c = meta("c", Some("Sound"), &["combat", "sound"]);
        catalog.push(c.clone());
        index.apply_delta(&[c], &[]);
        assert_consistent(&index, &catalog);

        catalog.retain(|m| m.id != "b");
        index.apply_delta(&[], &["b".to_string()]);
        assert_consistent(&index, &catalog);

        let a = meta("a", None, &["hud"]);
        catalog[0] = a.clone();
        index.apply_delta(&[a], &["a".to_string()]);
        assert_consistent(&index, &catalog);
        assert!(index.by_tag("ui").is_empty());
    }

    #[test]
    fn search_and_statistics() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[
            meta("a", Some("Armor/Heavy"), &["UI"]),
            meta("b", Some("Armor/Light"), &["ui-extra", "combat"]),
            meta("c", Some("Armor/Heavy"), &[]),
        ]);

        let found: Vec<_> = index.search_tags("ui").into_iter().map(|e| e.label).collect();
        assert_eq!(found, vec!["UI", "ui-extra"]);
        assert_eq!(index.search_categories("light").len(), 1);

        let stats = index.statistics();
        assert_eq!(stats.total_categories, 2);
        assert_eq!(stats.total_tags, 3);
        assert_eq!(stats.most_used_category.as_deref(), Some("Armor/Heavy"));
        assert_eq!(stats.average_mods_per_category, 1.5);
        assert_eq!(stats.average_tags_per_mod, 1.0);
    }

    #[test]
    fn category_tree_counts_descendants() {
        let mut index = IndexManager::new();
        index.rebuild_full(&[
            meta("a", Some("Armor/Heavy"), &[]),
            meta("b", Some("Armor/Light"), &[]),
            meta("c", Some("Weapons"), &[]),
        ]);

        let tree = index.category_tree('/');
        assert_eq!(tree.count, 3);
        assert_eq!(tree.children["Armor"].count, 2);
        assert_eq!(tree.children["Armor"].children["Heavy"].count, 1);
        assert_eq!(tree.children["Weapons"].count, 1);
    }
}
