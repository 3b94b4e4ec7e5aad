//! The set of known expense categories, used for autocomplete.

use crate::api::Sheet;
use crate::{Layout, Result};
use std::collections::HashSet;
use tracing::debug;

/// The categories offered before anything has been recorded.
pub const PREDEFINED_CATEGORIES: [&str; 10] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Health",
    "Entertainment",
    "Bills & Utilities",
    "Travel",
    "Education",
    "Personal Care",
    "Gifts & Donations",
];

/// The most suggestions a chat client will show for one query.
pub const MAX_SUGGESTIONS: usize = 25;

/// An in-memory set of category names that remembers insertion order: the predefined categories
/// come first, then the ones found in the sheet, then the ones added while running.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.extend(PREDEFINED_CATEGORIES);
        registry
    }
}

impl CategoryRegistry {
    /// A registry with the predefined categories.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Reads the category column once and returns a registry holding the predefined categories
    /// plus every non-empty value found there.
    pub(crate) async fn load(sheet: &mut dyn Sheet, layout: &Layout) -> Result<Self> {
        let mut registry = Self::new();
        let rows = sheet.read_range(&layout.category_range()).await?;
        let before = registry.len();
        registry.extend(rows.into_iter().filter_map(|row| row.into_iter().next()));
        debug!(
            "Loaded {} categories from the sheet, {} total",
            registry.len() - before,
            registry.len()
        );
        Ok(registry)
    }

    /// Admits `name`, returning `true` if it was not known before. Blank names are ignored.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() || self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    /// Admits every name in `names`.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add(name);
        }
    }

    /// Up to 25 names whose lowercase form contains the lowercase `query`, in registry order. An
    /// empty query matches everything.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        self.names
            .iter()
            .filter(|name| name.to_lowercase().contains(&query))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name.trim())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestSheet, TestSheetState};

    #[test]
    fn test_predefined_order() {
        let registry = CategoryRegistry::new();
        assert_eq!(registry.len(), 10);
        let names: Vec<&str> = registry.iter().collect();
        assert_eq!(names, PREDEFINED_CATEGORIES);
    }

    #[test]
    fn test_add_grows_by_one() {
        let mut registry = CategoryRegistry::new();
        assert!(registry.add("Pets"));
        assert_eq!(registry.len(), 11);
        assert!(!registry.add("Pets"));
        assert!(!registry.add("  Pets "));
        assert!(!registry.add("Food & Dining"));
        assert!(!registry.add("   "));
        assert_eq!(registry.len(), 11);
        assert!(registry.contains("Pets"));
    }

    #[test]
    fn test_suggest_substring() {
        let registry = CategoryRegistry::new();
        assert_eq!(registry.suggest("foo"), vec!["Food & Dining"]);
        assert_eq!(
            registry.suggest("TION"),
            vec!["Transportation", "Education", "Gifts & Donations"]
        );
        assert!(registry.suggest("zzz").is_empty());
        assert_eq!(registry.suggest("").len(), 10);
    }

    #[test]
    fn test_suggest_is_capped() {
        let mut registry = CategoryRegistry::empty();
        registry.extend((0..40).map(|i| format!("Category {i:02}")));
        let suggestions = registry.suggest("category");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(suggestions[0], "Category 00");
        assert_eq!(suggestions[24], "Category 24");
    }

    #[tokio::test]
    async fn test_load_from_sheet() {
        let id = uuid::Uuid::new_v4().to_string();
        TestSheet::new(&id).set_state(
            TestSheetState::from_rows([
                vec!["Date", "Category", "Amount", "Description"],
                vec!["2024-01-01", "Pets", "10", "food"],
                vec!["2024-01-02", "", "10", "blank"],
                vec!["2024-01-03", "Food & Dining", "10", "lunch"],
                vec!["2024-01-04", "Pets", "10", "toy"],
            ]),
        );
        let mut sheet = TestSheet::new(&id);
        let registry = CategoryRegistry::load(&mut sheet, &Layout::default())
            .await
            .unwrap();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.iter().last(), Some("Pets"));
    }
}
