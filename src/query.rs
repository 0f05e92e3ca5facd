//! Text + category search over the menu table.
//!
//! Name matching is a literal, case-insensitive substring test. Category
//! matching is exact. An empty category set selects every category.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::local_db_model::MenuItem;
use crate::menu_store::MenuStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuQuery {
    text: String,
    needle: String,
    categories: BTreeSet<String>,
}

impl MenuQuery {
    pub fn new<I, S>(text: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let text = text.into();
        let needle = text.to_lowercase();
        Self {
            text,
            needle,
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches every record.
    pub fn all() -> Self {
        Self::new("", Vec::<String>::new())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn is_unfiltered(&self) -> bool {
        self.text.is_empty() && self.categories.is_empty()
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(AppResponse::QueryError("Category filter contains a blank entry".to_string()));
        }
        Ok(())
    }

    pub fn matches(&self, item: &MenuItem) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(&item.category);
        category_ok && (self.needle.is_empty() || item.name.to_lowercase().contains(&self.needle))
    }
}

/// JSON shape of a search request coming over FFI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub categories: Vec<String>,
}

impl From<SearchRequest> for MenuQuery {
    fn from(req: SearchRequest) -> Self {
        MenuQuery::new(req.query, req.categories)
    }
}

/// Resolves `query` directly against the store. Holds no state between calls.
pub fn resolve(store: &MenuStore, query: &MenuQuery) -> Result<Vec<MenuItem>, AppResponse> {
    query.validate()?;
    if query.is_unfiltered() {
        return store.scan_all();
    }
    store.scan_filtered(&query.text, &query.categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, category: &str) -> MenuItem {
        MenuItem {
            id: 1,
            name: name.to_string(),
            price: 1.0,
            description: String::new(),
            image: String::new(),
            category: category.to_string(),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = MenuQuery::all();
        assert!(q.is_unfiltered());
        assert!(q.matches(&item("Greek Salad", "starters")));
        assert!(q.matches(&item("Lemon Dessert", "desserts")));
    }

    #[test]
    fn text_match_ignores_case() {
        let q = MenuQuery::new("greek", Vec::<String>::new());
        assert!(q.matches(&item("Greek Salad", "starters")));
        assert!(!q.matches(&item("Bruschetta", "starters")));
        let upper = MenuQuery::new("SALAD", Vec::<String>::new());
        assert!(upper.matches(&item("Greek Salad", "starters")));
    }

    #[test]
    fn text_match_is_literal() {
        let q = MenuQuery::new("%", Vec::<String>::new());
        assert!(!q.matches(&item("Greek Salad", "starters")));
        assert!(q.matches(&item("100% Lemon", "drinks")));
    }

    #[test]
    fn category_match_is_exact_and_case_sensitive() {
        let q = MenuQuery::new("", ["mains"]);
        assert!(q.matches(&item("Pasta", "mains")));
        assert!(!q.matches(&item("Pasta", "Mains")));
        assert!(!q.matches(&item("Greek Salad", "starters")));
    }

    #[test]
    fn text_and_category_are_conjunctive() {
        let q = MenuQuery::new("salad", ["mains"]);
        assert!(q.matches(&item("Chicken Salad", "mains")));
        assert!(!q.matches(&item("Fruit Salad", "desserts")));
        assert!(!q.matches(&item("Pasta", "mains")));
    }

    #[test]
    fn blank_category_is_a_query_error() {
        let q = MenuQuery::new("", ["mains", " "]);
        assert!(matches!(q.validate(), Err(AppResponse::QueryError(_))));
    }

    #[test]
    fn search_request_defaults() {
        let req: SearchRequest = serde_json::from_str("{}").unwrap();
        let q: MenuQuery = req.into();
        assert!(q.is_unfiltered());
    }
}
