//! Coalescing and sequencing in front of [`crate::query::resolve`].
//!
//! The presentation layer feeds raw input here: search box edits are
//! debounced, filter chip toggles go out immediately. Every outgoing
//! [`SearchTicket`] carries a sequence number and a result is only shown if
//! nothing newer has been shown already, so a slow stale search can never
//! overwrite a fresh one.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::debug;

use crate::app_response::AppResponse;
use crate::local_db_model::MenuItem;
use crate::query::MenuQuery;

/// Ordered category vocabulary with one toggle per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySelection {
    sections: Vec<String>,
    selected: Vec<bool>,
}

impl CategorySelection {
    pub fn new(sections: Vec<String>) -> Self {
        let selected = vec![false; sections.len()];
        Self { sections, selected }
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn toggle(&mut self, index: usize) -> Result<bool, AppResponse> {
        let flag = self.selected.get_mut(index).ok_or_else(|| {
            AppResponse::QueryError(format!(
                "Category index {index} out of range ({} sections)",
                self.sections.len()
            ))
        })?;
        *flag = !*flag;
        Ok(*flag)
    }

    pub fn clear(&mut self) {
        self.selected.iter_mut().for_each(|s| *s = false);
    }

    /// Selected identifiers. Empty when nothing is selected, which the query
    /// engine reads as "every category".
    pub fn active_categories(&self) -> BTreeSet<String> {
        self.sections
            .iter()
            .zip(&self.selected)
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Holds back a value until input has been quiet for `window`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Replaces any pending value and restarts the quiet window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hands out the pending value once the quiet window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.window => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// Hands out the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// A search the caller should run, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: MenuQuery,
}

pub struct MenuBrowser {
    selection: CategorySelection,
    search_text: String,
    committed_text: String,
    debouncer: Debouncer<String>,
    next_seq: u64,
    applied_seq: Option<u64>,
    visible: Vec<MenuItem>,
}

impl MenuBrowser {
    pub fn new(sections: Vec<String>, debounce: Duration) -> Self {
        Self {
            selection: CategorySelection::new(sections),
            search_text: String::new(),
            committed_text: String::new(),
            debouncer: Debouncer::new(debounce),
            next_seq: 0,
            applied_seq: None,
            visible: Vec::new(),
        }
    }

    pub fn selection(&self) -> &CategorySelection {
        &self.selection
    }

    /// Raw text currently in the search box, debounced or not.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn visible(&self) -> &[MenuItem] {
        &self.visible
    }

    /// Shows the initial data set without going through a search.
    pub fn show_initial(&mut self, items: Vec<MenuItem>) {
        if self.applied_seq.is_none() {
            self.visible = items;
        }
    }

    pub fn on_search_change(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.search_text = text.clone();
        self.debouncer.push(text, now);
    }

    /// Toggles a filter chip and issues a search right away, folding in any
    /// pending text edit.
    pub fn on_filter_toggle(&mut self, index: usize) -> Result<SearchTicket, AppResponse> {
        self.selection.toggle(index)?;
        if let Some(text) = self.debouncer.flush() {
            self.committed_text = text;
        }
        Ok(self.issue())
    }

    /// Issues a search when a debounced text edit has settled.
    pub fn tick(&mut self, now: Instant) -> Option<SearchTicket> {
        let text = self.debouncer.poll(now)?;
        if text == self.committed_text && self.applied_seq.is_some() {
            return None;
        }
        self.committed_text = text;
        Some(self.issue())
    }

    fn issue(&mut self) -> SearchTicket {
        self.next_seq += 1;
        SearchTicket {
            seq: self.next_seq,
            query: MenuQuery::new(self.committed_text.clone(), self.selection.active_categories()),
        }
    }

    /// Applies the result for `seq` unless a newer one is already showing.
    /// Returns whether the result was applied.
    pub fn complete(&mut self, seq: u64, items: Vec<MenuItem>) -> bool {
        if self.applied_seq.is_some_and(|applied| seq <= applied) || seq > self.next_seq {
            debug!("Discarding stale search result #{seq}");
            return false;
        }
        self.applied_seq = Some(seq);
        self.visible = items;
        true
    }

    /// Drops pending input, as when the screen goes away.
    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<String> {
        ["starters", "mains", "desserts", "drinks"].iter().map(|s| s.to_string()).collect()
    }

    fn item(id: u64) -> MenuItem {
        MenuItem {
            id,
            name: format!("item {id}"),
            price: 1.0,
            description: String::new(),
            image: String::new(),
            category: "mains".to_string(),
        }
    }

    #[test]
    fn selection_toggles_and_reports_active() {
        let mut sel = CategorySelection::new(sections());
        assert!(sel.active_categories().is_empty());
        assert!(sel.toggle(1).unwrap());
        assert!(sel.toggle(3).unwrap());
        let active: Vec<_> = sel.active_categories().into_iter().collect();
        assert_eq!(active, vec!["drinks", "mains"]);
        assert!(!sel.toggle(1).unwrap());
        assert!(!sel.is_selected(1));
        assert!(matches!(sel.toggle(9), Err(AppResponse::QueryError(_))));
        sel.clear();
        assert!(sel.active_categories().is_empty());
    }

    #[test]
    fn debouncer_coalesces_bursts() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(500));
        d.push("g", start);
        d.push("gr", start + Duration::from_millis(100));
        d.push("gre", start + Duration::from_millis(200));
        assert_eq!(d.poll(start + Duration::from_millis(600)), None);
        assert_eq!(d.poll(start + Duration::from_millis(700)), Some("gre"));
        assert_eq!(d.poll(start + Duration::from_millis(2000)), None);
    }

    #[test]
    fn debouncer_flush_and_cancel() {
        let now = Instant::now();
        let mut d = Debouncer::new(Duration::from_secs(10));
        d.push(1, now);
        assert_eq!(d.flush(), Some(1));
        d.push(2, now);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(now + Duration::from_secs(60)), None);
    }

    #[test]
    fn text_edits_issue_one_ticket_after_quiet_window() {
        let start = Instant::now();
        let mut b = MenuBrowser::new(sections(), Duration::from_millis(500));
        b.on_search_change("sal", start);
        b.on_search_change("salad", start + Duration::from_millis(200));
        assert_eq!(b.search_text(), "salad");
        assert!(b.tick(start + Duration::from_millis(300)).is_none());
        let ticket = b.tick(start + Duration::from_millis(800)).unwrap();
        assert_eq!(ticket.seq, 1);
        assert_eq!(ticket.query.text(), "salad");
        assert!(ticket.query.categories().is_empty());
    }

    #[test]
    fn filter_toggle_issues_immediately_with_pending_text() {
        let start = Instant::now();
        let mut b = MenuBrowser::new(sections(), Duration::from_millis(500));
        b.on_search_change("fish", start);
        let ticket = b.on_filter_toggle(1).unwrap();
        assert_eq!(ticket.query.text(), "fish");
        assert!(ticket.query.categories().contains("mains"));
        assert!(b.tick(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut b = MenuBrowser::new(sections(), Duration::from_millis(500));
        let first = b.on_filter_toggle(0).unwrap();
        let second = b.on_filter_toggle(1).unwrap();
        assert!(second.seq > first.seq);

        assert!(b.complete(second.seq, vec![item(2)]));
        assert!(!b.complete(first.seq, vec![item(1)]));
        assert_eq!(b.visible(), &[item(2)]);
    }

    #[test]
    fn unknown_sequence_numbers_are_rejected() {
        let mut b = MenuBrowser::new(sections(), Duration::from_millis(500));
        assert!(!b.complete(7, vec![item(1)]));
        assert!(b.visible().is_empty());
    }

    #[test]
    fn initial_data_does_not_override_search_results() {
        let mut b = MenuBrowser::new(sections(), Duration::from_millis(500));
        b.show_initial(vec![item(1), item(2)]);
        assert_eq!(b.visible().len(), 2);
        let t = b.on_filter_toggle(2).unwrap();
        assert!(b.complete(t.seq, vec![]));
        b.show_initial(vec![item(3)]);
        assert!(b.visible().is_empty());
    }
}
