//! Fetch-once-then-persist population of the menu table.
//!
//! The remote source is consulted only while the store is empty. Once rows
//! exist, every later start serves from the store even if the remote menu has
//! changed since.

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::local_db_model::{MenuItem, NewMenuItem};
use crate::menu_source::MenuSource;
use crate::menu_store::MenuStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationState {
    Uninitialized,
    Populated,
}

pub struct MenuCache {
    store: MenuStore,
    state: PopulationState,
    current: Vec<MenuItem>,
}

impl MenuCache {
    pub fn new(store: MenuStore) -> Self {
        Self {
            store,
            state: PopulationState::Uninitialized,
            current: Vec::new(),
        }
    }

    pub fn store(&self) -> &MenuStore {
        &self.store
    }

    pub fn state(&self) -> PopulationState {
        self.state
    }

    /// The data set established by the last successful population.
    pub fn current(&self) -> &[MenuItem] {
        &self.current
    }

    /// Moves the cache to `Populated`.
    ///
    /// Ensures the schema, serves existing rows when there are any, and
    /// otherwise fetches from `source` and inserts the result. A fetch
    /// failure leaves the store empty (schema kept) and reports
    /// `DataUnavailable`; calling again retries the whole sequence.
    pub fn populate(&mut self, source: &dyn MenuSource) -> Result<&[MenuItem], AppResponse> {
        if self.state == PopulationState::Populated {
            if self.store.handle().is_open() {
                return Ok(&self.current);
            }
            self.invalidate();
        }

        self.store.ensure_schema()?;
        let existing = self.store.scan_all()?;
        if !existing.is_empty() {
            info!("Menu served from local store ({} items)", existing.len());
            return Ok(self.mark_populated(existing));
        }

        info!("Local menu store is empty; fetching remote menu");
        let fetched = fetch(source)?;
        let inserted = self.store.bulk_insert(fetched)?;
        Ok(self.mark_populated(inserted))
    }

    /// Replaces the stored menu with a fresh copy from `source`.
    ///
    /// The fetch happens first, so a failing source leaves the old rows in
    /// place, and the swap is a single transaction, so a failing write does
    /// too. Record ids keep growing across refreshes.
    pub fn refresh(&mut self, source: &dyn MenuSource) -> Result<&[MenuItem], AppResponse> {
        self.store.ensure_schema()?;
        let fetched = fetch(source)?;
        for item in &fetched {
            item.validate()?;
        }
        let inserted = self.store.replace_all(fetched)?;
        info!("Menu refreshed ({} items)", inserted.len());
        Ok(self.mark_populated(inserted))
    }

    /// Forgets the in-memory data set; the next `populate` consults the store
    /// again. Called when the underlying database is closed or reset.
    pub fn invalidate(&mut self) {
        self.state = PopulationState::Uninitialized;
        self.current.clear();
    }

    fn mark_populated(&mut self, items: Vec<MenuItem>) -> &[MenuItem] {
        self.state = PopulationState::Populated;
        self.current = items;
        &self.current
    }
}

fn fetch(source: &dyn MenuSource) -> Result<Vec<NewMenuItem>, AppResponse> {
    source.fetch_menu().map_err(|e| {
        warn!("Remote menu fetch failed: {e}");
        match e {
            AppResponse::DataUnavailable(msg) => AppResponse::DataUnavailable(msg),
            other => AppResponse::DataUnavailable(other.to_string()),
        }
    })
}
