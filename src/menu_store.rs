//! The `menu_items` table.
//!
//! Rows are keyed by their id encoded big-endian, so a cursor walk from the
//! start yields storage order (id ascending, which is insertion order).
//! The next id lives in `menu_meta` and only ever grows.

use std::collections::BTreeSet;
use std::sync::Arc;

use lmdb::{Cursor, Database, DatabaseFlags, Environment, RwTransaction, Transaction, WriteFlags};
use log::{debug, info};

use crate::app_response::AppResponse;
use crate::local_db_model::{MenuItem, NewMenuItem};
use crate::local_db_state::{AppDbState, MENU_META_TABLE, MENU_TABLE};
use crate::query::MenuQuery;

const NEXT_ID_KEY: &[u8] = b"next_id";
const FIRST_ID: u64 = 1;

/// Durable, queryable persistence of menu records over a shared store handle.
#[derive(Clone)]
pub struct MenuStore {
    db: Arc<AppDbState>,
}

impl MenuStore {
    pub fn new(db: Arc<AppDbState>) -> Self {
        Self { db }
    }

    pub fn handle(&self) -> &Arc<AppDbState> {
        &self.db
    }

    /// Creates the menu tables when absent. Safe to call on every startup.
    pub fn ensure_schema(&self) -> Result<(), AppResponse> {
        self.db.with_env(|env| {
            env.create_db(Some(MENU_TABLE), DatabaseFlags::empty())?;
            env.create_db(Some(MENU_META_TABLE), DatabaseFlags::empty())?;
            debug!("Menu schema ensured");
            Ok(())
        })
    }

    /// Inserts every record as a new row with a fresh id.
    ///
    /// The batch is written in a single write transaction: if any record fails
    /// validation or the write fails, nothing from the batch becomes visible
    /// and the id counter is left untouched.
    pub fn bulk_insert(&self, items: Vec<NewMenuItem>) -> Result<Vec<MenuItem>, AppResponse> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.db.with_env(|env| {
            let table = AppDbState::open_table(env, MENU_TABLE)?;
            let meta = AppDbState::open_table(env, MENU_META_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            let inserted = insert_rows(&mut txn, table, meta, items)?;
            txn.commit()?;
            info!("Inserted {} menu items", inserted.len());
            Ok(inserted)
        })
    }

    /// Drops every menu row and inserts `items` in the same write transaction.
    ///
    /// Either the store ends up holding exactly the new rows or it keeps the
    /// old ones untouched. The id counter keeps growing.
    pub fn replace_all(&self, items: Vec<NewMenuItem>) -> Result<Vec<MenuItem>, AppResponse> {
        self.db.with_env(|env| {
            let table = AppDbState::open_table(env, MENU_TABLE)?;
            let meta = AppDbState::open_table(env, MENU_META_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            txn.clear_db(table)?;
            let inserted = insert_rows(&mut txn, table, meta, items)?;
            txn.commit()?;
            info!("Replaced menu with {} items", inserted.len());
            Ok(inserted)
        })
    }

    /// Every record in storage order.
    pub fn scan_all(&self) -> Result<Vec<MenuItem>, AppResponse> {
        self.scan_where(|_| true)
    }

    /// Records whose category is in `categories` (all categories when the set
    /// is empty) and whose name contains `text`.
    pub fn scan_filtered(
        &self,
        text: &str,
        categories: &BTreeSet<String>,
    ) -> Result<Vec<MenuItem>, AppResponse> {
        let query = MenuQuery::new(text, categories.iter().cloned());
        query.validate()?;
        self.scan_where(|item| query.matches(item))
    }

    pub fn count(&self) -> Result<usize, AppResponse> {
        self.db.with_env(|env| {
            let table = AppDbState::open_table(env, MENU_TABLE)?;
            let txn = env.begin_ro_txn()?;
            let mut cursor = txn.open_ro_cursor(table)?;
            let count = cursor.iter().count();
            Ok(count)
        })
    }

    pub fn is_empty(&self) -> Result<bool, AppResponse> {
        self.db.with_env(|env| {
            let table = AppDbState::open_table(env, MENU_TABLE)?;
            let txn = env.begin_ro_txn()?;
            let mut cursor = txn.open_ro_cursor(table)?;
            let empty = cursor.iter().next().is_none();
            Ok(empty)
        })
    }

    /// Drops every menu row for a full repopulation. Schema and id counter stay.
    pub fn clear_menu(&self) -> Result<usize, AppResponse> {
        let removed = self.count()?;
        self.db.with_env(|env| {
            let table = AppDbState::open_table(env, MENU_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            txn.clear_db(table)?;
            txn.commit()?;
            Ok(())
        })?;
        info!("Cleared {removed} menu items");
        Ok(removed)
    }

    fn scan_where(&self, keep: impl Fn(&MenuItem) -> bool) -> Result<Vec<MenuItem>, AppResponse> {
        self.db.with_env(|env| read_rows(env, keep))
    }
}

/// Writes `items` under fresh ids and advances the counter. Nothing is
/// committed here; an error leaves the caller's transaction to be dropped.
fn insert_rows(
    txn: &mut RwTransaction<'_>,
    table: Database,
    meta: Database,
    items: Vec<NewMenuItem>,
) -> Result<Vec<MenuItem>, AppResponse> {
    let mut next_id = match txn.get(meta, &NEXT_ID_KEY) {
        Ok(bytes) => decode_id(bytes)?,
        Err(lmdb::Error::NotFound) => FIRST_ID,
        Err(e) => return Err(e.into()),
    };

    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        item.validate()?;
        let record = item.with_id(next_id);
        let value = serde_json::to_vec(&record)?;
        txn.put(table, &next_id.to_be_bytes(), &value, WriteFlags::NO_OVERWRITE)?;
        inserted.push(record);
        next_id += 1;
    }

    txn.put(meta, &NEXT_ID_KEY, &next_id.to_be_bytes(), WriteFlags::empty())?;
    Ok(inserted)
}

fn read_rows(env: &Environment, keep: impl Fn(&MenuItem) -> bool) -> Result<Vec<MenuItem>, AppResponse> {
    let table = AppDbState::open_table(env, MENU_TABLE)?;
    let txn = env.begin_ro_txn()?;
    let mut rows = Vec::new();
    {
        let mut cursor = txn.open_ro_cursor(table)?;
        for (_, value) in cursor.iter() {
            let item: MenuItem = serde_json::from_slice(value)?;
            if keep(&item) {
                rows.push(item);
            }
        }
    }
    Ok(rows)
}

fn decode_id(bytes: &[u8]) -> Result<u64, AppResponse> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| AppResponse::DatabaseError(format!("Corrupted id counter ({} bytes)", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
