//! Lifecycle of the LMDB environment plus the key-value table.
//!
//! [`AppDbState`] is the single store handle of the application: opened once
//! at startup, shared by the menu store and the profile store, closed at
//! shutdown. Every operation goes through one mutex so the environment is used
//! like a single serialised connection.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{info, warn};

use crate::app_response::AppResponse;
use crate::config::DEFAULT_MAP_SIZE_MB;
use crate::local_db_model::LocalDbModel;

pub(crate) const KV_TABLE: &str = "kv";
pub(crate) const MENU_TABLE: &str = "menu_items";
pub(crate) const MENU_META_TABLE: &str = "menu_meta";
const MAX_DBS: u32 = 8;

pub struct AppDbState {
    env: Mutex<Option<Environment>>,
    name: Mutex<String>,
    map_size: usize,
}

impl AppDbState {
    /// Opens (or creates) the environment directory `<name>.lmdb` with the
    /// default map size.
    pub fn init(name: String) -> Result<Self, AppResponse> {
        Self::init_with_map_size(name, DEFAULT_MAP_SIZE_MB * 1024 * 1024)
    }

    pub fn init_with_map_size(name: String, map_size: usize) -> Result<Self, AppResponse> {
        let env = Self::open_environment(&name, map_size)?;
        Ok(Self {
            env: Mutex::new(Some(env)),
            name: Mutex::new(name),
            map_size,
        })
    }

    fn lmdb_dir(name: &str) -> PathBuf {
        PathBuf::from(format!("{name}.lmdb"))
    }

    fn open_environment(name: &str, map_size: usize) -> Result<Environment, AppResponse> {
        let dir = Self::lmdb_dir(name);
        fs::create_dir_all(&dir)?;
        info!("Opening LMDB environment at {}", dir.display());

        let env = Environment::new()
            .set_max_dbs(MAX_DBS)
            .set_map_size(map_size)
            .open(&dir)?;

        // The kv table is needed before any schema call (startup state derives from it).
        env.create_db(Some(KV_TABLE), DatabaseFlags::empty())?;
        Ok(env)
    }

    fn lock_env(&self) -> Result<MutexGuard<'_, Option<Environment>>, AppResponse> {
        self.env
            .lock()
            .map_err(|_| AppResponse::DatabaseError("Database connection lock poisoned".to_string()))
    }

    /// Runs `f` with exclusive access to the open environment.
    pub(crate) fn with_env<T>(
        &self,
        f: impl FnOnce(&Environment) -> Result<T, AppResponse>,
    ) -> Result<T, AppResponse> {
        let guard = self.lock_env()?;
        match guard.as_ref() {
            Some(env) => f(env),
            None => Err(AppResponse::DatabaseError("Database is closed".to_string())),
        }
    }

    pub(crate) fn open_table(env: &Environment, table: &str) -> Result<Database, AppResponse> {
        env.open_db(Some(table)).map_err(|e| match e {
            lmdb::Error::NotFound => AppResponse::DatabaseError(format!(
                "Table '{table}' does not exist; schema not initialised"
            )),
            other => AppResponse::from(other),
        })
    }

    pub fn name(&self) -> String {
        match self.name.lock() {
            Ok(name) => name.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn path(&self) -> PathBuf {
        Self::lmdb_dir(&self.name())
    }

    pub fn is_open(&self) -> bool {
        self.lock_env().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn put(&self, model: LocalDbModel) -> Result<LocalDbModel, AppResponse> {
        if model.id.is_empty() {
            return Err(AppResponse::ValidationError("Key must not be empty".to_string()));
        }
        let json = serde_json::to_vec(&model)?;
        self.with_env(|env| {
            let db = Self::open_table(env, KV_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            txn.put(db, &model.id, &json, WriteFlags::empty())?;
            txn.commit()?;
            Ok(())
        })?;
        Ok(model)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<LocalDbModel>, AppResponse> {
        self.with_env(|env| {
            let db = Self::open_table(env, KV_TABLE)?;
            let txn = env.begin_ro_txn()?;
            let model = match txn.get(db, &id) {
                Ok(bytes) => Some(serde_json::from_slice(bytes)?),
                Err(lmdb::Error::NotFound) => None,
                Err(e) => return Err(e.into()),
            };
            Ok(model)
        })
    }

    pub fn delete_by_id(&self, id: &str) -> Result<bool, AppResponse> {
        self.with_env(|env| {
            let db = Self::open_table(env, KV_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            match txn.del(db, &id, None) {
                Ok(()) => {
                    txn.commit()?;
                    Ok(true)
                }
                Err(lmdb::Error::NotFound) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Empties the key-value table. The menu tables are left alone.
    pub fn clear_all_records(&self) -> Result<(), AppResponse> {
        self.with_env(|env| {
            let db = Self::open_table(env, KV_TABLE)?;
            let mut txn = env.begin_rw_txn()?;
            txn.clear_db(db)?;
            txn.commit()?;
            Ok(())
        })
    }

    /// Replaces the current environment with a fresh one under `new_name` and
    /// deletes the old directory. Menu schema must be ensured again.
    ///
    /// When `new_name` points elsewhere, the new environment is opened first,
    /// so a failure to open it leaves the current database untouched. When it
    /// is the same name, the old environment is dropped before its files are
    /// removed and is reopened if the removal fails.
    pub fn reset_database(&self, new_name: &str) -> Result<(), AppResponse> {
        if new_name.trim().is_empty() {
            return Err(AppResponse::ValidationError("Database name must not be empty".to_string()));
        }
        let mut guard = self.lock_env()?;
        let old_name = self.name();
        let old_dir = Self::lmdb_dir(&old_name);

        if Self::lmdb_dir(new_name) != old_dir {
            let env = Self::open_environment(new_name, self.map_size)?;
            drop(guard.replace(env));
            self.set_name(new_name);
            info!("Database reset as '{new_name}'");
            return Self::remove_dir(&old_dir);
        }

        // Drop the environment before touching its files.
        guard.take();
        if let Err(e) = Self::remove_dir(&old_dir) {
            *guard = Some(Self::open_environment(&old_name, self.map_size)?);
            return Err(e);
        }
        match Self::open_environment(new_name, self.map_size) {
            Ok(env) => {
                *guard = Some(env);
                info!("Database reset as '{new_name}'");
                Ok(())
            }
            Err(e) => Err(AppResponse::DatabaseError(format!(
                "Database '{new_name}' was removed but could not be reopened, handle is closed: {e}"
            ))),
        }
    }

    fn remove_dir(dir: &Path) -> Result<(), AppResponse> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
            info!("Removed database directory {}", dir.display());
        }
        Ok(())
    }

    fn set_name(&self, new_name: &str) {
        match self.name.lock() {
            Ok(mut name) => *name = new_name.to_string(),
            Err(poisoned) => *poisoned.into_inner() = new_name.to_string(),
        }
    }

    /// Flushes and drops the environment. Later calls fail with
    /// `DatabaseError` instead of touching a closed handle.
    pub fn close_database(&self) -> Result<(), AppResponse> {
        let mut guard = self.lock_env()?;
        match guard.take() {
            Some(env) => {
                if let Err(e) = env.sync(true) {
                    warn!("Failed to sync LMDB environment before close: {e}");
                }
                info!("Database '{}' closed", self.name());
                Ok(())
            }
            None => {
                warn!("close_database called on an already closed handle");
                Ok(())
            }
        }
    }

    pub fn exists(name: &str) -> bool {
        Self::lmdb_dir(name).exists()
    }
}
