//! # Little Lemon Core
//!
//! Local storage core of the Little Lemon restaurant app, designed for FFI
//! integration with a mobile host. Built on LMDB.
//!
//! ## Features
//!
//! - **Menu cache**: the remote menu is fetched once, persisted, and served
//!   from the local store on every later start
//! - **Search**: case-insensitive name search combined with an inclusive
//!   multi-category filter, resolved straight from the store
//! - **Request sequencing**: debounced search input and stale-result discard
//!   via [`browse::MenuBrowser`]
//! - **Profile storage**: merge-style updates of the signed-in user
//! - **Safe error handling**: every failure comes back as an [`AppResponse`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use little_lemon_core::{create_menu_cache, populate_menu, search_menu, free_response};
//! use std::ffi::CString;
//!
//! let config = CString::new(r#"{"db_name":"little_lemon"}"#).unwrap();
//! let handle = create_menu_cache(config.as_ptr());
//!
//! let payload = CString::new(r#"{"menu":[{"name":"Greek Salad","price":12.99,"description":"","image":"greekSalad.jpg","category":"starters"}]}"#).unwrap();
//! free_response(populate_menu(handle, payload.as_ptr()));
//!
//! let request = CString::new(r#"{"query":"salad","categories":["starters"]}"#).unwrap();
//! let result = search_menu(handle, request.as_ptr());
//! free_response(result);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_menu_cache`] / [`close_menu_cache`] / [`free_menu_cache`] - handle lifecycle
//! - [`ensure_menu_schema`] - create the menu tables if absent
//! - [`menu_needs_population`] - whether the remote menu must be fetched
//! - [`populate_menu`] / [`populate_menu_with_fetch`] / [`refresh_menu`] - load the remote payload into the store
//! - [`get_all_menu_items`] / [`search_menu`] - read the cached menu
//! - [`onboard_user`] / [`get_user`] / [`update_user`] / [`update_user_image`] / [`sign_out`] - profile
//! - [`get_app_state`] - current application state snapshot
//! - [`free_response`] - release a string returned by any of the above

pub mod app_response;
pub mod app_state;
pub mod browse;
pub mod config;
pub mod local_db_model;
pub mod local_db_state;
pub mod menu_cache;
pub mod menu_source;
pub mod menu_store;
pub mod profile;
pub mod query;
pub mod text;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use serde::Serialize;

pub use crate::app_response::AppResponse;
use crate::app_state::{AppState, AppStatePatch, AppStateSnapshot, AppStateStore};
use crate::browse::MenuBrowser;
use crate::config::CacheConfig;
use crate::local_db_model::{MenuItem, NewMenuItem};
use crate::local_db_state::AppDbState;
use crate::menu_cache::{MenuCache, PopulationState};
use crate::menu_source::{JsonMenuSource, MenuSource};
use crate::menu_store::MenuStore;
use crate::profile::{ProfileStore, UserProfile, UserProfilePatch};
use crate::query::{MenuQuery, SearchRequest};

/// Everything the host needs, opened once at startup and closed at shutdown.
pub struct MenuCacheHandle {
    config: CacheConfig,
    db: Arc<AppDbState>,
    cache: Mutex<MenuCache>,
    profiles: ProfileStore,
    app_state: Mutex<AppStateStore>,
}

impl MenuCacheHandle {
    pub fn open(config: CacheConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        let db = Arc::new(AppDbState::init_with_map_size(
            config.db_name.clone(),
            config.map_size_bytes(),
        )?);
        let profiles = ProfileStore::new(Arc::clone(&db));
        let app_state = AppStateStore::load(&profiles)?;
        let cache = MenuCache::new(MenuStore::new(Arc::clone(&db)));
        info!("Menu cache handle opened for '{}'", config.db_name);
        Ok(Self {
            config,
            db,
            cache: Mutex::new(cache),
            profiles,
            app_state: Mutex::new(app_state),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, MenuCache>, AppResponse> {
        self.cache
            .lock()
            .map_err(|_| AppResponse::DatabaseError("Menu cache lock poisoned".to_string()))
    }

    fn lock_app_state(&self) -> Result<MutexGuard<'_, AppStateStore>, AppResponse> {
        self.app_state
            .lock()
            .map_err(|_| AppResponse::DatabaseError("App state lock poisoned".to_string()))
    }

    pub fn ensure_schema(&self) -> Result<(), AppResponse> {
        self.lock_cache()?.store().ensure_schema()
    }

    pub fn population_state(&self) -> Result<PopulationState, AppResponse> {
        Ok(self.lock_cache()?.state())
    }

    pub fn populate(&self, source: &dyn MenuSource) -> Result<Vec<MenuItem>, AppResponse> {
        Ok(self.lock_cache()?.populate(source)?.to_vec())
    }

    pub fn refresh(&self, source: &dyn MenuSource) -> Result<Vec<MenuItem>, AppResponse> {
        Ok(self.lock_cache()?.refresh(source)?.to_vec())
    }

    pub fn all_items(&self) -> Result<Vec<MenuItem>, AppResponse> {
        self.lock_cache()?.store().scan_all()
    }

    pub fn search(&self, query: &MenuQuery) -> Result<Vec<MenuItem>, AppResponse> {
        let cache = self.lock_cache()?;
        crate::query::resolve(cache.store(), query)
    }

    /// A browser pre-configured with this handle's categories and debounce.
    pub fn browser(&self) -> MenuBrowser {
        MenuBrowser::new(self.config.categories.clone(), self.config.search_debounce())
    }

    pub fn json_source(&self, payload: impl Into<String>) -> JsonMenuSource {
        JsonMenuSource::from_json(payload).with_image_url_template(self.config.image_url_template.clone())
    }

    pub fn onboard(&self, profile: UserProfile) -> Result<AppStateSnapshot, AppResponse> {
        self.profiles.onboard(&profile)?;
        let mut app_state = self.lock_app_state()?;
        app_state.replace(AppState {
            is_onboarding_completed: true,
            user: Some(profile),
        });
        Ok(app_state.snapshot())
    }

    pub fn update_user(&self, patch: UserProfilePatch) -> Result<UserProfile, AppResponse> {
        let profile = self.profiles.update_user(&patch)?;
        self.lock_app_state()?.merge(AppStatePatch {
            user: Some(patch),
            ..AppStatePatch::default()
        });
        Ok(profile)
    }

    pub fn update_image(&self, uri: &str) -> Result<UserProfile, AppResponse> {
        let profile = self.profiles.update_image(uri)?;
        self.lock_app_state()?.merge(AppStatePatch {
            user: Some(UserProfilePatch {
                image: Some(uri.to_string()),
                ..UserProfilePatch::default()
            }),
            ..AppStatePatch::default()
        });
        Ok(profile)
    }

    pub fn sign_out(&self) -> Result<AppStateSnapshot, AppResponse> {
        self.profiles.sign_out()?;
        let mut app_state = self.lock_app_state()?;
        app_state.replace(AppState::default());
        Ok(app_state.snapshot())
    }

    pub fn app_state(&self) -> Result<AppStateSnapshot, AppResponse> {
        Ok(self.lock_app_state()?.snapshot())
    }

    /// Whether the next [`populate`](Self::populate) would consult the remote
    /// source: false once the cache is populated or the store holds rows.
    pub fn needs_population(&self) -> Result<bool, AppResponse> {
        let cache = self.lock_cache()?;
        if cache.state() == PopulationState::Populated && self.db.is_open() {
            return Ok(false);
        }
        cache.store().ensure_schema()?;
        cache.store().is_empty()
    }

    pub fn close(&self) -> Result<(), AppResponse> {
        self.lock_cache()?.invalidate();
        self.db.close_database()
    }
}

/// Opens a menu cache handle from a JSON [`CacheConfig`].
///
/// The LMDB environment is created as `<db_name>.lmdb` if it does not exist
/// yet, and the startup [`AppState`] is derived from the stored profile.
///
/// # Parameters
///
/// * `config_json` - Null-terminated C string with the [`CacheConfig`] JSON.
///   Missing fields take their defaults.
///
/// # Returns
///
/// Returns a pointer to the [`MenuCacheHandle`] on success, or a null pointer
/// on failure. The handle must be released with [`free_menu_cache`].
///
/// # Safety
///
/// `config_json` must be null or point to a valid NUL-terminated string.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use little_lemon_core::{create_menu_cache, free_menu_cache};
///
/// let config = CString::new(r#"{"db_name":"little_lemon","map_size_mb":32}"#).unwrap();
/// let handle = create_menu_cache(config.as_ptr());
/// if !handle.is_null() {
///     free_menu_cache(handle);
/// }
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - The config pointer is null
/// - The config string contains invalid UTF-8
/// - The JSON is malformed or fails validation
/// - The database cannot be opened
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_menu_cache(config_json: *const c_char) -> *mut MenuCacheHandle {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_menu_cache");
        return std::ptr::null_mut();
    }

    let config_str = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    let config = match CacheConfig::from_json(config_str) {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejected menu cache config: {e}");
            return std::ptr::null_mut();
        }
    };

    match MenuCacheHandle::open(config) {
        Ok(handle) => Box::into_raw(Box::new(handle)),
        Err(e) => {
            warn!("Failed to open menu cache: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Creates the menu tables if they do not exist yet.
///
/// Safe to call on every startup; existing rows are left alone.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` on success, `DatabaseError` when the database is closed or the tables
/// cannot be created. The returned string must be freed with [`free_response`].
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn ensure_menu_schema(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "ensure_menu_schema") {
        Ok(h) => h,
        Err(err) => return err,
    };
    match handle.ensure_schema() {
        Ok(()) => response_to_c_string(&AppResponse::success("Menu schema ready")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Tells the host whether the remote menu has to be fetched.
///
/// Hosts that run the network call themselves check this before fetching, so
/// the remote source is only hit while the local store is empty.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok("true")` when the store is empty, `Ok("false")` when it already holds
/// the menu, or `DatabaseError`. Ensures the schema as a side effect.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use little_lemon_core::{create_menu_cache, menu_needs_population, free_response};
///
/// let config = CString::new(r#"{"db_name":"little_lemon"}"#).unwrap();
/// let handle = create_menu_cache(config.as_ptr());
/// let answer = menu_needs_population(handle);
/// // {"Ok":"true"} on a first launch: fetch, then call populate_menu.
/// free_response(answer);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn menu_needs_population(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "menu_needs_population") {
        Ok(h) => h,
        Err(err) => return err,
    };
    json_response(handle.needs_population())
}

/// Runs the population policy with a remote payload the host already holds.
///
/// Existing rows win over the payload, which is then never parsed. Hosts
/// should ask [`menu_needs_population`] before fetching, or hand the fetch
/// over with [`populate_menu_with_fetch`].
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `payload_json` - Null-terminated remote payload
///
/// # Returns
///
/// `Ok` with the JSON array of current menu items, `DataUnavailable` when the
/// store was empty and the payload is unusable, or `DatabaseError`.
///
/// # Safety
///
/// Both pointers must be null or valid; the payload must be valid UTF-8.
///
/// # JSON Format
///
/// ```json
/// {
///   "menu": [
///     {"name": "Greek Salad", "price": 12.99, "description": "...",
///      "image": "greekSalad.jpg", "category": "starters"}
///   ]
/// }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn populate_menu(handle: *mut MenuCacheHandle, payload_json: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "populate_menu") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let payload = match c_ptr_to_string(payload_json, "payload") {
        Ok(p) => p,
        Err(err) => return err,
    };
    let source = handle.json_source(payload);
    json_response(handle.populate(&source))
}

/// Host-side fetch of the remote menu.
///
/// Receives the `context` pointer passed to [`populate_menu_with_fetch`] and
/// returns the NUL-terminated `{"menu":[...]}` payload, or null when the fetch
/// failed. The string stays owned by the host and must remain valid until
/// [`populate_menu_with_fetch`] returns.
pub type MenuFetchCallback = extern "C" fn(context: *mut c_void) -> *const c_char;

struct HostFetchSource {
    fetch: MenuFetchCallback,
    context: *mut c_void,
    image_url_template: String,
}

impl MenuSource for HostFetchSource {
    fn fetch_menu(&self) -> Result<Vec<NewMenuItem>, AppResponse> {
        let payload = (self.fetch)(self.context);
        if payload.is_null() {
            return Err(AppResponse::DataUnavailable("Host fetch returned no payload".to_string()));
        }
        let text = unsafe { CStr::from_ptr(payload) }
            .to_str()
            .map_err(|e| AppResponse::DataUnavailable(format!("Host payload is not valid UTF-8: {e}")))?
            .to_string();
        JsonMenuSource::from_json(text)
            .with_image_url_template(self.image_url_template.clone())
            .fetch_menu()
    }
}

/// Runs the population policy, calling `fetch` only if the store is empty.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `fetch` - Host callback performing the network request
/// * `context` - Opaque pointer handed back to `fetch` unchanged
///
/// # Returns
///
/// Same as [`populate_menu`]. A null `fetch` is a `BadRequest`; a null
/// payload from `fetch` is `DataUnavailable`.
///
/// # Safety
///
/// `fetch` is invoked synchronously on the calling thread at most once.
/// `context` is never dereferenced by the library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn populate_menu_with_fetch(
    handle: *mut MenuCacheHandle,
    fetch: Option<MenuFetchCallback>,
    context: *mut c_void,
) -> *const c_char {
    let handle = match handle_ref(handle, "populate_menu_with_fetch") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let fetch = match fetch {
        Some(f) => f,
        None => {
            let error = AppResponse::BadRequest("Null fetch callback passed to populate_menu_with_fetch".to_string());
            return response_to_c_string(&error);
        }
    };
    let source = HostFetchSource {
        fetch,
        context,
        image_url_template: handle.config().image_url_template.clone(),
    };
    json_response(handle.populate(&source))
}

/// Replaces the stored menu with the given payload.
///
/// The payload is parsed and validated before anything is written, and the
/// old rows are swapped for the new ones in one transaction.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `payload_json` - Null-terminated remote payload, same format as [`populate_menu`]
///
/// # Returns
///
/// `Ok` with the JSON array of the new menu items. On any error the previous
/// rows are still in place.
///
/// # Safety
///
/// Both pointers must be null or valid; the payload must be valid UTF-8.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn refresh_menu(handle: *mut MenuCacheHandle, payload_json: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "refresh_menu") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let payload = match c_ptr_to_string(payload_json, "payload") {
        Ok(p) => p,
        Err(err) => return err,
    };
    let source = handle.json_source(payload);
    json_response(handle.refresh(&source))
}

/// Returns every cached menu item in storage order.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` with a JSON array of menu items (empty when nothing is cached), or
/// `DatabaseError` when the schema is missing or the database is closed.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all_menu_items(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "get_all_menu_items") {
        Ok(h) => h,
        Err(err) => return err,
    };
    json_response(handle.all_items())
}

/// Resolves a search request against the store.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `request_json` - Null-terminated search request
///
/// # Returns
///
/// `Ok` with the matching menu items in storage order. A request that does not
/// parse, or names a blank category, is a `QueryError`.
///
/// # Safety
///
/// Both pointers must be null or valid; the request must be valid UTF-8.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use little_lemon_core::{create_menu_cache, search_menu, free_response};
///
/// let config = CString::new(r#"{"db_name":"little_lemon"}"#).unwrap();
/// let handle = create_menu_cache(config.as_ptr());
/// let request = CString::new(r#"{"query":"salad","categories":["mains"]}"#).unwrap();
/// free_response(search_menu(handle, request.as_ptr()));
/// ```
///
/// # JSON Format
///
/// `{"query": "text", "categories": ["starters", "mains"]}`. Both fields are
/// optional; empty `categories` means every category.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_menu(handle: *mut MenuCacheHandle, request_json: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "search_menu") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let request_str = match c_ptr_to_string(request_json, "request") {
        Ok(r) => r,
        Err(err) => return err,
    };
    let request: SearchRequest = match serde_json::from_str(&request_str) {
        Ok(r) => r,
        Err(e) => {
            let error = AppResponse::QueryError(format!("Invalid search request: {e}"));
            return response_to_c_string(&error);
        }
    };
    json_response(handle.search(&request.into()))
}

/// Stores the signed-in user and marks onboarding as completed.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `profile_json` - Null-terminated camelCase [`UserProfile`] JSON
///
/// # Returns
///
/// `Ok` with the new app state snapshot `{revision, state}`, or
/// `SerializationError` when the profile does not parse.
///
/// # Safety
///
/// Both pointers must be null or valid; the profile must be valid UTF-8.
///
/// # JSON Format
///
/// ```json
/// {"firstName": "Tilly", "lastName": "Doe", "email": "tilly@example.com"}
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn onboard_user(handle: *mut MenuCacheHandle, profile_json: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "onboard_user") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let profile: UserProfile = match parse_json(profile_json, "profile") {
        Ok(p) => p,
        Err(err) => return err,
    };
    json_response(handle.onboard(profile))
}

/// Returns the stored profile.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` with the profile JSON, or `NotFound` when nobody is signed in.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_user(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "get_user") {
        Ok(h) => h,
        Err(err) => return err,
    };
    match handle.profiles().get_user() {
        Ok(Some(user)) => json_response(Ok(user)),
        Ok(None) => response_to_c_string(&AppResponse::NotFound("No user stored".to_string())),
        Err(e) => response_to_c_string(&e),
    }
}

/// Merges a partial profile into the stored user.
///
/// Fields absent from the patch keep their stored values.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `patch_json` - Null-terminated camelCase [`UserProfilePatch`] JSON
///
/// # Returns
///
/// `Ok` with the merged profile, or `SerializationError` when the patch does
/// not parse.
///
/// # Safety
///
/// Both pointers must be null or valid; the patch must be valid UTF-8.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_user(handle: *mut MenuCacheHandle, patch_json: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "update_user") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let patch: UserProfilePatch = match parse_json(patch_json, "patch") {
        Ok(p) => p,
        Err(err) => return err,
    };
    json_response(handle.update_user(patch))
}

/// Sets the avatar URI of the stored user. An empty string removes it.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
/// * `uri` - Null-terminated image URI
///
/// # Returns
///
/// `Ok` with the updated profile.
///
/// # Safety
///
/// Both pointers must be null or valid; the URI must be valid UTF-8.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_user_image(handle: *mut MenuCacheHandle, uri: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "update_user_image") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let uri = match c_ptr_to_string(uri, "uri") {
        Ok(u) => u,
        Err(err) => return err,
    };
    json_response(handle.update_image(&uri))
}

/// Forgets the stored user and resets the app state.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` with the reset app state snapshot. Signing out twice is not an error.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sign_out(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "sign_out") {
        Ok(h) => h,
        Err(err) => return err,
    };
    json_response(handle.sign_out())
}

/// Returns the current app state snapshot.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` with `{"revision": n, "state": {"isOnboardingCompleted": .., "user": ..}}`.
/// The revision grows with every accepted change.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_app_state(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "get_app_state") {
        Ok(h) => h,
        Err(err) => return err,
    };
    json_response(handle.app_state())
}

/// Closes the underlying database.
///
/// The handle stays allocated; every later menu or profile call on it reports
/// a `DatabaseError`. Closing twice is harmless.
///
/// # Parameters
///
/// * `handle` - Pointer returned by [`create_menu_cache`]
///
/// # Returns
///
/// `Ok` once the environment is flushed and dropped.
///
/// # Safety
///
/// `handle` must be null or a live pointer from [`create_menu_cache`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_menu_cache(handle: *mut MenuCacheHandle) -> *const c_char {
    let handle = match handle_ref(handle, "close_menu_cache") {
        Ok(h) => h,
        Err(err) => return err,
    };
    match handle.close() {
        Ok(()) => response_to_c_string(&AppResponse::success("Database connection closed successfully")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Releases a handle returned by [`create_menu_cache`].
///
/// # Safety
///
/// `handle` must be null or a pointer from [`create_menu_cache`] that has not
/// been freed yet. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_menu_cache(handle: *mut MenuCacheHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// Releases a response string returned by any function of this library.
///
/// # Safety
///
/// `response` must be null or a string returned by this library that has not
/// been freed yet. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(response: *const c_char) {
    if response.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(response as *mut c_char) });
}

fn handle_ref<'a>(handle: *mut MenuCacheHandle, caller: &str) -> Result<&'a MenuCacheHandle, *const c_char> {
    match unsafe { handle.as_ref() } {
        Some(h) => Ok(h),
        None => {
            let error = AppResponse::BadRequest(format!("Null handle pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(ptr: *const c_char, field_name: &str) -> Result<T, *const c_char> {
    let text = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&text).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid {field_name} JSON: {e}"));
        response_to_c_string(&error)
    })
}

/// Wraps a successful value as `Ok(<json>)`, or passes the error through.
fn json_response<T: Serialize>(result: Result<T, AppResponse>) -> *const c_char {
    match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => {
                let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
                response_to_c_string(&error)
            }
        },
        Err(e) => response_to_c_string(&e),
    }
}

/// Serialises `response` to JSON and hands ownership of the C string to the
/// caller, who releases it with [`free_response`]. Null if serialisation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust `String`, turning null pointers and
/// invalid UTF-8 into a ready-made `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
