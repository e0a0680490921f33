//! FFI layer for mobile hosts.
//!
//! This module provides C-compatible functions for apps that fetch the feed
//! themselves and keep the cache in-process. All data crosses the boundary
//! as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `markersync_*` functions are allocated by Rust
//! - Caller must free them with `markersync_string_free`
//! - Store pointers must be freed with `markersync_store_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//! - `{"error": "<message>", "stats": SyncStats}` when a sync cycle fails

use crate::{
    decode_feed_slice, synchronize, AbsentIdPolicy, LocalEntry, LocalStore, MarkerFilter,
    MemoryStore, Reconciler, RemoteEntry, RowId, StoreSnapshot, SyncStats,
};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
    Failed { error: String, stats: SyncStats },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::Err {
        error: message.into(),
    }
    .to_json())
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `markersync_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(cr#"{"error":"string contained null bytes"}"#).into_raw(),
    }
}

/// Borrow a caller-owned byte buffer.
/// Returns None if pointer is null.
unsafe fn from_byte_buffer<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn policy_from_code(code: i32) -> AbsentIdPolicy {
    if code == 1 {
        AbsentIdPolicy::Reject
    } else {
        AbsentIdPolicy::Insert
    }
}

// ============================================================================
// Store Lifecycle
// ============================================================================

/// Create a new, empty marker cache.
///
/// # Safety
/// Caller must free the returned pointer with `markersync_store_free`.
#[no_mangle]
pub extern "C" fn markersync_store_new() -> *mut MemoryStore {
    Box::into_raw(Box::new(MemoryStore::new()))
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn markersync_store_free(store: *mut MemoryStore) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `markersync_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn markersync_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Run one sync cycle over a fetched feed document.
///
/// # Arguments
/// - `feed`, `feed_len`: the feed body as received, byte for byte
/// - `policy`: 0 to insert entries without an id (default), 1 to skip them
///
/// # Returns
/// JSON string: `{"ok": SyncOutcome}` or `{"error": "message", "stats": SyncStats}`.
/// Argument errors carry no `stats`.
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new` or null
/// - `feed` must point to `feed_len` readable bytes, or be null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_store_sync(
    store: *mut MemoryStore,
    feed: *const u8,
    feed_len: usize,
    policy: i32,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return error_json("null store pointer"),
    };

    let feed = match from_byte_buffer(feed, feed_len) {
        Some(bytes) => bytes,
        None => return error_json("null feed pointer"),
    };

    let reconciler = Reconciler::new(policy_from_code(policy));
    match synchronize(store, feed, &reconciler) {
        Ok(outcome) => to_c_string(FfiResult::ok(outcome).to_json()),
        Err(failure) => to_c_string(
            FfiResult::<()>::Failed {
                error: failure.to_string(),
                stats: failure.stats,
            }
            .to_json(),
        ),
    }
}

/// Decode a feed document without touching any store.
///
/// # Returns
/// JSON string: `{"ok": [RemoteEntry, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `feed` must point to `feed_len` readable bytes, or be null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_decode_feed(
    feed: *const u8,
    feed_len: usize,
) -> *mut c_char {
    let feed = match from_byte_buffer(feed, feed_len) {
        Some(bytes) => bytes,
        None => return error_json("null feed pointer"),
    };

    match decode_feed_slice(feed) {
        Ok(entries) => to_c_string(FfiResult::ok(entries).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

/// Compute a reconciliation plan for caller-held data.
///
/// # Arguments
/// - `remote_json`: JSON array of RemoteEntry
/// - `local_json`: JSON array of LocalEntry
/// - `policy`: 0 to insert entries without an id (default), 1 to skip them
///
/// # Returns
/// JSON string: `{"ok": ReconciliationPlan}` or `{"error": "message"}`
///
/// # Safety
/// - `remote_json` and `local_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_reconcile(
    remote_json: *const c_char,
    local_json: *const c_char,
    policy: i32,
) -> *mut c_char {
    let remote_str = match from_c_string(remote_json) {
        Some(s) => s,
        None => return error_json("invalid remote JSON"),
    };

    let local_str = match from_c_string(local_json) {
        Some(s) => s,
        None => return error_json("invalid local JSON"),
    };

    let remote: Vec<RemoteEntry> = match serde_json::from_str(&remote_str) {
        Ok(r) => r,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    let local: Vec<LocalEntry> = match serde_json::from_str(&local_str) {
        Ok(l) => l,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    let plan = Reconciler::new(policy_from_code(policy)).reconcile(remote, &local);
    to_c_string(FfiResult::ok(plan).to_json())
}

// ============================================================================
// Queries
// ============================================================================

/// Get a row by row id.
///
/// # Returns
/// JSON string: `{"ok": LocalEntry}` or `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new` or null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_store_get(
    store: *const MemoryStore,
    row_id: RowId,
) -> *mut c_char {
    let store = match store.as_ref() {
        Some(s) => s,
        None => return error_json("null store pointer"),
    };

    match store.get(row_id) {
        Ok(entry) => to_c_string(FfiResult::ok(entry).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

/// Query rows matching a filter.
///
/// # Arguments
/// - `filter_json`: JSON MarkerFilter, or null for every row
///
/// # Returns
/// JSON string: `{"ok": [LocalEntry, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new` or null
/// - `filter_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_store_query(
    store: *const MemoryStore,
    filter_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_ref() {
        Some(s) => s,
        None => return error_json("null store pointer"),
    };

    let filter: MarkerFilter = match from_c_string(filter_json) {
        None => MarkerFilter::new(),
        Some(s) => match serde_json::from_str(&s) {
            Ok(f) => f,
            Err(e) => return error_json(format!("parse error: {}", e)),
        },
    };

    to_c_string(FfiResult::ok(store.query(&filter)).to_json())
}

// ============================================================================
// Snapshots
// ============================================================================

/// Export store state as a snapshot.
///
/// # Returns
/// JSON string: `{"ok": StoreSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new` or null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_store_export(store: *const MemoryStore) -> *mut c_char {
    let store = match store.as_ref() {
        Some(s) => s,
        None => return error_json("null store pointer"),
    };

    match store.export_state().to_json() {
        Ok(snapshot) => to_c_string(format!(r#"{{"ok":{}}}"#, snapshot)),
        Err(e) => error_json(e.to_string()),
    }
}

/// Import state from a snapshot.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `markersync_store_new` or null
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `markersync_string_free`
#[no_mangle]
pub unsafe extern "C" fn markersync_store_import(
    store: *mut MemoryStore,
    snapshot_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return error_json("null store pointer"),
    };

    let snapshot_str = match from_c_string(snapshot_json) {
        Some(s) => s,
        None => return error_json("invalid snapshot JSON"),
    };

    let snapshot = match StoreSnapshot::from_json(&snapshot_str) {
        Ok(s) => s,
        Err(e) => return error_json(e.to_string()),
    };

    match store.import_state(snapshot) {
        Ok(()) => to_c_string(FfiResult::ok(()).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn markersync_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn markersync_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}
