//! FFI bindings for MediGraph
//!
//! This module provides C-compatible functions for embedding the engine in a
//! UI host. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `medigraph_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::report::ReportEncoder;
use crate::store::MetricStore;
use crate::thresholds::evaluate_named;
use crate::types::{CategoryId, Marker, Readings};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Evaluate one category from a JSON object of readings.
///
/// Returns `"good"`, `"alert"` or `"neutral"`; unknown category ids yield
/// `"neutral"`.
///
/// # Safety
/// - `category_id` and `readings_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `medigraph_free_string`.
/// - Returns NULL on error; call `medigraph_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn medigraph_evaluate(
    category_id: *const c_char,
    readings_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(id) = cstr_to_string(category_id) else {
        set_last_error("Invalid category id pointer");
        return ptr::null_mut();
    };

    let Some(json) = cstr_to_string(readings_json) else {
        set_last_error("Invalid readings JSON pointer");
        return ptr::null_mut();
    };

    match serde_json::from_str::<Readings>(&json) {
        Ok(readings) => string_to_cstr(evaluate_named(&id, &readings).as_str()),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Store API
// ============================================================================

/// Opaque handle to a MetricStore
pub struct MetricStoreHandle {
    store: MetricStore,
    encoder: ReportEncoder,
}

/// Create a store holding the startup panel.
///
/// # Safety
/// - Returns a pointer to a newly allocated store.
/// - Must be freed with `medigraph_store_free`.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_new() -> *mut MetricStoreHandle {
    clear_last_error();

    let handle = Box::new(MetricStoreHandle {
        store: MetricStore::seeded(),
        encoder: ReportEncoder::new(),
    });
    Box::into_raw(handle)
}

/// Create a store from a JSON snapshot.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Must be freed with `medigraph_store_free`.
/// - Returns NULL on error; call `medigraph_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_from_json(json: *const c_char) -> *mut MetricStoreHandle {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match MetricStore::from_json(&json_str) {
        Ok(store) => Box::into_raw(Box::new(MetricStoreHandle {
            store,
            encoder: ReportEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer returned by `medigraph_store_new` or
///   `medigraph_store_from_json`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_free(store: *mut MetricStoreHandle) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Write a reading from form text and return the category's new status.
///
/// Unparseable input is stored as 0.
///
/// # Safety
/// - `store` must be a valid pointer returned by `medigraph_store_new`.
/// - `category_id`, `marker` and `value` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `medigraph_free_string`.
/// - Returns NULL on error; call `medigraph_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_set_reading(
    store: *mut MetricStoreHandle,
    category_id: *const c_char,
    marker: *const c_char,
    value: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }

    let handle = &mut *store;

    let (Some(id), Some(marker), Some(value)) = (
        cstr_to_string(category_id),
        cstr_to_string(marker),
        cstr_to_string(value),
    ) else {
        set_last_error("Invalid string pointer");
        return ptr::null_mut();
    };

    let result = id
        .parse::<CategoryId>()
        .and_then(|id| Ok((id, marker.parse::<Marker>()?)))
        .and_then(|(id, marker)| handle.store.set_reading_input(id, marker, &value));

    match result {
        Ok(status) => string_to_cstr(status.as_str()),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Set the chronological age; returns the stored (clamped) age, or -1 on a
/// null store.
///
/// # Safety
/// - `store` must be a valid pointer returned by `medigraph_store_new`.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_set_age(store: *mut MetricStoreHandle, age: i64) -> i64 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }

    let handle = &mut *store;
    handle.store.set_age(age) as i64
}

/// Current metabolic age, or -1 on a null store.
///
/// # Safety
/// - `store` must be a valid pointer returned by `medigraph_store_new`.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_metabolic_age(store: *const MetricStoreHandle) -> f64 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1.0;
    }

    (*store).store.metabolic_age()
}

/// Encode the store as a JSON report.
///
/// # Safety
/// - `store` must be a valid pointer returned by `medigraph_store_new`.
/// - Returns a newly allocated string that must be freed with `medigraph_free_string`.
/// - Returns NULL on error; call `medigraph_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn medigraph_store_report(store: *const MetricStoreHandle) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }

    let handle = &*store;
    match handle.encoder.encode_to_json(&handle.store) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Free a string returned by MediGraph.
///
/// # Safety
/// - `s` must be a pointer returned by a MediGraph function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn medigraph_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Last error message on this thread, or NULL.
///
/// # Safety
/// - The returned pointer is valid until the next MediGraph call on this thread.
/// - Do not free the returned pointer.
#[no_mangle]
pub unsafe extern "C" fn medigraph_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}
