//! FFI bindings for Calm Mind analytics
//!
//! This module provides C-compatible functions for hosts that embed the
//! analytics core (for example a WebView shell around the dashboard).
//! All functions use C strings (null-terminated) and return allocated memory
//! that must be freed by the caller using `calm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDateTime;

use crate::clock::{Clock, SystemClock};
use crate::config::AnalyticsConfig;
use crate::dates::{parse_calendar_date, parse_local_datetime};
use crate::pipeline::{analytics_report_json, AnalyticsProcessor, DateRange};
use crate::status::{derive_status, display_status};
use crate::store::{FileStore, StoreSnapshot};
use crate::types::{PeriodMode, Task};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Resolve an optional `now` argument; NULL means the host clock
unsafe fn now_arg(now: *const c_char) -> Result<NaiveDateTime, String> {
    match cstr_to_string(now) {
        None => Ok(SystemClock.now()),
        Some(raw) => {
            parse_local_datetime(&raw).ok_or_else(|| format!("Invalid now value: {}", raw))
        }
    }
}

/// Resolve optional range bounds; both NULL means the mode's default range
unsafe fn range_arg(
    start: *const c_char,
    end: *const c_char,
) -> Result<Option<DateRange>, String> {
    match (cstr_to_string(start), cstr_to_string(end)) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse_calendar_date(&start)
                .ok_or_else(|| format!("Invalid start date: {}", start))?;
            let end =
                parse_calendar_date(&end).ok_or_else(|| format!("Invalid end date: {}", end))?;
            DateRange::new(start, end).map(Some).map_err(|e| e.to_string())
        }
        _ => Err("start and end must be given together".to_string()),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build an analytics report from stored task and log JSON.
///
/// `mode` may be NULL (monthly). `start`/`end` may both be NULL for the
/// default range of the mode. `now` may be NULL for the host clock.
///
/// # Safety
/// - Non-NULL arguments must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `calm_free_string`.
/// - Returns NULL on error; call `calm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calm_analytics_report(
    tasks_json: *const c_char,
    logs_json: *const c_char,
    mode: *const c_char,
    start: *const c_char,
    end: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let tasks_str = match cstr_to_string(tasks_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid tasks JSON string pointer");
            return ptr::null_mut();
        }
    };

    let logs_str = match cstr_to_string(logs_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid logs JSON string pointer");
            return ptr::null_mut();
        }
    };

    let mode_str = cstr_to_string(mode).unwrap_or_default();

    let range = match range_arg(start, end) {
        Ok(range) => range,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    let now = match now_arg(now) {
        Ok(now) => now,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match analytics_report_json(&tasks_str, &logs_str, &mode_str, range, now) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Derive a single task's status.
///
/// Returns a JSON object `{"status": ..., "display": ...}`.
///
/// # Safety
/// - `task_json` must be a valid null-terminated C string; `now` may be NULL.
/// - Returns a newly allocated string that must be freed with `calm_free_string`.
/// - Returns NULL on error; call `calm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calm_derive_status(
    task_json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let task_str = match cstr_to_string(task_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid task JSON string pointer");
            return ptr::null_mut();
        }
    };

    let task: Task = match serde_json::from_str(&task_str) {
        Ok(task) => task,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let now = match now_arg(now) {
        Ok(now) => now,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    let result = serde_json::json!({
        "status": derive_status(&task, now),
        "display": display_status(&task, now),
    });
    string_to_cstr(&result.to_string())
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a processor reading from a data directory
pub struct CalmProcessorHandle {
    processor: AnalyticsProcessor<StoreSnapshot<FileStore>>,
}

/// Create a processor over the `<key>.json` files in `data_dir`.
///
/// # Safety
/// - `data_dir` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `calm_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn calm_processor_new(data_dir: *const c_char) -> *mut CalmProcessorHandle {
    clear_last_error();

    let dir = match cstr_to_string(data_dir) {
        Some(s) => s,
        None => {
            set_last_error("Invalid data directory string pointer");
            return ptr::null_mut();
        }
    };

    let config = AnalyticsConfig::default();
    let provider = StoreSnapshot::new(FileStore::new(dir), &config.storage);
    let processor = AnalyticsProcessor::with_parts(provider, SystemClock, config);
    Box::into_raw(Box::new(CalmProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `calm_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn calm_processor_free(processor: *mut CalmProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Report over a fresh snapshot of the processor's data directory.
///
/// `mode` may be NULL for the configured default; the range is the
/// default range of the mode ending today.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `calm_processor_new`.
/// - Returns a newly allocated string that must be freed with `calm_free_string`.
/// - Returns NULL on error; call `calm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calm_processor_report(
    processor: *const CalmProcessorHandle,
    mode: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    let mode = match cstr_to_string(mode) {
        Some(raw) => PeriodMode::parse(&raw),
        None => handle.processor.config().default_mode,
    };

    match handle.processor.report_with_mode(mode, None).to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by Calm Mind functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Calm Mind function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn calm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Calm Mind call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn calm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn calm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
