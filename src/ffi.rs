//! C ABI surface
//!
//! Every call returns either a heap-allocated JSON string the caller must
//! free with [`moodwire_free_string`], or null with the failure retrievable
//! through [`moodwire_last_error`]. Engine handles are opaque and freed with
//! [`moodwire_engine_free`].

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::config::EngineConfig;
use crate::engine::{Action, Engine};
use crate::error::EngineError;
use crate::types::RawEvent;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(err: impl std::fmt::Display) {
    let message = CString::new(err.to_string())
        .unwrap_or_else(|_| CString::new("error message contained NUL").unwrap());
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Last error message for this thread, or null. The pointer stays valid
/// until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn moodwire_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Crate version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn moodwire_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, EngineError> {
    if ptr.is_null() {
        return Err(EngineError::ParseError("null pointer".to_string()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| EngineError::EncodingError("input is not valid UTF-8".to_string()))
}

fn actions_to_json(actions: Vec<Action>) -> *mut c_char {
    match serde_json::to_string(&actions) {
        Ok(json) => match CString::new(json) {
            Ok(cstring) => {
                clear_last_error();
                cstring.into_raw()
            }
            Err(err) => {
                set_last_error(err);
                ptr::null_mut()
            }
        },
        Err(err) => {
            set_last_error(err);
            ptr::null_mut()
        }
    }
}

fn engine_call(
    engine: *mut Engine,
    call: impl FnOnce(&mut Engine) -> Result<Vec<Action>, EngineError>,
) -> *mut c_char {
    if engine.is_null() {
        set_last_error("null engine handle");
        return ptr::null_mut();
    }
    let engine = unsafe { &mut *engine };
    match call(engine) {
        Ok(actions) => actions_to_json(actions),
        Err(err) => {
            set_last_error(err);
            ptr::null_mut()
        }
    }
}

/// Create an engine from a JSON configuration. Returns null on invalid
/// configuration.
///
/// # Safety
/// `config_json` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_new(
    config_json: *const c_char,
    now_ms: u64,
) -> *mut Engine {
    let config = if config_json.is_null() {
        Ok(EngineConfig::default())
    } else {
        match read_str(config_json) {
            Ok(json) => EngineConfig::from_json(json),
            Err(err) => Err(err),
        }
    };
    match config.and_then(|c| Engine::new(c, now_ms)) {
        Ok(engine) => {
            clear_last_error();
            Box::into_raw(Box::new(engine))
        }
        Err(err) => {
            set_last_error(err);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `engine` must be a live handle from [`moodwire_engine_new`].
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_start(engine: *mut Engine) -> *mut c_char {
    engine_call(engine, |e| e.start())
}

/// Feed one raw event as JSON (see `RawEvent`). Returns the actions array.
///
/// # Safety
/// `engine` must be a live handle; `event_json` a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_handle_event(
    engine: *mut Engine,
    event_json: *const c_char,
) -> *mut c_char {
    engine_call(engine, |e| {
        let raw: RawEvent = serde_json::from_str(read_str(event_json)?)?;
        e.handle_event(raw.t_ms, &raw.event)
    })
}

/// # Safety
/// `engine` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_tick(engine: *mut Engine, now_ms: u64) -> *mut c_char {
    engine_call(engine, |e| e.tick(now_ms))
}

/// # Safety
/// `engine` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_socket_opened(
    engine: *mut Engine,
    now_ms: u64,
) -> *mut c_char {
    engine_call(engine, |e| e.socket_opened(now_ms))
}

/// # Safety
/// `engine` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_socket_closed(
    engine: *mut Engine,
    now_ms: u64,
) -> *mut c_char {
    engine_call(engine, |e| e.socket_closed(now_ms))
}

/// # Safety
/// `engine` must be a live handle; `frame` a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_socket_message(
    engine: *mut Engine,
    now_ms: u64,
    frame: *const c_char,
) -> *mut c_char {
    engine_call(engine, |e| {
        let frame = read_str(frame)?;
        e.socket_message(now_ms, frame)
    })
}

/// # Safety
/// `engine` must be a live handle; `overlay_id` a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_overlay_clicked(
    engine: *mut Engine,
    overlay_id: *const c_char,
) -> *mut c_char {
    engine_call(engine, |e| {
        let id = read_str(overlay_id)?;
        e.overlay_clicked(id)
    })
}

/// # Safety
/// `engine` must be a live handle; `overlay_id` a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_overlay_dismissed(
    engine: *mut Engine,
    overlay_id: *const c_char,
) -> *mut c_char {
    engine_call(engine, |e| {
        let id = read_str(overlay_id)?;
        e.overlay_dismissed(id)
    })
}

/// # Safety
/// `engine` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_teardown(engine: *mut Engine) -> *mut c_char {
    engine_call(engine, |e| e.teardown())
}

/// # Safety
/// `engine` must be a handle from [`moodwire_engine_new`] or null; the
/// handle is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn moodwire_engine_free(engine: *mut Engine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// # Safety
/// `s` must be a string returned by this library or null; it is invalid
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn moodwire_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
