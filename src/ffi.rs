//! C ABI for hosts that load this crate as a native plugin.
//!
//! Call order: `phonemizer_initialize` once, optionally `phonemizer_load_tashkeel`,
//! then any number of `phonemizer_phonemize_text` calls. Every buffer returned by
//! `phonemizer_phonemize_text` must be released exactly once with
//! `phonemizer_free_phoneme_ids`. There is no teardown call; state lives until
//! the process exits.
//!
//! No entry point unwinds into the host. Failures are reported through status
//! codes or null results, with details in `phonemizer_last_error`.

#![allow(clippy::missing_safety_doc)]

use log::{error, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::error::{Error, Result};
use crate::frontend::Frontend;
use crate::phoneme_ids::PhonemeId;
use crate::phonemize::Phonemizer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static FRONTEND: OnceLock<Mutex<Frontend>> = OnceLock::new();

/// Buffers handed to the host and not yet released: address -> length.
static LIVE_BUFFERS: Mutex<BTreeMap<usize, usize>> = Mutex::new(BTreeMap::new());

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

#[cfg(feature = "espeak")]
fn default_phonemizer() -> Box<dyn Phonemizer> {
    Box::new(crate::espeak::EspeakPhonemizer::default())
}

#[cfg(not(feature = "espeak"))]
fn default_phonemizer() -> Box<dyn Phonemizer> {
    Box::new(crate::phonemize::CodepointPhonemizer)
}

/// Install the frontend the C entry points use. Must happen before the first C
/// call; afterwards the frontend is fixed and `Err` gives the argument back.
pub fn install_frontend(frontend: Frontend) -> std::result::Result<(), Frontend> {
    FRONTEND
        .set(Mutex::new(frontend))
        .map_err(|rejected| rejected.into_inner().unwrap_or_else(|p| p.into_inner()))
}

fn frontend() -> MutexGuard<'static, Frontend> {
    FRONTEND
        .get_or_init(|| Mutex::new(Frontend::new(default_phonemizer())))
        .lock()
        .unwrap_or_else(|p| p.into_inner())
}

/// Owned phoneme ids on their way to the host.
#[derive(Debug)]
pub struct PhonemeIdBuffer(Box<[PhonemeId]>);

impl From<Vec<PhonemeId>> for PhonemeIdBuffer {
    fn from(ids: Vec<PhonemeId>) -> Self {
        Self(ids.into_boxed_slice())
    }
}

impl PhonemeIdBuffer {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Give up ownership. An empty buffer becomes a null pointer, never a
    /// zero-length allocation.
    fn into_raw(self) -> (*mut PhonemeId, usize) {
        if self.0.is_empty() {
            return (ptr::null_mut(), 0);
        }
        let len = self.0.len();
        (Box::into_raw(self.0) as *mut PhonemeId, len)
    }

    /// Safety: `ptr` and `len` must come from one `into_raw` call, and the pair
    /// must not be used again.
    unsafe fn from_raw(ptr: *mut PhonemeId, len: usize) -> Self {
        Self(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) })
    }
}

fn live_buffers() -> MutexGuard<'static, BTreeMap<usize, usize>> {
    LIVE_BUFFERS.lock().unwrap_or_else(|p| p.into_inner())
}

/// Number of buffers handed out and not yet released.
pub fn outstanding_buffers() -> usize {
    live_buffers().len()
}

unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::InvalidArgument(format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| Error::InvalidArgument(format!("{name} is not valid UTF-8")))
}

fn report(context: &str, err: &Error) {
    warn!("{context}: {err}");
    set_last_error(&err.to_string());
}

/// Initialize the phonemizer with its data directory (may be null or empty for
/// the built-in default).
///
/// Returns 0 on success and -1 on failure. Calling again after a success
/// returns 0 and changes nothing.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn phonemizer_initialize(data_path: *const c_char) -> i32 {
    clear_last_error();
    let result = catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let data_path = if data_path.is_null() {
            ""
        } else {
            unsafe { str_arg(data_path, "data_path") }?
        };
        frontend().initialize(data_path)
    }));

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            error!("phonemizer initialization failed: {err}");
            set_last_error(&err.to_string());
            -1
        }
        Err(_) => {
            error!("panic during phonemizer initialization");
            set_last_error("panic during phonemizer initialization");
            -1
        }
    }
}

/// Load a tashkeel model; Arabic voices are diacritized before phonemization
/// from then on. Returns 0 on success and -1 on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn phonemizer_load_tashkeel(model_path: *const c_char) -> i32 {
    clear_last_error();
    let result = catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let model_path = unsafe { str_arg(model_path, "model_path") }?;
        frontend().load_tashkeel(model_path)
    }));

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            report("loading tashkeel model failed", &err);
            -1
        }
        Err(_) => {
            set_last_error("panic while loading tashkeel model");
            -1
        }
    }
}

/// Phonemize `text` with `voice` and return the phoneme ids.
///
/// On success `*out_ids` owns `*out_count` ids and must be released with
/// `phonemizer_free_phoneme_ids`. When there are no ids, or on any failure,
/// `*out_ids` is null and `*out_count` is 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn phonemizer_phonemize_text(
    text: *const c_char,
    voice: *const c_char,
    out_ids: *mut *mut PhonemeId,
    out_count: *mut i32,
) {
    clear_last_error();
    if out_ids.is_null() || out_count.is_null() {
        set_last_error("out_ids and out_count must not be null");
        return;
    }
    unsafe {
        *out_ids = ptr::null_mut();
        *out_count = 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| -> Result<PhonemeIdBuffer> {
        let text = unsafe { str_arg(text, "text") }?;
        let voice = unsafe { str_arg(voice, "voice") }?;
        let encoded = frontend().phonemize_and_encode(text, voice)?;
        Ok(PhonemeIdBuffer::from(encoded.ids))
    }));

    let buffer = match result {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(err)) => {
            report("phonemization failed", &err);
            return;
        }
        Err(_) => {
            error!("panic during phonemization");
            set_last_error("panic during phonemization");
            return;
        }
    };

    let Ok(count) = i32::try_from(buffer.len()) else {
        set_last_error("too many phoneme ids for out_count");
        return;
    };
    let (ids, len) = buffer.into_raw();
    if !ids.is_null() {
        live_buffers().insert(ids as usize, len);
    }
    unsafe {
        *out_ids = ids;
        *out_count = count;
    }
}

/// Release ids returned by `phonemizer_phonemize_text`. Null is ignored.
///
/// Releasing a pointer twice, or one this library did not return, breaks the
/// contract; such calls are logged and otherwise ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn phonemizer_free_phoneme_ids(ids: *mut PhonemeId) {
    if ids.is_null() {
        return;
    }
    let Some(len) = live_buffers().remove(&(ids as usize)) else {
        error!("ignoring release of unknown or already released buffer {ids:p}");
        return;
    };
    drop(unsafe { PhonemeIdBuffer::from_raw(ids, len) });
}

/// Last error on the calling thread, or null. Valid until the next call into
/// this library on the same thread; must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn phonemizer_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => ptr::null(),
    })
}

/// Static version string; must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn phonemizer_version() -> *const c_char {
    static VERSION_CSTRING: OnceLock<CString> = OnceLock::new();
    VERSION_CSTRING
        .get_or_init(|| CString::new(VERSION).unwrap_or_default())
        .as_ptr()
}
