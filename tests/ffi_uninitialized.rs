//! Runs in its own process so no other test can initialize the phonemizer first.

use piper_phonemize_rs::ffi::*;
use std::ffi::{CStr, CString};
use std::ptr;

#[test]
fn calls_before_initialize_return_nothing() {
    let text = CString::new("hello").unwrap();
    let voice = CString::new("en-us").unwrap();
    let mut ids: *mut i64 = ptr::null_mut();
    let mut count = -1;

    unsafe { phonemizer_phonemize_text(text.as_ptr(), voice.as_ptr(), &mut ids, &mut count) };
    assert!(ids.is_null());
    assert_eq!(count, 0);
    let message = unsafe { CStr::from_ptr(phonemizer_last_error()) };
    assert!(message.to_str().unwrap().contains("not initialized"));

    assert_eq!(unsafe { phonemizer_initialize(ptr::null()) }, 0);
    unsafe { phonemizer_phonemize_text(text.as_ptr(), voice.as_ptr(), &mut ids, &mut count) };
    assert!(!ids.is_null());
    assert_eq!(count, 13);
    unsafe { phonemizer_free_phoneme_ids(ids) };
    assert_eq!(outstanding_buffers(), 0);
}
