//! Counts heap allocations made on the test thread to check that releasing every
//! returned buffer exactly once leaves nothing behind.

use piper_phonemize_rs::ffi::*;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::CString;
use std::ptr;

struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn adjust(delta: isize) {
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            adjust(1);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        adjust(-1);
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: Counting = Counting;

fn live() -> isize {
    LIVE.with(Cell::get)
}

fn phonemize_and_free(text: &CString, voice: &CString) {
    let mut ids: *mut i64 = ptr::null_mut();
    let mut count = 0;
    unsafe {
        phonemizer_phonemize_text(text.as_ptr(), voice.as_ptr(), &mut ids, &mut count);
        assert!(!ids.is_null());
        phonemizer_free_phoneme_ids(ids);
    }
}

#[test]
fn release_once_leaves_no_allocation_behind() {
    let text = CString::new("The quick brown fox. Jumps over the lazy dog!").unwrap();
    let voice = CString::new("en-us").unwrap();
    assert_eq!(unsafe { phonemizer_initialize(ptr::null()) }, 0);

    // first call sets up lazily created state
    phonemize_and_free(&text, &voice);

    let before = live();
    for _ in 0..100 {
        phonemize_and_free(&text, &voice);
    }
    assert_eq!(live(), before);
    assert_eq!(outstanding_buffers(), 0);

    unsafe { phonemizer_free_phoneme_ids(ptr::null_mut()) };
    assert_eq!(live(), before);
}
