//! Conformance tests for the export surface `declare_lexers!` generates.

use std::ffi::{c_int, c_void};

extern "C" fn create_alpha() -> *mut c_void {
    0xA as *mut c_void
}

extern "C" fn create_beta() -> *mut c_void {
    0xB as *mut c_void
}

lexhost::declare_lexers! {
    { name: "alpha", factory: create_alpha },
    { name: "a-name-considerably-longer-than-the-buffer-any-host-offers", factory: create_beta },
}

#[test]
fn test_count_matches_declarations() {
    assert_eq!(GetLexerCount(), 2);
}

#[test]
fn test_names_copied_with_truncation() {
    let mut buffer = [0u8; 100];
    unsafe { GetLexerName(0, buffer.as_mut_ptr().cast(), buffer.len() as c_int) };
    assert_eq!(&buffer[..6], b"alpha\0");

    let mut small = [0u8; 8];
    unsafe { GetLexerName(1, small.as_mut_ptr().cast(), small.len() as c_int) };
    assert_eq!(&small, b"a-name-\0");
}

#[test]
fn test_out_of_range_name_is_empty() {
    let mut buffer = [0xffu8; 4];
    unsafe { GetLexerName(9, buffer.as_mut_ptr().cast(), buffer.len() as c_int) };
    assert_eq!(buffer[0], 0);
}

#[test]
fn test_factories_dispatch_by_index() {
    let alpha = GetLexerFactory(0).unwrap();
    let beta = GetLexerFactory(1).unwrap();
    // SAFETY: both factories are the local functions declared above.
    assert_eq!(unsafe { alpha() } as usize, 0xA);
    assert_eq!(unsafe { beta() } as usize, 0xB);
    assert!(GetLexerFactory(2).is_none());
}
