//! The C-compatible capability contract between the host and lexer libraries.
//!
//! These types define the minimal ABI surface a pluggable library must
//! export to be recognized. The design prioritizes safety and simplicity:
//! three flat functions, no structs crossing the boundary, names copied
//! through a caller-supplied bounded buffer.

use std::ffi::{c_char, c_int, c_uint, c_void};

/// Symbol name of the mandatory "how many lexers" export.
///
/// A library without this export contributes zero lexers; that is not an
/// error.
pub const LEXER_COUNT_SYMBOL: &[u8] = b"GetLexerCount\0";

/// Symbol name of the "name at index" export.
pub const LEXER_NAME_SYMBOL: &[u8] = b"GetLexerName\0";

/// Symbol name of the "factory at index" export.
pub const LEXER_FACTORY_SYMBOL: &[u8] = b"GetLexerFactory\0";

/// Size of the buffer the host hands to [`GetLexerNameFn`], terminator
/// included. Longer names are truncated, never rejected.
pub const LEXER_NAME_LEN: usize = 100;

/// Constructs one lexing engine instance.
///
/// The returned pointer is opaque to the host: it is handed to the editing
/// component that knows the engine's interface, and may be null if the
/// plugin failed to construct the engine.
///
/// # Safety
///
/// The pointer is only meaningful while the exporting library stays mapped.
pub type LexerFactoryFn = unsafe extern "C" fn() -> *mut c_void;

/// `GetLexerCount`: number of lexers this library provides.
///
/// # Safety
///
/// Must be resolved from a library that exports it with this signature.
pub type GetLexerCountFn = unsafe extern "C" fn() -> c_int;

/// `GetLexerName`: writes a NUL-terminated, possibly truncated name for
/// `index` into the caller's buffer of `buffer_len` bytes.
///
/// # Safety
///
/// The buffer must be writable for `buffer_len` bytes.
pub type GetLexerNameFn = unsafe extern "C" fn(c_uint, *mut c_char, c_int);

/// `GetLexerFactory`: returns the factory for `index`, or null.
///
/// # Safety
///
/// Must be resolved from a library that exports it with this signature.
pub type GetLexerFactoryFn = unsafe extern "C" fn(c_uint) -> Option<LexerFactoryFn>;

/// Copies `name` into `buffer`, truncating to `buffer_len - 1` bytes and
/// always NUL-terminating. A null or zero-length buffer is left untouched.
///
/// This is the conforming implementation of the [`GetLexerNameFn`] contract;
/// [`declare_lexers!`](crate::declare_lexers) expands to it, and mock
/// libraries in tests reuse it.
///
/// # Safety
///
/// `buffer` must either be null or writable for `buffer_len` bytes.
pub unsafe fn copy_name_truncated(name: &str, buffer: *mut c_char, buffer_len: c_int) {
    if buffer.is_null() || buffer_len <= 0 {
        return;
    }
    let bytes = name.as_bytes();
    let len = bytes.len().min(buffer_len as usize - 1);
    // SAFETY: caller guarantees `buffer` is writable for `buffer_len` bytes,
    // and `len + 1 <= buffer_len`.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, len);
        *buffer.add(len) = 0;
    }
}

/// Generates the three capability exports for a lexer plugin written in Rust.
///
/// Expands to `GetLexerCount`, `GetLexerName`, and `GetLexerFactory` backed
/// by a static table, so a `cdylib` crate using this macro is loadable by the
/// host registry. Invoke it once per plugin crate, at the crate root.
///
/// # Example
///
/// ```rust,ignore
/// use std::ffi::c_void;
///
/// extern "C" fn create_custom() -> *mut c_void {
///     Box::into_raw(Box::new(CustomLexer::new())).cast()
/// }
///
/// lexhost::declare_lexers! {
///     { name: "custom", factory: create_custom },
/// }
/// ```
#[macro_export]
macro_rules! declare_lexers {
    ( $( { name: $name:literal, factory: $factory:expr } ),+ $(,)? ) => {
        #[doc(hidden)]
        pub static __LEXHOST_LEXER_NAMES: &[&str] = &[$($name),+];

        #[doc(hidden)]
        pub static __LEXHOST_LEXER_FACTORIES: &[$crate::plugin::abi::LexerFactoryFn] =
            &[$($factory),+];

        /// Number of lexers this library provides.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn GetLexerCount() -> ::std::ffi::c_int {
            __LEXHOST_LEXER_NAMES.len() as ::std::ffi::c_int
        }

        /// Writes the NUL-terminated, possibly truncated name for `index`.
        ///
        /// # Safety
        ///
        /// `buffer` must either be null or writable for `buffer_len` bytes.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn GetLexerName(
            index: ::std::ffi::c_uint,
            buffer: *mut ::std::ffi::c_char,
            buffer_len: ::std::ffi::c_int,
        ) {
            let name = __LEXHOST_LEXER_NAMES
                .get(index as usize)
                .copied()
                .unwrap_or("");
            // SAFETY: forwarding the caller's contract.
            unsafe { $crate::plugin::abi::copy_name_truncated(name, buffer, buffer_len) }
        }

        /// Returns the factory for `index`, or null past the end.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn GetLexerFactory(
            index: ::std::ffi::c_uint,
        ) -> Option<$crate::plugin::abi::LexerFactoryFn> {
            __LEXHOST_LEXER_FACTORIES.get(index as usize).copied()
        }
    };
}
