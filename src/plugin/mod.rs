//! Plugin system for dynamically loaded lexer libraries.
//!
//! A lexer plugin is a shared library (.so on Linux, .dylib on macOS, .dll
//! on Windows) that exports up to three C-callable functions:
//!
//! ```c
//! int  GetLexerCount(void);
//! void GetLexerName(unsigned int index, char *name, int buflength);
//! LexerFactory GetLexerFactory(unsigned int index);
//! ```
//!
//! `GetLexerCount` is the capability gate: a library without it contributes
//! zero lexers, which is not an error. The other two may be individually
//! absent; a lexer then degrades to an empty name or an unbound factory
//! rather than aborting the load. The host never inspects what a factory
//! constructs: engines are opaque pointers handed to the editing component.
//!
//! Plugins written in Rust generate a conforming export surface with
//! [`declare_lexers!`](crate::declare_lexers):
//!
//! ```rust,ignore
//! use std::ffi::c_void;
//!
//! extern "C" fn create_custom() -> *mut c_void {
//!     Box::into_raw(Box::new(CustomLexer::new())).cast()
//! }
//!
//! lexhost::declare_lexers! {
//!     { name: "custom", factory: create_custom },
//! }
//! ```

pub mod abi;
pub mod handle;
pub mod library;
pub mod registry;

pub use handle::{LexerHandle, LexerOrigin, RawLexer};
pub use library::LexerLibrary;
pub use registry::{load_library, LexerRegistry, LoadReport, ShutdownGuard};
