//! # lexhost
//!
//! Host-side registry for text lexers that live in separately compiled
//! shared libraries, so an editing component can gain language support
//! without being recompiled.
//!
//! The hard part is not lexing, which happens entirely inside each external
//! module, but the lifecycle of native plugin code: probing a library's
//! capability exports through a narrow C-callable contract, turning them into
//! strongly-typed in-process handles, deduplicating repeated load requests,
//! and closing every library exactly once at shutdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lexhost::{load_library, ShutdownGuard, catalogue};
//!
//! // Owned by the host for the life of the process; closes all
//! // libraries when dropped.
//! let _guard = ShutdownGuard::new();
//!
//! // Fire-and-forget: a missing or malformed module contributes
//! // zero lexers instead of failing.
//! load_library("/usr/lib/editor/lexers/libcustom.so");
//!
//! // The editing component looks lexers up by name.
//! if let Some(lexer) = catalogue::global().resolve("custom") {
//!     let engine = lexer.instantiate();
//! }
//! ```
//!
//! Plugin code is trusted by contract: there is no sandboxing, and loading a
//! library runs its initializers. Only load modules the host would be willing
//! to link against.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod catalogue;
pub mod error;
pub mod plugin;

pub use catalogue::Catalogue;
pub use error::LoadError;
pub use plugin::handle::{LexerHandle, LexerOrigin, RawLexer};
pub use plugin::library::LexerLibrary;
pub use plugin::registry::{load_library, LexerRegistry, LoadReport, ShutdownGuard};
