//! Strongly-typed handles for lexers exposed by loaded libraries.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::plugin::abi::{GetLexerFactoryFn, LexerFactoryFn};

/// How a lexer came to be known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LexerOrigin {
    /// Supplied by a separately compiled shared library.
    External,
}

/// A freshly constructed lexing engine, opaque to this crate.
///
/// The pointer is handed to the editing component that knows the engine's
/// interface; ownership of the engine lies with that consumer, never with
/// the registry. It is only meaningful while the library that produced it
/// stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLexer(NonNull<c_void>);

impl RawLexer {
    /// The raw engine pointer.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Factory resolved from the owning library, together with the index it was
/// resolved for.
#[derive(Clone, Copy)]
struct Binding {
    factory: LexerFactoryFn,
    index: u32,
}

/// One lexer exposed by one loaded library.
///
/// The name and origin are fixed at construction. The factory arrives later,
/// once the owning [`LexerLibrary`](crate::LexerLibrary) has resolved it,
/// and can be attached at most once. An unbound handle is still a valid
/// catalogue entry; it just cannot produce engines.
pub struct LexerHandle {
    name: String,
    origin: LexerOrigin,
    binding: OnceLock<Binding>,
}

impl LexerHandle {
    /// Creates an unbound handle.
    pub fn new(origin: LexerOrigin, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin,
            binding: OnceLock::new(),
        }
    }

    /// The name the library reported for this lexer. May be empty if the
    /// library degraded during enumeration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where this lexer came from.
    pub fn origin(&self) -> LexerOrigin {
        self.origin
    }

    /// Whether a factory has been attached.
    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The index this lexer occupies within its owning library, once bound.
    pub fn index(&self) -> Option<u32> {
        self.binding.get().map(|binding| binding.index)
    }

    /// Resolves and attaches the factory for `index` by invoking the owning
    /// library's resolver. Returns whether the handle ended up bound.
    ///
    /// At most one binding ever takes effect; later calls are ignored. The
    /// resolver must come from the library that owns this handle, which
    /// keeps the returned pointer valid for the handle's lifetime.
    pub fn bind(&self, resolver: GetLexerFactoryFn, index: u32) -> bool {
        // SAFETY: the resolver was resolved from the owning library's
        // exports, which stay mapped for as long as this handle is owned;
        // the index comes from the same enumeration.
        let factory = unsafe { resolver(index) };
        match factory {
            Some(factory) => self.binding.set(Binding { factory, index }).is_ok(),
            None => {
                tracing::warn!(name = %self.name, index, "factory resolver returned null");
                false
            }
        }
    }

    /// Invokes the bound factory, yielding a fresh engine instance.
    ///
    /// Returns `None` if the handle is unbound or the factory declined to
    /// construct an engine.
    pub fn instantiate(&self) -> Option<RawLexer> {
        let binding = self.binding.get()?;
        // SAFETY: the factory pointer was produced by the owning library's
        // resolver and remains valid while that library is loaded; see the
        // crate docs for the trust contract on plugin code.
        let engine = unsafe { (binding.factory)() };
        NonNull::new(engine).map(RawLexer)
    }
}

impl std::fmt::Debug for LexerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexerHandle")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("index", &self.index())
            .field("bound", &self.is_bound())
            .finish()
    }
}
