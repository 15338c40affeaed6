//! One opened shared library and the lexers it contributed.

use std::ffi::{c_char, c_int, c_uint, CStr};
use std::sync::Arc;

use libloading::Library;

use crate::catalogue::Catalogue;
use crate::error::LoadError;
use crate::plugin::abi::{
    self, GetLexerCountFn, GetLexerFactoryFn, GetLexerNameFn, LEXER_NAME_LEN,
};
use crate::plugin::handle::{LexerHandle, LexerOrigin};

/// Capability functions resolved from a library's exports.
///
/// `count` is the gate: without it the library contributes nothing. The
/// other two may be individually absent, degrading per lexer (empty name,
/// unbound factory) instead of failing the load.
pub(crate) struct LexerApi {
    pub(crate) count: GetLexerCountFn,
    pub(crate) name: Option<GetLexerNameFn>,
    pub(crate) factory: Option<GetLexerFactoryFn>,
}

/// Keeps the shared object mapped while any of its factories can still run.
enum Keepalive {
    Native(Library),
    #[cfg(test)]
    Witness(Arc<()>),
}

/// In-memory record of one load request: the opened native library (when it
/// opened) and the handles it produced, in export order.
///
/// Constructed once, never mutated afterwards; all enumeration and catalogue
/// registration happens before the constructor returns. Construction never
/// fails: a library that cannot be opened or recognized yields an inert
/// record that remembers why.
pub struct LexerLibrary {
    path: String,
    // Declared before the keepalive so handles (and the factory pointers
    // inside them) drop while the library is still mapped.
    lexers: Vec<Arc<LexerHandle>>,
    failure: Option<LoadError>,
    _keepalive: Option<Keepalive>,
}

impl LexerLibrary {
    /// Opens `path` and enumerates its lexers, registering each with
    /// `catalogue`.
    pub(crate) fn open(path: &str, catalogue: &Catalogue) -> Self {
        let mut library = Self {
            path: path.to_string(),
            lexers: Vec::new(),
            failure: None,
            _keepalive: None,
        };

        // SAFETY: loading a shared object runs its initializers. Lexer
        // plugins are trusted code by contract; see the crate docs.
        let native = match unsafe { Library::new(path) } {
            Ok(native) => native,
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to open lexer library");
                library.failure = Some(LoadError::Open {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                return library;
            }
        };

        let api = Self::resolve_api(&native);
        // The native handle stays open even when no capability export is found.
        library._keepalive = Some(Keepalive::Native(native));
        match api {
            Some(api) => library.populate(api, catalogue),
            None => {
                tracing::debug!(path, "library exports no lexer capability entry point");
                library.failure = Some(LoadError::NoCapability {
                    path: path.to_string(),
                });
            }
        }
        library
    }

    /// Builds a record from an already-resolved capability set, with a
    /// witness standing in for the native handle so teardown is observable.
    #[cfg(test)]
    pub(crate) fn from_api(
        path: &str,
        api: LexerApi,
        catalogue: &Catalogue,
        witness: Arc<()>,
    ) -> Self {
        let mut library = Self {
            path: path.to_string(),
            lexers: Vec::new(),
            failure: None,
            _keepalive: Some(Keepalive::Witness(witness)),
        };
        library.populate(api, catalogue);
        library
    }

    /// The path this library was loaded from; the registry's dedup key.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Handles for every lexer this library contributed, in export order.
    pub fn lexers(&self) -> &[Arc<LexerHandle>] {
        &self.lexers
    }

    /// Why this library contributed nothing, when it did not.
    pub fn failure(&self) -> Option<&LoadError> {
        self.failure.as_ref()
    }

    fn resolve_api(native: &Library) -> Option<LexerApi> {
        // SAFETY: the three signatures are fixed by the capability contract
        // in `abi`; a library exporting these names with other signatures is
        // outside the trust contract.
        unsafe {
            let count = native
                .get::<GetLexerCountFn>(abi::LEXER_COUNT_SYMBOL)
                .ok()?;
            let name = native.get::<GetLexerNameFn>(abi::LEXER_NAME_SYMBOL).ok();
            let factory = native
                .get::<GetLexerFactoryFn>(abi::LEXER_FACTORY_SYMBOL)
                .ok();
            // Copy the raw pointers out of the `Symbol` borrows; the struct
            // that stores them also owns the `Library` keeping them valid.
            Some(LexerApi {
                count: *count,
                name: name.map(|symbol| *symbol),
                factory: factory.map(|symbol| *symbol),
            })
        }
    }

    fn populate(&mut self, api: LexerApi, catalogue: &Catalogue) {
        // SAFETY: trusted plugin export, takes no arguments.
        let declared = unsafe { (api.count)() };
        // A negative count reads as zero.
        for index in 0..declared.max(0) as c_uint {
            let name = api
                .name
                .map(|f| Self::lexer_name(f, index))
                .unwrap_or_default();
            if name.is_empty() {
                tracing::warn!(path = %self.path, index, "lexer reported an empty name");
            }

            let handle = Arc::new(LexerHandle::new(LexerOrigin::External, name));
            // Registration first: by the time the load request returns, the
            // lexer must be both queryable and invocable.
            catalogue.add(handle.name(), &handle);
            self.lexers.push(Arc::clone(&handle));

            match api.factory {
                Some(resolver) => {
                    handle.bind(resolver, index);
                }
                None => {
                    tracing::warn!(path = %self.path, index, "no factory export; lexer left unbound");
                }
            }
        }
        tracing::debug!(path = %self.path, lexers = self.lexers.len(), "enumerated lexer library");
    }

    fn lexer_name(name_fn: GetLexerNameFn, index: c_uint) -> String {
        let mut buffer = [0u8; LEXER_NAME_LEN];
        // SAFETY: the buffer is writable for LEXER_NAME_LEN bytes, and the
        // export NUL-terminates within the bound it is given.
        unsafe {
            name_fn(
                index,
                buffer.as_mut_ptr().cast::<c_char>(),
                buffer.len() as c_int,
            )
        };
        match CStr::from_bytes_until_nul(&buffer) {
            Ok(name) => name.to_string_lossy().into_owned(),
            // The export filled the whole buffer without terminating; take
            // it as-is rather than rejecting the lexer.
            Err(_) => String::from_utf8_lossy(&buffer).into_owned(),
        }
    }
}

impl std::fmt::Debug for LexerLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexerLibrary")
            .field("path", &self.path)
            .field("lexers", &self.lexers.len())
            .field("failure", &self.failure)
            .finish()
    }
}
