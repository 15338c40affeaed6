//! The catalogue: name → lexer lookup for the editing component.
//!
//! The catalogue is a registration sink written to by loaded libraries and
//! read by the editing component when a document needs a lexer by name. It
//! deliberately does not own the handles it indexes: each entry is a
//! [`Weak`] reference, and the owning [`LexerLibrary`](crate::LexerLibrary)
//! controls the handle's lifetime. An entry that outlives its library
//! resolves to `None` instead of dangling.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use crate::plugin::handle::LexerHandle;

/// Name-keyed index of lexer handles.
///
/// Lock poisoning is deliberately ignored throughout: the catalogue is
/// process-global shared state, and a panicking registrant must not take
/// editor-side lookups down with it.
pub struct Catalogue {
    entries: RwLock<HashMap<String, Weak<LexerHandle>>>,
}

impl Catalogue {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `handle` under `name`, replacing any existing entry.
    ///
    /// Only a non-owning reference is stored; the caller keeps ownership.
    pub fn add(&self, name: &str, handle: &Arc<LexerHandle>) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = entries.insert(name.to_string(), Arc::downgrade(handle)) {
            if previous.upgrade().is_some() {
                tracing::debug!(name, "replaced live catalogue entry");
            }
        }
    }

    /// Looks up a lexer by name.
    ///
    /// Returns `None` for unknown names and for entries whose owning library
    /// has been cleared. The returned handle must not be held across
    /// [`LexerRegistry::clear`](crate::LexerRegistry::clear): its factory is
    /// only valid while the owning library stays loaded.
    pub fn resolve(&self, name: &str) -> Option<Arc<LexerHandle>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(Weak::upgrade)
    }

    /// Removes entries whose handle no longer exists, returning how many
    /// were dropped.
    ///
    /// Called by [`LexerRegistry::clear`](crate::LexerRegistry::clear) so
    /// that clearing the registry leaves no dead names behind; entries owned
    /// by still-live libraries are untouched.
    pub fn prune(&self) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, handle| handle.strong_count() > 0);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned dead catalogue entries");
        }
        dropped
    }

    /// All currently registered names, dead entries included.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the catalogue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Catalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalogue")
            .field("entries", &self.len())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<Catalogue>> = OnceLock::new();

/// The process-wide catalogue the editing component queries.
///
/// Libraries loaded through the global registry register here.
pub fn global() -> Arc<Catalogue> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Catalogue::new())))
}
