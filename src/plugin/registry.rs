//! The process-wide owner of loaded lexer libraries.

use std::sync::{Arc, Mutex, PoisonError};

use crate::catalogue::{self, Catalogue};
use crate::error::LoadError;
use crate::plugin::library::LexerLibrary;

/// Outcome of a single load request.
///
/// Loads are fire-and-forget for hosts that want them to be; this report
/// exists for the ones that do not. It never represents a caller-visible
/// failure: a library that contributed nothing is described, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The path was already loaded; nothing changed.
    pub already_loaded: bool,
    /// Lexers registered with the catalogue by this request.
    pub registered: usize,
    /// Registered lexers whose name came back empty.
    pub unnamed: usize,
    /// Registered lexers left without a callable factory.
    pub unbound: usize,
    /// Why the library contributed nothing, when it did not.
    pub failure: Option<LoadError>,
}

/// Owns every [`LexerLibrary`] and deduplicates load requests by path.
///
/// Most hosts use the process-wide instance through [`load_library`] and
/// [`LexerRegistry::with_global`]; standalone registries (e.g. with a
/// private catalogue) behave identically and are how the tests run in
/// isolation.
pub struct LexerRegistry {
    libraries: Vec<LexerLibrary>,
    catalogue: Arc<Catalogue>,
}

static REGISTRY: Mutex<Option<LexerRegistry>> = Mutex::new(None);

impl LexerRegistry {
    /// Creates a registry that registers lexers with the process-wide
    /// catalogue.
    pub fn new() -> Self {
        Self::with_catalogue(catalogue::global())
    }

    /// Creates a registry that registers lexers with `catalogue`.
    pub fn with_catalogue(catalogue: Arc<Catalogue>) -> Self {
        Self {
            libraries: Vec::new(),
            catalogue,
        }
    }

    /// Ensures a library record exists for `path`.
    ///
    /// Paths are compared as exact strings. A path that was loaded before,
    /// successfully or not, is left untouched. A new path is opened,
    /// enumerated, and registered before this returns, so its lexers are
    /// immediately queryable and invocable. Never fails and never panics;
    /// see [`LoadReport`].
    pub fn load(&mut self, path: &str) -> LoadReport {
        if self.libraries.iter().any(|library| library.path() == path) {
            tracing::trace!(path, "lexer library already loaded");
            return LoadReport {
                already_loaded: true,
                ..LoadReport::default()
            };
        }
        self.install(LexerLibrary::open(path, &self.catalogue))
    }

    /// Mock-backed variant of [`Self::load`] for tests.
    #[cfg(test)]
    pub(crate) fn load_with(
        &mut self,
        path: &str,
        api: crate::plugin::library::LexerApi,
        witness: Arc<()>,
    ) -> LoadReport {
        if self.libraries.iter().any(|library| library.path() == path) {
            return LoadReport {
                already_loaded: true,
                ..LoadReport::default()
            };
        }
        self.install(LexerLibrary::from_api(path, api, &self.catalogue, witness))
    }

    fn install(&mut self, library: LexerLibrary) -> LoadReport {
        let report = LoadReport {
            already_loaded: false,
            registered: library.lexers().len(),
            unnamed: library
                .lexers()
                .iter()
                .filter(|handle| handle.name().is_empty())
                .count(),
            unbound: library
                .lexers()
                .iter()
                .filter(|handle| !handle.is_bound())
                .count(),
            failure: library.failure().cloned(),
        };
        tracing::debug!(
            path = library.path(),
            registered = report.registered,
            unbound = report.unbound,
            "lexer library load finished"
        );
        self.libraries.push(library);
        report
    }

    /// Drops every library, closing each native handle and invalidating
    /// each handle it produced, then prunes the now-dead catalogue entries.
    ///
    /// The registry stays usable; previously loaded paths can be loaded
    /// again.
    pub fn clear(&mut self) {
        let dropped = self.libraries.len();
        self.libraries.clear();
        let pruned = self.catalogue.prune();
        tracing::debug!(libraries = dropped, pruned, "lexer registry cleared");
    }

    /// The loaded libraries, in load order.
    pub fn libraries(&self) -> &[LexerLibrary] {
        &self.libraries
    }

    /// Whether a record exists for `path`.
    pub fn is_loaded(&self, path: &str) -> bool {
        self.libraries.iter().any(|library| library.path() == path)
    }

    /// Number of loaded library records.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Whether no libraries are loaded.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// The catalogue this registry registers lexers with.
    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    /// Runs `f` against the process-wide registry, creating it on first use.
    ///
    /// Serialized by a lock, so concurrent loads and clears cannot interleave.
    pub fn with_global<R>(f: impl FnOnce(&mut LexerRegistry) -> R) -> R {
        let mut slot = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        f(slot.get_or_insert_with(LexerRegistry::new))
    }

    /// Destroys the process-wide registry, closing every native handle.
    ///
    /// A later [`Self::with_global`] sees a fresh, empty registry. Succeeds
    /// even if a panicking caller poisoned the lock: teardown is the one
    /// path that must not fail.
    pub fn delete_instance() {
        let mut slot = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut registry) = slot.take() {
            registry.clear();
        }
    }
}

impl Default for LexerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LexerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexerRegistry")
            .field("libraries", &self.libraries.len())
            .finish()
    }
}

/// Loads the lexer library at `path` into the process-wide registry.
///
/// The fire-and-forget entry point hosts call when the user configures an
/// external lexer module: no return value, and a missing or malformed
/// library contributes zero lexers instead of failing. Hosts that want the
/// outcome use [`LexerRegistry::with_global`] and read the [`LoadReport`].
pub fn load_library(path: &str) {
    LexerRegistry::with_global(|registry| {
        registry.load(path);
    });
}

/// Tears the process-wide registry down when dropped.
///
/// Constructed by the host at startup and held for the life of the process,
/// this guarantees every native library is closed even if the host never
/// calls [`LexerRegistry::delete_instance`] itself.
#[must_use = "the registry is torn down when the guard drops"]
#[derive(Debug, Default)]
pub struct ShutdownGuard(());

impl ShutdownGuard {
    /// Creates the guard. The host keeps it until shutdown.
    pub fn new() -> Self {
        ShutdownGuard(())
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        LexerRegistry::delete_instance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{c_char, c_int, c_uint, c_void};

    use crate::plugin::abi::{copy_name_truncated, LexerFactoryFn};
    use crate::plugin::library::LexerApi;

    unsafe extern "C" fn count_two() -> c_int {
        2
    }

    unsafe extern "C" fn name_by_index(index: c_uint, buffer: *mut c_char, buffer_len: c_int) {
        let name = ["Foo", "Bar"].get(index as usize).copied().unwrap_or("");
        // SAFETY: forwarding the caller's contract.
        unsafe { copy_name_truncated(name, buffer, buffer_len) }
    }

    unsafe extern "C" fn engine_0() -> *mut c_void {
        0x100 as *mut c_void
    }

    unsafe extern "C" fn engine_1() -> *mut c_void {
        0x200 as *mut c_void
    }

    unsafe extern "C" fn factory_by_index(index: c_uint) -> Option<LexerFactoryFn> {
        [engine_0 as LexerFactoryFn, engine_1]
            .get(index as usize)
            .copied()
    }

    fn mock_api() -> LexerApi {
        LexerApi {
            count: count_two,
            name: Some(name_by_index),
            factory: Some(factory_by_index),
        }
    }

    fn nameless_api() -> LexerApi {
        LexerApi {
            count: count_two,
            name: None,
            factory: None,
        }
    }

    fn fresh_registry() -> LexerRegistry {
        LexerRegistry::with_catalogue(Arc::new(Catalogue::new()))
    }

    #[test]
    fn test_load_deduplicates_by_path() {
        let mut registry = fresh_registry();

        let first = registry.load_with("mock_lexers", mock_api(), Arc::new(()));
        assert!(!first.already_loaded);
        assert_eq!(first.registered, 2);

        let second = registry.load_with("mock_lexers", mock_api(), Arc::new(()));
        assert!(second.already_loaded);
        assert_eq!(second.registered, 0);

        assert_eq!(registry.len(), 1);
        // No duplicate catalogue registrations either.
        assert_eq!(registry.catalogue().len(), 2);
    }

    #[test]
    fn test_end_to_end_mock_library() {
        let mut registry = fresh_registry();
        let report = registry.load_with("mock_lexers", mock_api(), Arc::new(()));

        assert_eq!(report.registered, 2);
        assert_eq!(report.unnamed, 0);
        assert_eq!(report.unbound, 0);
        assert!(report.failure.is_none());

        assert!(registry.is_loaded("mock_lexers"));
        let library = &registry.libraries()[0];
        let names: Vec<_> = library.lexers().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["Foo", "Bar"]);

        // The catalogue saw exactly these two registrations, and each
        // resolves to the handle whose factory carries its own marker.
        let catalogue = Arc::clone(registry.catalogue());
        assert_eq!(catalogue.len(), 2);
        let foo = catalogue.resolve("Foo").unwrap();
        let bar = catalogue.resolve("Bar").unwrap();
        assert_eq!(foo.instantiate().unwrap().as_ptr() as usize, 0x100);
        assert_eq!(bar.instantiate().unwrap().as_ptr() as usize, 0x200);
    }

    #[test]
    fn test_degraded_lexers_are_counted() {
        let mut registry = fresh_registry();
        let report = registry.load_with("mock_lexers", nameless_api(), Arc::new(()));

        assert_eq!(report.registered, 2);
        assert_eq!(report.unnamed, 2);
        assert_eq!(report.unbound, 2);
    }

    #[test]
    fn test_failed_load_does_not_disturb_previous_libraries() {
        let mut registry = fresh_registry();
        registry.load_with("mock_lexers", mock_api(), Arc::new(()));

        let report = registry.load("/nonexistent/liblexers.so");
        assert!(!report.already_loaded);
        assert_eq!(report.registered, 0);
        assert!(matches!(report.failure, Some(LoadError::Open { .. })));

        // The bad path still produced a record, and the good one is intact.
        assert_eq!(registry.len(), 2);
        assert!(registry.catalogue().resolve("Foo").is_some());

        // Retrying the bad path is a dedup hit, not another open attempt.
        assert!(registry.load("/nonexistent/liblexers.so").already_loaded);
    }

    #[test]
    fn test_clear_releases_everything_and_stays_usable() {
        let mut registry = fresh_registry();
        let witness = Arc::new(());
        registry.load_with("mock_lexers", mock_api(), Arc::clone(&witness));
        assert_eq!(Arc::strong_count(&witness), 2);

        registry.clear();

        // Native handle slot dropped, catalogue pruned, registry empty.
        assert_eq!(Arc::strong_count(&witness), 1);
        assert!(registry.is_empty());
        assert!(registry.catalogue().is_empty());
        assert!(registry.catalogue().resolve("Foo").is_none());

        // Clearing is not the end: the same path loads again.
        let report = registry.load_with("mock_lexers", mock_api(), Arc::new(()));
        assert!(!report.already_loaded);
        assert_eq!(report.registered, 2);
    }

    // The process-wide slot is shared by every test in this binary, so the
    // whole lifecycle runs as one sequence.
    #[test]
    fn test_global_registry_lifecycle() {
        LexerRegistry::delete_instance();

        load_library("/nonexistent/libglobal.so");
        let len = LexerRegistry::with_global(|registry| registry.len());
        assert_eq!(len, 1);

        // Same logical registry on every access.
        load_library("/nonexistent/libglobal.so");
        let len = LexerRegistry::with_global(|registry| registry.len());
        assert_eq!(len, 1);

        // Deleting the instance yields a fresh, empty registry on next use.
        LexerRegistry::delete_instance();
        let len = LexerRegistry::with_global(|registry| registry.len());
        assert_eq!(len, 0);

        // The guard tears the instance down when dropped.
        {
            let _guard = ShutdownGuard::new();
            load_library("/nonexistent/libguarded.so");
            let len = LexerRegistry::with_global(|registry| registry.len());
            assert_eq!(len, 1);
        }
        let len = LexerRegistry::with_global(|registry| registry.len());
        assert_eq!(len, 0);

        LexerRegistry::delete_instance();
    }
}
