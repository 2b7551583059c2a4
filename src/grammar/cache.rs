//! Per-run cache of built grammars, keyed by language id.

use once_cell::sync::OnceCell;
use std::collections::HashMap;

use super::{resolve_language, Grammar, Language, GENERIC, LANGUAGES};

/// Lazily built grammars shared across scanning threads.
///
/// Every known language gets a slot up front, so lookups never take a lock
/// on the map itself. Each slot is a `OnceCell`: threads racing on the first
/// use of a language block until a single build finishes.
pub struct GrammarCache {
    slots: HashMap<&'static str, OnceCell<Grammar>>,
    generic: OnceCell<Grammar>,
}

impl GrammarCache {
    pub fn new() -> Self {
        let slots = LANGUAGES.iter().map(|l| (l.id, OnceCell::new())).collect();
        Self {
            slots,
            generic: OnceCell::new(),
        }
    }

    /// Get (building on first use) the grammar for a language.
    ///
    /// Languages outside the built-in table share the generic grammar.
    pub fn get(&self, language: &'static Language) -> &Grammar {
        match self.slots.get(language.id) {
            Some(slot) => slot.get_or_init(|| Grammar::build(language)),
            None => self.generic.get_or_init(|| Grammar::build(&GENERIC)),
        }
    }

    /// Get the grammar for a file extension.
    pub fn for_extension(&self, extension: &str) -> &Grammar {
        self.get(resolve_language(extension))
    }

    /// Number of grammars built so far.
    pub fn built_count(&self) -> usize {
        let built = self.slots.values().filter(|s| s.get().is_some()).count();
        built + usize::from(self.generic.get().is_some())
    }
}

impl Default for GrammarCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_grammars_are_built_once() {
        let cache = GrammarCache::new();
        assert_eq!(cache.built_count(), 0);

        let a = cache.for_extension("py") as *const Grammar;
        let b = cache.for_extension("pyi") as *const Grammar;
        assert_eq!(a, b);
        assert_eq!(cache.built_count(), 1);

        cache.for_extension("rs");
        assert_eq!(cache.built_count(), 2);
    }

    #[test]
    fn test_unknown_extension_uses_generic() {
        let cache = GrammarCache::new();
        assert_eq!(cache.for_extension("zzz").language().id, "generic");
        assert_eq!(cache.for_extension("").language().id, "generic");
        assert_eq!(cache.built_count(), 1);
    }

    #[test]
    fn test_concurrent_first_use() {
        let cache = Arc::new(GrammarCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.for_extension("go").language().id)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "go");
        }
        assert_eq!(cache.built_count(), 1);
    }
}
