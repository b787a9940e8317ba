//! Compiled-regex cache shared by every validation call.

use forge_core::IgnoreLock as _;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Compiles rule patterns once and remembers the result.
///
/// Patterns that fail to compile are cached as `None` so the failure is only
/// reported once.
pub struct RegexCache {
    /// Upper bound on the compiled program size, in bytes
    size_limit: usize,
    /// Pattern source to compiled regex
    compiled: Mutex<HashMap<String, Option<Regex>>>,
}

impl RegexCache {
    /// Creates an empty cache.
    pub fn new(size_limit: usize) -> Self {
        Self {
            size_limit,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Compiled regex for `pattern`, or `None` if it does not compile.
    pub fn get(&self, pattern: &str) -> Option<Regex> {
        let mut compiled = self.compiled.lock_ignore_poison();
        if let Some(cached) = compiled.get(pattern) {
            return cached.clone();
        }

        let built = match RegexBuilder::new(pattern)
            .size_limit(self.size_limit)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("Rule pattern {pattern:?} does not compile: {err}");
                None
            }
        };
        compiled.insert(pattern.to_owned(), built.clone());
        built
    }

    /// Number of cached patterns, including ones that failed to compile.
    pub fn len(&self) -> usize {
        self.compiled.lock_ignore_poison().len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caches_valid_and_invalid_patterns() {
        let cache = RegexCache::new(1 << 20);

        assert!(cache.get(r"\beval\(").is_some());
        assert!(cache.get(r"\beval\(").is_some());
        assert!(cache.get("(unclosed").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_size_limit_rejects_huge_programs() {
        let cache = RegexCache::new(64);
        assert!(cache.get(r"\w{1000}").is_none());
    }
}
