use crate::schema::error::SchemaError;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use tracing::trace;

/// Compiled `pattern`/`patternProperties` regexes, shared across validations.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: DashMap<String, Arc<Regex>>,
}

impl PatternCache {
    pub fn get(&self, pattern: &str) -> Result<Arc<Regex>, SchemaError> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(Arc::clone(&regex));
        }
        trace!(pattern, "compiling pattern");
        let regex = Regex::new(pattern)
            .map(Arc::new)
            .map_err(|source| SchemaError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        self.compiled.insert(pattern.to_owned(), Arc::clone(&regex));
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile_once() {
        let cache = PatternCache::default();
        let first = cache.get("^a+$").unwrap();
        let second = cache.get("^a+$").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalid_patterns_are_schema_errors() {
        let cache = PatternCache::default();
        assert!(matches!(
            cache.get("(unclosed"),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }
}
