use crate::error::Error;
use crate::schema::{Dialect, DocumentStore, Validator};
use serde::Deserialize;
use std::sync::Arc;

/// Validator settings, all off by default.
///
/// ```yaml
/// fill_by_default: true
/// validate_response: true
/// raise_422: false
/// dialect: oas3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Fill missing properties and query parameters from declared defaults.
    pub fill_by_default: bool,
    /// Check produced responses against the declared responses.
    pub validate_response: bool,
    /// Report invalid input as 422 instead of 400.
    pub raise_422: bool,
    pub dialect: Dialect,
}

impl ValidatorConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, Error> {
        serde_yaml::from_str(source)
            .map_err(|e| Error::Load(format!("invalid validator configuration: {}", e)))
    }

    /// A schema validator over `store` configured by these settings.
    pub fn validator(&self, store: Arc<DocumentStore>) -> Validator {
        Validator::new(store)
            .with_dialect(self.dialect)
            .fill_by_default(self.fill_by_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = ValidatorConfig::from_yaml_str("fill_by_default: true\n").unwrap();
        assert!(config.fill_by_default);
        assert!(!config.validate_response);
        assert!(!config.raise_422);
        assert_eq!(config.dialect, Dialect::Oas3);
    }

    #[test]
    fn dialect_is_lowercase() {
        let config = ValidatorConfig::from_yaml_str("dialect: draft4").unwrap();
        assert_eq!(config.dialect, Dialect::Draft4);
        assert!(!config.validator(Arc::new(DocumentStore::new("", Default::default())))
            .formats()
            .contains("date"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ValidatorConfig::from_yaml_str("fill_by_defaults: true"),
            Err(Error::Load(_))
        ));
    }
}
