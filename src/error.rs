use crate::schema::{SchemaError, ValidationError, ValidationErrors};
use thiserror::Error;

/// Failure surfaced to the HTTP layer.
///
/// `Invalid` and `NotAcceptable` are the caller's fault; everything else means the
/// document or the service itself is at odds with its contract.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("schema error: {0}")]
    Schema(SchemaError),

    #[error("content type {} is not acceptable", .0.as_deref().unwrap_or("(none)"))]
    NotAcceptable(Option<String>),

    #[error("response violates the declared contract: {0}")]
    ResponseContract(ValidationErrors),

    #[error("failed to load OpenAPI document: {0}")]
    Load(String),
}

impl From<SchemaError> for Error {
    fn from(error: SchemaError) -> Self {
        match error {
            SchemaError::Unsupported(reason) => Error::Unsupported(reason),
            other => Error::Schema(other),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::Invalid(error.into())
    }
}

impl Error {
    /// HTTP status for this failure. `raise_422` swaps 400 for 422 on invalid input.
    pub fn status_code(&self, raise_422: bool) -> u16 {
        match self {
            Error::Invalid(_) if raise_422 => 422,
            Error::Invalid(_) => 400,
            Error::NotAcceptable(_) => 406,
            Error::Unsupported(_)
            | Error::Schema(_)
            | Error::ResponseContract(_)
            | Error::Load(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Invalid(_) | Error::NotAcceptable(_))
    }

    /// The collected violations, for either side of the exchange.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Invalid(errors) | Error::ResponseContract(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Malformed transport encoding of a parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error("malformed key=value pair {0:?}")]
    MalformedPair(String),

    #[error("expected key,value pairs but found {0} element(s)")]
    OddPairs(usize),

    #[error("bad query field {0:?}")]
    MalformedQuery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_error_side() {
        let invalid = Error::from(ValidationError::new("bad"));
        assert_eq!(invalid.status_code(false), 400);
        assert_eq!(invalid.status_code(true), 422);
        assert!(invalid.is_client_error());

        let unsupported = Error::from(SchemaError::Unsupported("matrix style".into()));
        assert!(matches!(unsupported, Error::Unsupported(_)));
        assert_eq!(unsupported.status_code(true), 500);
        assert!(!unsupported.is_client_error());

        assert_eq!(Error::NotAcceptable(None).status_code(false), 406);
        assert_eq!(
            Error::NotAcceptable(Some("text/plain".into())).to_string(),
            "content type text/plain is not acceptable"
        );
    }

    #[test]
    fn fatal_schema_errors_are_server_side() {
        let error = Error::from(SchemaError::ScopeUnderflow);
        assert!(matches!(error, Error::Schema(SchemaError::ScopeUnderflow)));
        assert_eq!(error.status_code(false), 500);
        assert!(error.validation_errors().is_none());
    }
}
