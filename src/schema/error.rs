use crate::schema::keyword::Keyword;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Lower-level failure kept on a validation error for diagnostics.
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// One step of an instance path or schema path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => f.write_str(key),
            PathStep::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_owned())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

/// Renders a path as a JSON Pointer (`/a/0/b`), escaping `~` and `/`.
pub fn format_pointer<'a>(path: impl IntoIterator<Item = &'a PathStep>) -> String {
    path.into_iter()
        .map(|step| format!("/{}", step.to_string().replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// A single constraint violation.
///
/// `path` and `schema_path` are relative to the error's parent when the error sits in
/// another error's `context`. Absolute paths are derived through [`ErrorRef`].
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub keyword: Option<Keyword>,
    pub path: VecDeque<PathStep>,
    pub schema_path: VecDeque<PathStep>,
    pub context: Vec<ValidationError>,
    pub cause: Option<Cause>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            keyword: None,
            path: VecDeque::new(),
            schema_path: VecDeque::new(),
            context: Vec::new(),
            cause: None,
        }
    }

    pub fn with_context(mut self, context: Vec<ValidationError>) -> Self {
        self.context = context;
        self
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn at(mut self, step: impl Into<PathStep>) -> Self {
        self.path.push_front(step.into());
        self
    }

    /// Views this error as a root of an error tree.
    pub fn as_root(&self) -> ErrorRef<'_> {
        ErrorRef {
            error: self,
            parent: None,
        }
    }

    /// Instance path as a JSON Pointer, relative to the parent error.
    pub fn pointer(&self) -> String {
        format_pointer(&self.path)
    }
}

impl PartialEq for ValidationError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.keyword == other.keyword
            && self.path == other.path
            && self.schema_path == other.schema_path
            && self.context == other.context
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.pointer())
        }
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Borrowed view of an error together with the chain of errors containing it.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRef<'a> {
    pub error: &'a ValidationError,
    parent: Option<&'a ErrorRef<'a>>,
}

impl<'a> ErrorRef<'a> {
    pub fn parent(&self) -> Option<&'a ErrorRef<'a>> {
        self.parent
    }

    /// Children of this error, each carrying a back-reference to `self`.
    pub fn context(&'a self) -> impl Iterator<Item = ErrorRef<'a>> + 'a {
        self.error.context.iter().map(move |error| ErrorRef {
            error,
            parent: Some(self),
        })
    }

    pub fn absolute_path(&self) -> VecDeque<PathStep> {
        let mut path = self
            .parent
            .map(|parent| parent.absolute_path())
            .unwrap_or_default();
        path.extend(self.error.path.iter().cloned());
        path
    }

    pub fn absolute_schema_path(&self) -> VecDeque<PathStep> {
        let mut path = self
            .parent
            .map(|parent| parent.absolute_schema_path())
            .unwrap_or_default();
        path.extend(self.error.schema_path.iter().cloned());
        path
    }
}

/// The non-empty, ordered set of errors raised by one top-level validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Returns `None` for an empty list, since an aggregate always holds an error.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "found {} validation error(s)", self.0.len())?;
        for (i, error) in self.0.iter().enumerate() {
            f.write_str(if i == 0 { "\n" } else { "\n\n" })?;
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl StdError for ValidationErrors {}

/// Conditions that abort a whole validation call: the schema is broken or uses a
/// capability this engine does not implement. Never collected with ordinary errors.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown type {0:?} in schema")]
    UnknownType(String),

    #[error("unresolvable reference: {0}")]
    UnresolvableReference(String),

    #[error("unresolvable JSON pointer: {0}")]
    UnresolvablePointer(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("resolution scope stack underflow")]
    ScopeUnderflow,

    #[error("reference cycle through {0} never reaches a concrete schema")]
    ReferenceCycle(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed schema: {0}")]
    Malformed(String),
}

/// Failure of a string-format checker.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{value} is out of {format} range")]
    OutOfRange { value: i64, format: &'static str },

    #[error(transparent)]
    Date(#[from] chrono::ParseError),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Address(#[from] std::net::AddrParseError),

    #[error(transparent)]
    Uri(#[from] url::ParseError),

    #[error("{0}")]
    Invalid(String),
}
