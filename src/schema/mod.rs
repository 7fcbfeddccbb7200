//! The schema engine: reference resolution, keyword evaluation and format checks.

pub mod error;
pub mod formats;
pub mod keyword;
mod keywords;
pub mod merge;
pub mod patterns;
pub mod resolver;
pub mod validator;

pub use error::{
    format_pointer, ErrorRef, FormatError, PathStep, SchemaError, ValidationError, ValidationErrors,
};
pub use formats::{Dialect, FormatCheck, FormatRegistry, FormatResult};
pub use keyword::Keyword;
pub use merge::{merge, merge_all, overlay};
pub use patterns::PatternCache;
pub use resolver::{resolve_pointer, DocumentStore, Resolver};
pub use validator::{Validated, Validator};
