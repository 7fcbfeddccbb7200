pub mod api_validator;
pub mod config;
pub mod error;
pub mod params;
pub mod schema;
pub mod spec;
pub mod validators;
pub mod value;

pub use api_validator::{ApiValidator, HttpMethod, OperationValidator, ValidatedRequest};
pub use config::ValidatorConfig;
pub use error::{Error, StyleError};
pub use schema::{
    Dialect, DocumentStore, FormatRegistry, SchemaError, ValidationError, ValidationErrors, Validator,
};
pub use spec::{build_api_validator, load_openapi_spec, parse_openapi_spec, ResolveReference};
pub use validators::{
    ParameterValidator, ParametersValidator, RawRequest, RawResponse, RequestBodyValidator,
    ResponseValidator,
};
pub use value::{Map, Value};
