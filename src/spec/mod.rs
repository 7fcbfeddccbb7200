pub mod builder;
pub mod loader;
pub mod reference_resolver;

pub use builder::build_api_validator;
pub use loader::{load_openapi_spec, parse_openapi_spec};
pub use reference_resolver::{Component, ResolveReference};
