pub mod parameter;
pub mod request;
pub mod response;

pub use parameter::{ParameterValidator, ParametersValidator};
pub use request::{RawRequest, RequestBodyValidator};
pub use response::{RawResponse, ResponseValidator};

use crate::schema::SchemaError;
use crate::value::Value;
use indexmap::IndexMap;

pub(crate) const MIME_JSON: &str = "application/json";

/// Lowercased media type without parameters: `Application/JSON; charset=utf-8` to
/// `application/json`.
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Media type to optional schema, from an OpenAPI `content` object.
pub(crate) fn parse_content(object: &Value) -> Result<IndexMap<String, Option<Value>>, SchemaError> {
    let Some(content) = object.get("content") else {
        return Ok(IndexMap::new());
    };
    let content = content
        .as_object()
        .ok_or_else(|| SchemaError::Malformed("content must be an object".to_owned()))?;
    Ok(content
        .iter()
        .map(|(media, entry)| (media_type(media), entry.get("schema").cloned()))
        .collect())
}
