use crate::error::Error;
use crate::schema::{SchemaError, ValidationError, Validator};
use crate::validators::{media_type, parse_content, MIME_JSON};
use crate::value::Value;
use indexmap::IndexMap;

/// The transport-level parts of a request the validators read.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub query_string: String,
    headers: IndexMap<String, String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    /// Header names are case-insensitive; a repeated name keeps the last value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Validator for request body against the declared media types
#[derive(Debug, Clone)]
pub struct RequestBodyValidator {
    content: IndexMap<String, Option<Value>>,
    required: bool,
}

impl RequestBodyValidator {
    /// Builds from an OpenAPI requestBody object with its `$ref` already resolved.
    pub fn from_object(object: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            content: parse_content(object)?,
            required: object.get("required").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        self.content.contains_key(&media_type(content_type))
    }

    /// Checks the content type and validates a JSON body, returning the transformed
    /// body. Other accepted media types pass unvalidated as `None`.
    pub fn validate(&self, validator: &Validator, request: &RawRequest) -> Result<Option<Value>, Error> {
        if request.body.is_empty() && request.content_type.is_none() && !self.required {
            return Ok(None);
        }
        let declared = request
            .content_type
            .as_deref()
            .map(media_type)
            .filter(|media| self.content.contains_key(media))
            .ok_or_else(|| Error::NotAcceptable(request.content_type.clone()))?;
        if declared != MIME_JSON {
            return Ok(None);
        }

        if request.body.is_empty() {
            if self.required {
                return Err(ValidationError::new("json body is required").into());
            }
            return Ok(None);
        }
        let body: Value = serde_json::from_slice(&request.body)
            .map_err(|e| ValidationError::new(format!("invalid json body: {}", e)).with_cause(e))?;

        match self.content.get(MIME_JSON).and_then(Option::as_ref) {
            Some(schema) => Ok(Some(validator.validate(&body, schema)?.into_instance())),
            None => Ok(Some(body)),
        }
    }
}
