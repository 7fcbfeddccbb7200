use crate::error::Error;
use crate::schema::{SchemaError, ValidationError, ValidationErrors, Validator};
use crate::validators::{media_type, parse_content, MIME_JSON};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// A response produced by the service.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }
}

#[derive(Debug, Clone)]
struct ResponseEntry {
    content: IndexMap<String, Option<Value>>,
}

/// Declared responses of an operation keyed by status code.
///
/// Lookup order is the exact code, then its `NXX` range, then `default`.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    exact: HashMap<u16, ResponseEntry>,
    ranges: HashMap<u16, ResponseEntry>,
    default: Option<ResponseEntry>,
}

impl ResponseValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response object declared under `status` (`"200"`, `"2XX"` or
    /// `"default"`).
    pub fn add_response(&mut self, status: &str, object: &Value) -> Result<(), SchemaError> {
        let entry = ResponseEntry {
            content: parse_content(object)?,
        };
        if status == "default" {
            self.default = Some(entry);
            return Ok(());
        }
        let malformed = || SchemaError::Malformed(format!("invalid response status {:?}", status));
        let bytes = status.as_bytes();
        if bytes.len() != 3 {
            return Err(malformed());
        }
        if bytes[1..].eq_ignore_ascii_case(b"XX") {
            let class = char::from(bytes[0])
                .to_digit(10)
                .filter(|class| (1..=5).contains(class))
                .ok_or_else(malformed)?;
            self.ranges.insert(class as u16, entry);
        } else {
            let code = status.parse::<u16>().map_err(|_| malformed())?;
            self.exact.insert(code, entry);
        }
        Ok(())
    }

    fn lookup(&self, status: u16) -> Option<&ResponseEntry> {
        self.exact
            .get(&status)
            .or_else(|| self.ranges.get(&(status / 100)))
            .or(self.default.as_ref())
    }

    /// Checks a produced response against its declaration. Every violation is a
    /// contract failure on the server side.
    pub fn validate(&self, validator: &Validator, response: &RawResponse) -> Result<(), Error> {
        let contract = |message: String| Error::ResponseContract(ValidationError::new(message).into());

        let entry = self
            .lookup(response.status)
            .ok_or_else(|| contract("invalid response status code".to_owned()))?;
        if entry.content.is_empty() {
            if !response.body.is_empty() {
                return Err(contract("invalid response: body must be empty".to_owned()));
            }
            return Ok(());
        }

        let is_json = response
            .content_type
            .as_deref()
            .is_some_and(|ct| media_type(ct) == MIME_JSON);
        let schema = entry.content.get(MIME_JSON).and_then(Option::as_ref);
        let (true, Some(schema)) = (is_json, schema) else {
            return Ok(());
        };

        let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
            Error::ResponseContract(ValidationErrors::from(
                ValidationError::new(format!("invalid json response: {}", e)).with_cause(e),
            ))
        })?;
        match validator.validate(&body, schema) {
            Ok(_) => Ok(()),
            Err(Error::Invalid(errors)) => Err(Error::ResponseContract(errors)),
            Err(other) => Err(other),
        }
    }
}
