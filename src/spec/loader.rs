use crate::error::Error;
use crate::value::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loads an OpenAPI 3 document from a YAML or JSON file
pub fn load_openapi_spec(path: &Path) -> Result<Value, Error> {
    let source = fs::read_to_string(path)
        .map_err(|e| Error::Load(format!("failed to read {}: {}", path.display(), e)))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let document = if is_json {
        let document: Value = serde_json::from_str(&source)
            .map_err(|e| Error::Load(format!("failed to parse {}: {}", path.display(), e)))?;
        check_version(&document)?;
        document
    } else {
        parse_openapi_spec(&source)?
    };
    debug!(path = %path.display(), "loaded OpenAPI document");
    Ok(document)
}

/// Parses an OpenAPI 3 document from YAML (or JSON) text.
pub fn parse_openapi_spec(source: &str) -> Result<Value, Error> {
    let document: Value = serde_yaml::from_str(source)
        .map_err(|e| Error::Load(format!("failed to parse OpenAPI document: {}", e)))?;
    check_version(&document)?;
    Ok(document)
}

fn check_version(document: &Value) -> Result<(), Error> {
    // An unquoted `openapi: 3.0` arrives as a number.
    let version = match document.get("openapi") {
        Some(Value::String(version)) => Some(version.clone()),
        Some(number @ (Value::Float(_) | Value::Integer(_))) => Some(number.to_string()),
        _ => None,
    };
    match version {
        Some(version) if version.starts_with("3.") => Ok(()),
        Some(version) => Err(Error::Load(format!(
            "unsupported OpenAPI version {}; only 3.x is supported",
            version
        ))),
        None => Err(Error::Load("missing `openapi` version field".to_owned())),
    }
}
