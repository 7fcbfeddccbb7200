use crate::api_validator::{ApiValidator, HttpMethod, OperationValidator};
use crate::config::ValidatorConfig;
use crate::error::Error;
use crate::schema::{DocumentStore, SchemaError, Validator};
use crate::spec::reference_resolver::{Component, ResolveReference};
use crate::validators::{
    ParameterValidator, ParametersValidator, RequestBodyValidator, ResponseValidator,
};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Build an ApiValidator from a parsed OpenAPI document
pub fn build_api_validator(document: Value, config: &ValidatorConfig) -> Result<ApiValidator, Error> {
    let store = Arc::new(DocumentStore::new("", document));
    let validator = config.validator(Arc::clone(&store));
    let root = store.root();
    let mut api_validator = ApiValidator::new(config.clone());

    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        warn!("document declares no paths");
        return Ok(api_validator);
    };

    for (path, path_item) in paths {
        if let Some(reference) = path_item.get("$ref") {
            warn!(path = %path, reference = %reference, "skipping path item: path item references are not supported");
            continue;
        }

        // Collect all operations for this path into a HashMap
        let mut operations_map = HashMap::new();
        for method in HttpMethod::ALL {
            let Some(operation) = path_item.get(method.key()) else {
                continue;
            };
            let operation_validator = build_operation_validator(&validator, &store, path_item, operation)
                .map_err(|e| {
                    warn!(path = %path, method = method.as_str(), error = %e, "failed to build operation");
                    e
                })?;
            debug!(
                path = %path,
                method = method.as_str(),
                parameters = operation_validator.parameters.len(),
                "built operation validator"
            );
            operations_map.insert(method, operation_validator);
        }

        if operations_map.is_empty() {
            continue;
        }
        // Insert all operations for this path at once
        api_validator.add_path_operations(path, operations_map)?;
    }

    debug!(operations = api_validator.operation_count(), "operation table built");
    Ok(api_validator)
}

/// Build an OperationValidator from an OpenAPI operation
fn build_operation_validator(
    validator: &Validator,
    store: &DocumentStore,
    path_item: &Value,
    operation: &Value,
) -> Result<OperationValidator, Error> {
    let parameters_validator = build_parameters_validator(
        store,
        [path_item.get("parameters"), operation.get("parameters")],
    )?;

    let request_body_validator = match operation.get("requestBody") {
        Some(request_body_ref) => {
            let request_body = request_body_ref.resolve_component(store, Component::RequestBody)?;
            Some(RequestBodyValidator::from_object(&request_body)?)
        }
        None => None,
    };

    let response_validator = build_response_validator(store, operation.get("responses"))?;

    Ok(OperationValidator::new(
        validator.clone(),
        request_body_validator,
        response_validator,
        parameters_validator,
    ))
}

/// Build a ResponseValidator from OpenAPI Responses
fn build_response_validator(
    store: &DocumentStore,
    responses: Option<&Value>,
) -> Result<ResponseValidator, SchemaError> {
    let mut response_validator = ResponseValidator::new();
    let Some(responses) = responses else {
        return Ok(response_validator);
    };
    let responses = responses
        .as_object()
        .ok_or_else(|| SchemaError::Malformed("responses must be an object".to_owned()))?;

    for (status, response_ref) in responses {
        let response = response_ref.resolve_component(store, Component::Response)?;
        response_validator.add_response(status, &response)?;
    }
    Ok(response_validator)
}

/// Build a ParametersValidator from the path-level and operation-level lists, in
/// that order, so operation parameters override path parameters.
fn build_parameters_validator(
    store: &DocumentStore,
    lists: [Option<&Value>; 2],
) -> Result<ParametersValidator, SchemaError> {
    let mut params_validator = ParametersValidator::new();

    for list in lists.into_iter().flatten() {
        let list = list
            .as_array()
            .ok_or_else(|| SchemaError::Malformed("parameters must be an array".to_owned()))?;
        for parameter_ref in list {
            let parameter = parameter_ref.resolve_component(store, Component::Parameter)?;
            params_validator.add_parameter(ParameterValidator::from_object(&parameter)?);
        }
    }

    Ok(params_validator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Location;
    use crate::value;

    fn document() -> Value {
        value!({
            "openapi": "3.0.0",
            "paths": {
                "/items/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"$ref": "#/components/parameters/Verbose"}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                        ],
                        "responses": {"200": {"$ref": "#/components/responses/Item"}}
                    },
                    "put": {
                        "requestBody": {"$ref": "#/components/requestBodies/Item"},
                        "responses": {"default": {"description": "anything"}}
                    },
                    "summary": "not an operation"
                },
                "/elsewhere": {"$ref": "#/paths/~1items~1{id}"}
            },
            "components": {
                "parameters": {
                    "Verbose": {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                },
                "requestBodies": {
                    "Item": {"required": true, "content": {"application/json": {"schema": {"type": "object"}}}}
                },
                "responses": {
                    "Item": {"content": {"application/json": {"schema": {"type": "object"}}}}
                }
            }
        })
    }

    #[test]
    fn builds_one_validator_per_operation() {
        let api = build_api_validator(document(), &ValidatorConfig::default()).unwrap();
        assert_eq!(api.operation_count(), 2);

        let (get, params) = api.find_operation("/items/42", HttpMethod::GET).unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        let keys: Vec<_> = get.parameters.iter().map(|p| (p.location(), p.name().to_owned())).collect();
        assert_eq!(
            keys,
            vec![(Location::Path, "id".to_owned()), (Location::Query, "verbose".to_owned())]
        );

        let (put, _) = api.find_operation("/items/42", HttpMethod::PUT).unwrap();
        assert!(put.request_body.as_ref().is_some_and(|body| body.is_required()));
        assert!(api.find_operation("/items/42", HttpMethod::DELETE).is_none());
        assert!(api.find_operation("/elsewhere", HttpMethod::GET).is_none());
    }

    #[test]
    fn malformed_parameters_fail_the_build() {
        let document = value!({
            "openapi": "3.0.0",
            "paths": {"/a": {"get": {"parameters": [{"in": "query"}]}}}
        });
        assert!(matches!(
            build_api_validator(document, &ValidatorConfig::default()),
            Err(Error::Schema(SchemaError::Malformed(_)))
        ));
    }
}
