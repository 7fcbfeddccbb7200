use anyhow::Result;
use chrono::NaiveDate;
use oas3_validator::{
    build_api_validator, load_openapi_spec, value, ApiValidator, Error, HttpMethod, RawRequest,
    ValidatorConfig, Value,
};
use std::path::Path;

fn petstore(config: ValidatorConfig) -> Result<ApiValidator> {
    let document = load_openapi_spec(Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/petstore.yaml"
    )))?;
    Ok(build_api_validator(document, &config)?)
}

fn filling() -> ValidatorConfig {
    ValidatorConfig {
        fill_by_default: true,
        ..ValidatorConfig::default()
    }
}

fn get(api: &ApiValidator, path: &str, request: RawRequest) -> Result<oas3_validator::ValidatedRequest, Error> {
    api.validate_request(HttpMethod::GET, path, &request)
        .expect("route is declared")
}

fn post_pet(api: &ApiValidator, body: &str) -> Result<Option<Value>, Error> {
    let request = RawRequest::new().with_body("application/json", body);
    api.validate_request(HttpMethod::POST, "/pets", &request)
        .expect("route is declared")
        .map(|validated| validated.body)
}

#[test]
fn builds_every_declared_operation() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    assert_eq!(api.operation_count(), 4);
    Ok(())
}

#[test]
fn unknown_routes_and_methods_pass_through() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    assert!(api.validate_request(HttpMethod::GET, "/owners", &RawRequest::new()).is_none());
    assert!(api.validate_request(HttpMethod::DELETE, "/pets", &RawRequest::new()).is_none());
    Ok(())
}

#[test]
fn query_default_is_filled_only_when_enabled() -> Result<()> {
    let filled = get(&petstore(filling())?, "/pets", RawRequest::new())?;
    assert_eq!(filled.params.get("limit"), Some(&value!(20)));

    let plain = get(&petstore(ValidatorConfig::default())?, "/pets", RawRequest::new())?;
    assert!(plain.params.get("limit").is_none());
    Ok(())
}

#[test]
fn query_values_are_coerced_and_checked() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let validated = get(&api, "/pets", RawRequest::new().with_query("limit=5"))?;
    assert_eq!(validated.params.get("limit"), Some(&value!(5)));

    let err = get(&api, "/pets", RawRequest::new().with_query("limit=500")).unwrap_err();
    assert_eq!(api.status_code(&err), 400);
    let errors = err.validation_errors().expect("validation failure");
    assert_eq!(errors.errors()[0].pointer(), "/limit");
    assert!(errors.errors()[0].message.contains("greater than the maximum of 100"));
    Ok(())
}

#[test]
fn raise_422_changes_the_client_status() -> Result<()> {
    let api = petstore(ValidatorConfig {
        raise_422: true,
        ..ValidatorConfig::default()
    })?;
    let err = get(&api, "/pets", RawRequest::new().with_query("limit=zero")).unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(api.status_code(&err), 422);
    Ok(())
}

#[test]
fn exploded_query_array_collects_repeated_keys() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let validated = get(&api, "/pets", RawRequest::new().with_query("tags=a&tags=b%20c"))?;
    assert_eq!(validated.params.get("tags"), Some(&value!(["a", "b c"])));
    Ok(())
}

#[test]
fn deep_object_is_assembled_and_coerced() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let request = RawRequest::new().with_query("filter[minAge]=3&filter[vaccinated]=TRUE");
    let validated = get(&api, "/pets", request)?;
    assert_eq!(
        validated.params.get("filter"),
        Some(&value!({"minAge": 3, "vaccinated": true}))
    );
    Ok(())
}

#[test]
fn headers_are_matched_case_insensitively() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let request = RawRequest::new().with_header("x-request-id", "abc");
    let validated = get(&api, "/pets", request)?;
    assert_eq!(validated.params.get("X-Request-Id"), Some(&value!("abc")));
    Ok(())
}

#[test]
fn malformed_query_string_is_rejected() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = get(&api, "/pets", RawRequest::new().with_query("limit=1&&")).unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("cannot parse query string"));
    Ok(())
}

#[test]
fn operation_level_path_parameter_overrides_path_level() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let validated = get(&api, "/pets/42", RawRequest::new())?;
    assert_eq!(validated.params.get("petId"), Some(&value!(42)));

    assert!(get(&api, "/pets/0", RawRequest::new()).unwrap_err().is_client_error());
    assert!(get(&api, "/pets/rex", RawRequest::new()).unwrap_err().is_client_error());
    Ok(())
}

#[test]
fn int32_path_parameter_rejects_out_of_range_values() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = get(&api, "/pets/2147483648", RawRequest::new()).unwrap_err();
    assert!(err.is_client_error());
    assert!(get(&api, "/pets/2147483647", RawRequest::new()).is_ok());
    Ok(())
}

#[test]
fn simple_path_array_is_split_and_coerced() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let validated = get(&api, "/pets/7/photos/1,2,3", RawRequest::new())?;
    assert_eq!(validated.params.get("petId"), Some(&value!(7)));
    assert_eq!(validated.params.get("ids"), Some(&value!([1, 2, 3])));
    Ok(())
}

#[test]
fn errors_across_parameters_are_collected() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = get(&api, "/pets/x/photos/1,a", RawRequest::new()).unwrap_err();
    let errors = err.validation_errors().expect("validation failure");
    assert_eq!(errors.len(), 2);
    Ok(())
}

#[test]
fn body_default_is_coerced_through_its_format() -> Result<()> {
    let api = petstore(filling())?;
    let body = post_pet(&api, r#"{"name": "rex"}"#)?.expect("json body");
    assert_eq!(
        body.get("born"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2017, 7, 26).expect("valid date")))
    );
    Ok(())
}

#[test]
fn explicit_null_is_not_replaced_by_a_default() -> Result<()> {
    let api = petstore(filling())?;
    let body = post_pet(&api, r#"{"name": "rex", "tag": null}"#)?.expect("json body");
    assert_eq!(body.get("tag"), Some(&Value::Null));

    let err = post_pet(&api, r#"{"name": "rex", "born": null}"#).unwrap_err();
    assert!(err.to_string().contains("null is not of type string"));
    Ok(())
}

#[test]
fn missing_required_property_is_a_client_error() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = post_pet(&api, r#"{"tag": "dog"}"#).unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("'name' is a required property"));
    Ok(())
}

#[test]
fn ambiguous_one_of_is_rejected() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    assert!(post_pet(&api, r#"{"name": "rex", "kind": {"barks": true}}"#).is_ok());
    let err = post_pet(&api, r#"{"name": "rex", "kind": {"barks": true, "meows": false}}"#).unwrap_err();
    assert!(err.to_string().contains("is valid under each of"));
    Ok(())
}

#[test]
fn required_body_must_be_present() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = post_pet(&api, "").unwrap_err();
    assert!(err.to_string().contains("json body is required"));
    Ok(())
}

#[test]
fn invalid_json_body_is_a_client_error() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let err = post_pet(&api, "{name").unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("invalid json body"));
    Ok(())
}

#[test]
fn content_types_are_negotiated() -> Result<()> {
    let api = petstore(ValidatorConfig::default())?;
    let xml = RawRequest::new().with_body("application/xml", "<pet/>");
    let err = api
        .validate_request(HttpMethod::POST, "/pets", &xml)
        .expect("route is declared")
        .unwrap_err();
    assert!(matches!(err, Error::NotAcceptable(_)));
    assert_eq!(api.status_code(&err), 406);

    let text = RawRequest::new().with_body("text/plain; charset=utf-8", "rex");
    let validated = api
        .validate_request(HttpMethod::POST, "/pets", &text)
        .expect("route is declared")?;
    assert_eq!(validated.body, None);
    Ok(())
}
