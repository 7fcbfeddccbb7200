use crate::schema::{Resolver, SchemaError, ValidationError, Validator};
use crate::value::Value;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Error, Debug)]
pub enum CoerceError {
    #[error("{0:?} is not a boolean")]
    Boolean(String),

    #[error(transparent)]
    Integer(#[from] ParseIntError),

    #[error("{value} is out of {format} range")]
    OutOfRange { value: i128, format: &'static str },

    #[error(transparent)]
    Number(#[from] ParseFloatError),

    /// Every member of a `oneOf`/`anyOf` union rejected the value.
    #[error("{value:?} does not match any candidate type")]
    NoCandidate {
        value: String,
        errors: Vec<ValidationError>,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

fn is_primitive(type_name: &str) -> bool {
    matches!(type_name, "string" | "integer" | "number" | "boolean")
}

fn union_branches(schema: &Value) -> Option<&Vec<Value>> {
    if schema.get("type").is_some() {
        return None;
    }
    schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array)
}

/// The type that decides how a parameter is split: the schema's `type` after
/// following `$ref`, `string` for a union of primitives, `object` when undeclared.
pub fn declared_type(validator: &Validator, schema: &Value) -> Result<String, SchemaError> {
    let mut resolver = validator.store().resolver();
    shape_of(&mut resolver, schema, 0)
}

fn shape_of(resolver: &mut Resolver<'_>, schema: &Value, depth: usize) -> Result<String, SchemaError> {
    if depth > MAX_DEPTH {
        return Err(SchemaError::ReferenceCycle(resolver.resolution_scope().to_owned()));
    }
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        let (url, target) = resolver.resolve(reference)?;
        resolver.push_scope(&url);
        let shape = shape_of(resolver, &target, depth + 1);
        resolver.pop_scope()?;
        return shape;
    }
    match schema.get("type") {
        Some(Value::String(name)) => Ok(name.clone()),
        Some(other) => Err(SchemaError::Unsupported(format!(
            "parameter type {} (expected a single type name)",
            other
        ))),
        None => match union_branches(schema) {
            Some(branches) => {
                for branch in branches {
                    let shape = shape_of(resolver, branch, depth + 1)?;
                    if !is_primitive(&shape) {
                        return Err(SchemaError::Unsupported(format!(
                            "parameter union over non-primitive type {}",
                            shape
                        )));
                    }
                }
                Ok("string".to_owned())
            }
            None => Ok("object".to_owned()),
        },
    }
}

/// Converts the string leaves of a style-decoded parameter to the types `schema`
/// declares. Values whose shape disagrees with the schema are left for validation
/// to report.
pub fn coerce(validator: &Validator, schema: &Value, value: Value) -> Result<Value, CoerceError> {
    Coercion {
        validator,
        resolver: validator.store().resolver(),
    }
    .convert(schema, value, 0)
}

struct Coercion<'v> {
    validator: &'v Validator,
    resolver: Resolver<'v>,
}

impl Coercion<'_> {
    fn convert(&mut self, schema: &Value, value: Value, depth: usize) -> Result<Value, CoerceError> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::ReferenceCycle(self.resolver.resolution_scope().to_owned()).into());
        }
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            let (url, target) = self.resolver.resolve(reference)?;
            self.resolver.push_scope(&url);
            let converted = self.convert(&target, value, depth + 1);
            self.resolver.pop_scope()?;
            return converted;
        }
        if let Some(branches) = union_branches(schema) {
            return self.convert_union(branches, value, depth);
        }

        let type_name = match schema.get("type") {
            None => "object",
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(SchemaError::Unsupported(format!(
                    "parameter type {} (expected a single type name)",
                    other
                ))
                .into())
            }
        };

        match (type_name, value) {
            ("string", value) => Ok(value),
            ("boolean", Value::String(raw)) => match raw.to_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(CoerceError::Boolean(raw)),
            },
            ("integer", Value::String(raw)) => {
                let format = schema.get("format").and_then(Value::as_str);
                parse_integer(&raw, format).map(Value::Integer)
            }
            ("number", Value::String(raw)) => Ok(Value::Float(raw.parse()?)),
            ("object", Value::Object(mut object)) => {
                let declared = schema.get("properties").and_then(Value::as_object);
                if let Some(declared) = declared {
                    for (name, subschema) in declared {
                        if let Some(slot) = object.get_mut(name) {
                            let raw = std::mem::take(slot);
                            *slot = self.convert(subschema, raw, depth + 1)?;
                        }
                    }
                }
                if let Some(additional) = schema.get("additionalProperties").filter(|s| s.as_object().is_some()) {
                    for (name, slot) in object.iter_mut() {
                        if declared.is_some_and(|declared| declared.contains_key(name)) {
                            continue;
                        }
                        let raw = std::mem::take(slot);
                        *slot = self.convert(additional, raw, depth + 1)?;
                    }
                }
                Ok(Value::Object(object))
            }
            ("array", Value::Array(items)) => {
                let item_schema = schema
                    .get("items")
                    .filter(|s| s.as_object().is_some())
                    .ok_or_else(|| {
                        SchemaError::Unsupported("array parameters need a single `items` schema".to_owned())
                    })?;
                items
                    .into_iter()
                    .map(|item| self.convert(item_schema, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            ("boolean" | "integer" | "number" | "object" | "array", value) => Ok(value),
            (other, _) => Err(SchemaError::Unsupported(format!(
                "coercing parameters of type {}",
                other
            ))
            .into()),
        }
    }

    /// Tries each union member in order and keeps the first that converts and then
    /// validates cleanly.
    fn convert_union(&mut self, branches: &[Value], value: Value, depth: usize) -> Result<Value, CoerceError> {
        let mut errors = Vec::new();
        for (index, branch) in branches.iter().enumerate() {
            match self.convert(branch, value.clone(), depth + 1) {
                Ok(candidate) => {
                    let mut rejected = self.validator.iter_errors(&candidate, branch)?;
                    if rejected.is_empty() {
                        return Ok(candidate);
                    }
                    errors.append(&mut rejected);
                }
                Err(CoerceError::Schema(fatal)) => return Err(fatal.into()),
                Err(err) => {
                    let mut error = ValidationError::new(err.to_string()).with_cause(err);
                    error.schema_path.push_front(index.into());
                    errors.push(error);
                }
            }
        }
        Err(CoerceError::NoCandidate {
            value: value.to_string(),
            errors,
        })
    }
}

fn parse_integer(raw: &str, format: Option<&str>) -> Result<i64, CoerceError> {
    let parsed: i128 = raw.parse()?;
    let (min, max, format) = match format {
        Some("int32") => (i128::from(i32::MIN), i128::from(i32::MAX), "int32"),
        _ => (i128::from(i64::MIN), i128::from(i64::MAX), "int64"),
    };
    if parsed < min || parsed > max {
        return Err(CoerceError::OutOfRange { value: parsed, format });
    }
    i64::try_from(parsed).map_err(|_| CoerceError::OutOfRange { value: parsed, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DocumentStore;
    use crate::value;
    use std::sync::Arc;

    fn validator(root: Value) -> Validator {
        Validator::new(Arc::new(DocumentStore::new("", root)))
    }

    #[test]
    fn int32_range_is_enforced() {
        let v = validator(Value::Null);
        let schema = value!({"type": "integer", "format": "int32"});
        assert_eq!(coerce(&v, &schema, value!("2147483647")).unwrap(), value!(2147483647));
        assert_eq!(coerce(&v, &schema, value!("-2147483648")).unwrap(), value!(-2147483648));
        assert!(matches!(
            coerce(&v, &schema, value!("2147483648")),
            Err(CoerceError::OutOfRange { format: "int32", .. })
        ));
        assert!(coerce(&v, &schema, value!("-2147483649")).is_err());
    }

    #[test]
    fn unformatted_integers_must_fit_64_bits() {
        let v = validator(Value::Null);
        let schema = value!({"type": "integer"});
        assert_eq!(coerce(&v, &schema, value!("-42")).unwrap(), value!(-42));
        assert!(coerce(&v, &schema, value!("9223372036854775808")).is_err());
        assert!(matches!(coerce(&v, &schema, value!("4.5")), Err(CoerceError::Integer(_))));
    }

    #[test]
    fn booleans_ignore_case() {
        let v = validator(Value::Null);
        let schema = value!({"type": "boolean"});
        assert_eq!(coerce(&v, &schema, value!("TRUE")).unwrap(), value!(true));
        assert_eq!(coerce(&v, &schema, value!("False")).unwrap(), value!(false));
        assert!(matches!(coerce(&v, &schema, value!("yes")), Err(CoerceError::Boolean(_))));
    }

    #[test]
    fn arrays_and_objects_coerce_their_leaves() {
        let v = validator(Value::Null);
        let list = value!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(coerce(&v, &list, value!(["1", "2", "3"])).unwrap(), value!([1, 2, 3]));

        let object = value!({
            "type": "object",
            "properties": {"n": {"type": "number"}},
            "additionalProperties": {"type": "boolean"}
        });
        assert_eq!(
            coerce(&v, &object, value!({"n": "1.5", "flag": "true"})).unwrap(),
            value!({"n": 1.5, "flag": true})
        );
    }

    #[test]
    fn references_are_followed() {
        let v = validator(value!({"components": {"schemas": {"Id": {"type": "integer"}}}}));
        let schema = value!({"$ref": "#/components/schemas/Id"});
        assert_eq!(coerce(&v, &schema, value!("7")).unwrap(), value!(7));
        assert_eq!(declared_type(&v, &schema).unwrap(), "integer");
    }

    #[test]
    fn undeclared_type_is_an_object() {
        let v = validator(Value::Null);
        assert_eq!(declared_type(&v, &value!({})).unwrap(), "object");
        assert_eq!(coerce(&v, &value!({}), value!({"a": "1"})).unwrap(), value!({"a": "1"}));
    }

    #[test]
    fn item_tuples_are_unsupported() {
        let v = validator(Value::Null);
        let schema = value!({"type": "array", "items": [{"type": "integer"}]});
        assert!(matches!(
            coerce(&v, &schema, value!(["1"])),
            Err(CoerceError::Schema(SchemaError::Unsupported(_)))
        ));
    }

    #[test]
    fn unions_take_the_first_clean_candidate() {
        let v = validator(Value::Null);
        let schema = value!({"oneOf": [
            {"type": "integer", "minimum": 10},
            {"type": "boolean"},
            {"type": "string"}
        ]});
        assert_eq!(declared_type(&v, &schema).unwrap(), "string");
        assert_eq!(coerce(&v, &schema, value!("12")).unwrap(), value!(12));
        assert_eq!(coerce(&v, &schema, value!("true")).unwrap(), value!(true));
        assert_eq!(coerce(&v, &schema, value!("3")).unwrap(), value!("3"));
    }

    #[test]
    fn failed_unions_keep_every_candidate_error() {
        let v = validator(Value::Null);
        let schema = value!({"anyOf": [{"type": "integer"}, {"type": "number", "maximum": 1}]});
        match coerce(&v, &schema, value!("2.5")) {
            Err(CoerceError::NoCandidate { errors, .. }) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unions_over_containers_are_unsupported() {
        let v = validator(Value::Null);
        let schema = value!({"oneOf": [{"type": "integer"}, {"type": "array"}]});
        assert!(matches!(declared_type(&v, &schema), Err(SchemaError::Unsupported(_))));
    }
}
