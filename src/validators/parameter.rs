use crate::error::Error;
use crate::params::{coerce, declared_type, deep_object, decode_strategy, CoerceError, Location, QueryMap, Style};
use crate::schema::{SchemaError, ValidationError, ValidationErrors, Validator};
use crate::validators::RawRequest;
use crate::value::Value;
use indexmap::IndexMap;
use tracing::trace;

/// Validator for a single parameter
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    name: String,
    location: Location,
    style: Style,
    explode: bool,
    required: bool,
    allow_empty_value: bool,
    schema: Option<Value>,
}

impl ParameterValidator {
    /// Builds from an OpenAPI parameter object with its `$ref` already resolved.
    pub fn from_object(object: &Value) -> Result<Self, SchemaError> {
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::Malformed("parameter without a name".to_owned()))?
            .to_owned();
        let location: Location = object
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::Malformed(format!("parameter {:?} has no location", name)))?
            .parse()?;
        let style = match object.get("style").and_then(Value::as_str) {
            Some(style) => style.parse()?,
            None => Style::default_for(location),
        };
        let explode = object
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| style.default_explode());

        Ok(Self {
            name,
            location,
            style,
            explode,
            required: object.get("required").and_then(Value::as_bool).unwrap_or(false),
            allow_empty_value: object
                .get("allowEmptyValue")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            schema: object.get("schema").cloned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Identity of a parameter within an operation.
    pub fn key(&self) -> (Location, &str) {
        (self.location, &self.name)
    }

    /// Extracts, decodes, coerces and validates this parameter. `Ok(None)` when an
    /// optional parameter is absent.
    pub fn validate(
        &self,
        validator: &Validator,
        path_params: &IndexMap<String, String>,
        request: &RawRequest,
        queries: &QueryMap,
    ) -> Result<Option<Value>, Error> {
        if self.allow_empty_value {
            return Err(Error::Unsupported(format!(
                "allowEmptyValue on parameter \"{}\"",
                self.name
            )));
        }
        if matches!(
            self.style,
            Style::Matrix | Style::Label | Style::SpaceDelimited | Style::PipeDelimited
        ) {
            return Err(Error::Unsupported(format!(
                "{} style on parameter \"{}\"",
                self.style, self.name
            )));
        }
        let declared = match &self.schema {
            Some(schema) => declared_type(validator, schema)?,
            None => "object".to_owned(),
        };

        let raw = match self.location {
            Location::Path => path_params.get(&self.name).map(|raw| Value::from(raw.as_str())),
            Location::Query => {
                if self.style == Style::Form && self.explode && declared == "object" {
                    return Err(Error::Unsupported(format!(
                        "exploded form object in query parameter \"{}\"",
                        self.name
                    )));
                }
                if self.style == Style::DeepObject {
                    deep_object(&self.name, queries)
                } else if let Some(values) = queries.get(&self.name) {
                    if self.style == Style::Form && self.explode && declared == "array" {
                        Some(Value::Array(values.iter().map(|v| Value::from(v.as_str())).collect()))
                    } else {
                        values.first().map(|v| Value::from(v.as_str()))
                    }
                } else if let Some(default) = self.query_default(validator)? {
                    trace!(parameter = %self.name, "filled query parameter from its default");
                    return Ok(Some(default));
                } else {
                    None
                }
            }
            Location::Header => request.header(&self.name).map(Value::from),
            Location::Cookie => {
                return Err(Error::Unsupported(format!(
                    "cookie parameter \"{}\"",
                    self.name
                )))
            }
        };

        let Some(raw) = raw else {
            if self.required {
                return Err(ValidationError::new(format!(
                    "required parameter \"{}\" is not found in {}",
                    self.name, self.location
                ))
                .into());
            }
            return Ok(None);
        };

        let decoded = match raw {
            Value::String(text) => decode_strategy(self.style, self.explode, &declared)?
                .apply(&text)
                .map_err(|e| {
                    ValidationError::new(format!("invalid style of \"{}\": {}", self.name, e))
                        .with_cause(e)
                        .at(self.name.as_str())
                })?,
            already_structured => already_structured,
        };

        let Some(schema) = &self.schema else {
            return Ok(Some(decoded));
        };
        let coerced = coerce(validator, schema, decoded).map_err(|e| self.coerce_failure(e))?;
        match validator.validate(&coerced, schema) {
            Ok(validated) => Ok(Some(validated.into_instance())),
            Err(Error::Invalid(errors)) => Err(Error::Invalid(self.prefixed(errors.into_vec()))),
            Err(other) => Err(other),
        }
    }

    fn query_default(&self, validator: &Validator) -> Result<Option<Value>, SchemaError> {
        match &self.schema {
            Some(schema) => validator.default_for(schema),
            None => Ok(None),
        }
    }

    fn coerce_failure(&self, error: CoerceError) -> Error {
        match error {
            CoerceError::Schema(fatal) => fatal.into(),
            CoerceError::NoCandidate { value, errors } if !errors.is_empty() => {
                let summary = ValidationError::new(format!(
                    "invalid value of \"{}\": {:?} does not match any candidate type",
                    self.name, value
                ))
                .with_context(errors);
                Error::Invalid(self.prefixed(vec![summary]))
            }
            other => ValidationError::new(format!("invalid value of \"{}\": {}", self.name, other))
                .with_cause(other)
                .at(self.name.as_str())
                .into(),
        }
    }

    /// Roots error paths at the parameter name.
    fn prefixed(&self, errors: Vec<ValidationError>) -> ValidationErrors {
        let errors = errors
            .into_iter()
            .map(|error| error.at(self.name.as_str()))
            .collect();
        ValidationErrors::from_vec(errors)
            .unwrap_or_else(|| ValidationError::new(format!("invalid value of \"{}\"", self.name)).into())
    }
}

/// Validator for all parameters of an operation, in declaration order.
#[derive(Default, Debug, Clone)]
pub struct ParametersValidator {
    parameters: Vec<ParameterValidator>,
}

impl ParametersValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing an earlier one with the same location and name.
    pub fn add_parameter(&mut self, parameter: ParameterValidator) {
        match self.parameters.iter_mut().find(|p| p.key() == parameter.key()) {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterValidator> {
        self.parameters.iter()
    }

    /// Validates every parameter, collecting the input errors of all of them before
    /// failing. Anything other than invalid input aborts immediately.
    pub fn validate(
        &self,
        validator: &Validator,
        path_params: &IndexMap<String, String>,
        request: &RawRequest,
        queries: &QueryMap,
    ) -> Result<IndexMap<String, Value>, Error> {
        let mut values = IndexMap::new();
        let mut errors = Vec::new();
        for parameter in &self.parameters {
            match parameter.validate(validator, path_params, request, queries) {
                Ok(Some(value)) => {
                    values.insert(parameter.name().to_owned(), value);
                }
                Ok(None) => {}
                Err(Error::Invalid(invalid)) => errors.extend(invalid.into_vec()),
                Err(other) => return Err(other),
            }
        }
        match ValidationErrors::from_vec(errors) {
            Some(errors) => Err(Error::Invalid(errors)),
            None => Ok(values),
        }
    }
}
