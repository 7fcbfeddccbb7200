use crate::error::Error;
use crate::schema::error::{PathStep, SchemaError, ValidationError, ValidationErrors};
use crate::schema::formats::{Dialect, FormatRegistry};
use crate::schema::keyword::Keyword;
use crate::schema::keywords;
use crate::schema::merge::overlay;
use crate::schema::patterns::PatternCache;
use crate::schema::resolver::{DocumentStore, Resolver};
use crate::value::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::trace;

/// Nesting limit for default lookups through `$ref`/`allOf` chains.
const MAX_DEFAULT_DEPTH: usize = 64;

/// Result of validating one instance against one schema node.
///
/// `instance` stays borrowed when nothing below rewrote it. `schema` records the parts
/// of the schema that were actually applied.
#[derive(Debug, Clone)]
pub struct Validated<'i> {
    pub instance: Cow<'i, Value>,
    pub schema: Value,
}

impl Validated<'_> {
    pub fn into_instance(self) -> Value {
        self.instance.into_owned()
    }

    pub fn is_transformed(&self) -> bool {
        matches!(self.instance, Cow::Owned(_))
    }
}

/// Schema validator shared across requests.
///
/// Holds only immutable or concurrency-safe state; every call to [`Validator::validate`]
/// runs in a fresh [`Session`] with its own scope stack and error list.
#[derive(Debug, Clone)]
pub struct Validator {
    store: Arc<DocumentStore>,
    formats: Arc<FormatRegistry>,
    patterns: Arc<PatternCache>,
    fill_by_default: bool,
}

impl Validator {
    /// Validator over `store` using the OpenAPI 3 format set.
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            formats: Arc::new(Dialect::Oas3.formats()),
            patterns: Arc::new(PatternCache::default()),
            fill_by_default: false,
        }
    }

    pub fn with_dialect(self, dialect: Dialect) -> Self {
        self.with_formats(dialect.formats())
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Arc::new(formats);
        self
    }

    /// Fill missing properties from declared defaults.
    pub fn fill_by_default(mut self, enabled: bool) -> Self {
        self.fill_by_default = enabled;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    pub fn fills_by_default(&self) -> bool {
        self.fill_by_default
    }

    /// Validates `instance` against `schema`, collecting every violation.
    pub fn validate<'i>(&self, instance: &'i Value, schema: &Value) -> Result<Validated<'i>, Error> {
        let mut errors = Vec::new();
        let validated = self
            .session()
            .descend(instance, schema, &mut errors, None, None)?;
        match ValidationErrors::from_vec(errors) {
            Some(errors) => Err(Error::Invalid(errors)),
            None => Ok(validated),
        }
    }

    /// All violations of `schema` by `instance`, in evaluation order.
    pub fn iter_errors(&self, instance: &Value, schema: &Value) -> Result<Vec<ValidationError>, SchemaError> {
        let mut errors = Vec::new();
        self.session()
            .descend(instance, schema, &mut errors, None, None)?;
        Ok(errors)
    }

    pub fn is_valid(&self, instance: &Value, schema: &Value) -> Result<bool, SchemaError> {
        self.iter_errors(instance, schema).map(|errors| errors.is_empty())
    }

    /// The default declared by `schema`, if default-filling is enabled and exactly one
    /// applies. String defaults go through the schema's format coercion.
    pub fn default_for(&self, schema: &Value) -> Result<Option<Value>, SchemaError> {
        let mut session = self.session();
        match session.default_for(schema)? {
            Some(default) if !default.is_container() => {
                session.coerce_scalar_default(default, schema).map(Some)
            }
            other => Ok(other),
        }
    }

    pub(crate) fn session(&self) -> Session<'_> {
        Session {
            validator: self,
            resolver: self.store.resolver(),
            active_refs: Vec::new(),
        }
    }
}

/// Mutable state of one top-level validation call.
pub(crate) struct Session<'v> {
    pub(crate) validator: &'v Validator,
    pub(crate) resolver: Resolver<'v>,
    /// `$ref` targets currently being evaluated, paired with the instance address.
    active_refs: Vec<(String, usize)>,
}

impl<'v> Session<'v> {
    /// Validates `instance` against `schema`, prefixing the errors it produces with
    /// the given instance and schema path steps.
    pub(crate) fn descend<'i>(
        &mut self,
        instance: &'i Value,
        schema: &Value,
        errors: &mut Vec<ValidationError>,
        path: Option<PathStep>,
        schema_path: Option<PathStep>,
    ) -> Result<Validated<'i>, SchemaError> {
        let offset = errors.len();
        let validated = self.validate_node(instance, schema, errors)?;
        for error in &mut errors[offset..] {
            if let Some(step) = &path {
                error.path.push_front(step.clone());
            }
            if let Some(step) = &schema_path {
                error.schema_path.push_front(step.clone());
            }
        }
        Ok(validated)
    }

    fn validate_node<'i>(
        &mut self,
        instance: &'i Value,
        schema: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> Result<Validated<'i>, SchemaError> {
        let node = schema.as_object().ok_or_else(|| {
            SchemaError::Malformed(format!("schema must be an object, found {}", schema.kind()))
        })?;

        let scope = node.get("id").and_then(Value::as_str);
        if let Some(scope) = scope {
            self.resolver.push_scope(scope);
        }
        let result = self.apply_keywords(instance, node, errors);
        if scope.is_some() {
            self.resolver.pop_scope()?;
        }
        result
    }

    fn apply_keywords<'i>(
        &mut self,
        instance: &'i Value,
        node: &Map,
        errors: &mut Vec<ValidationError>,
    ) -> Result<Validated<'i>, SchemaError> {
        // A `$ref` node ignores its siblings.
        if let Some(reference) = node.get(Keyword::Ref.name()) {
            let offset = errors.len();
            let applied = keywords::evaluate(self, Keyword::Ref, instance, reference, node, errors)?;
            tag_errors(&mut errors[offset..], Keyword::Ref);
            return Ok(Validated {
                instance: applied.instance.map_or(Cow::Borrowed(instance), Cow::Owned),
                schema: applied.schema.unwrap_or_else(|| reference.clone()),
            });
        }

        if instance.is_null() && node.get("nullable").and_then(Value::as_bool) == Some(true) {
            return Ok(Validated {
                instance: Cow::Borrowed(instance),
                schema: Value::Object(Map::new()),
            });
        }

        // Every keyword sees the instance as received; rewrites are layered afterwards.
        let mut rewritten: Option<Value> = None;
        let mut applied_schema = Map::new();
        for keyword in Keyword::ORDER {
            let Some(value) = node.get(keyword.name()) else {
                continue;
            };
            let offset = errors.len();
            let applied = keywords::evaluate(self, keyword, instance, value, node, errors)?;
            tag_errors(&mut errors[offset..], keyword);
            if let Some(later) = applied.instance {
                rewritten = Some(match rewritten.take() {
                    Some(earlier) => overlay(instance, earlier, later),
                    None => later,
                });
            }
            applied_schema.insert(
                keyword.name().to_owned(),
                applied.schema.unwrap_or_else(|| value.clone()),
            );
        }

        Ok(Validated {
            instance: rewritten.map_or(Cow::Borrowed(instance), Cow::Owned),
            schema: Value::Object(applied_schema),
        })
    }

    /// Resolves `reference` against the active scope and validates against its target
    /// with the target's scope pushed. The scope is popped on every exit path.
    pub(crate) fn follow_ref<'i>(
        &mut self,
        instance: &'i Value,
        reference: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Result<Validated<'i>, SchemaError> {
        let (url, resolved) = self.resolver.resolve(reference)?;
        let key = (url, instance as *const Value as usize);
        if self.active_refs.contains(&key) {
            return Err(SchemaError::ReferenceCycle(key.0));
        }
        trace!(url = %key.0, "following reference");

        self.resolver.push_scope(&key.0);
        self.active_refs.push(key);
        let result = self.descend(instance, &resolved, errors, None, None);
        self.active_refs.pop();
        self.resolver.pop_scope()?;
        result
    }

    /// The default a missing property takes, when default-filling is enabled.
    pub(crate) fn default_for(&mut self, schema: &Value) -> Result<Option<Value>, SchemaError> {
        if !self.validator.fill_by_default {
            return Ok(None);
        }
        self.find_default(schema, 0)
    }

    fn find_default(&mut self, schema: &Value, depth: usize) -> Result<Option<Value>, SchemaError> {
        if depth > MAX_DEFAULT_DEPTH {
            return Err(SchemaError::ReferenceCycle(
                self.resolver.resolution_scope().to_owned(),
            ));
        }
        let Some(node) = schema.as_object() else {
            return Ok(None);
        };

        if let Some(reference) = node.get(Keyword::Ref.name()).and_then(Value::as_str) {
            let (url, resolved) = self.resolver.resolve(reference)?;
            self.resolver.push_scope(&url);
            let result = self.find_default(&resolved, depth + 1);
            self.resolver.pop_scope()?;
            return result;
        }

        if let Some(default) = node.get("default") {
            return Ok(Some(default.clone()));
        }

        // Only an unambiguous default from exactly one allOf branch counts.
        if let Some(branches) = node.get(Keyword::AllOf.name()).and_then(Value::as_array) {
            let mut found = Vec::new();
            for branch in branches {
                if let Some(default) = self.find_default(branch, depth + 1)? {
                    found.push(default);
                }
            }
            if found.len() == 1 {
                return Ok(found.pop());
            }
        }
        Ok(None)
    }

    /// Scalar defaults are trusted as-is. A string default is still run through the
    /// declared format's coercion so it takes the same typed shape as parsed input.
    pub(crate) fn coerce_scalar_default(&mut self, default: Value, schema: &Value) -> Result<Value, SchemaError> {
        let Some(format) = self.declared_format(schema, 0)? else {
            return Ok(default);
        };
        match self.validator.formats.check(&format, &default) {
            Ok(Some(coerced)) => Ok(coerced),
            Ok(None) | Err(_) => Ok(default),
        }
    }

    fn declared_format(&mut self, schema: &Value, depth: usize) -> Result<Option<String>, SchemaError> {
        if depth > MAX_DEFAULT_DEPTH {
            return Err(SchemaError::ReferenceCycle(
                self.resolver.resolution_scope().to_owned(),
            ));
        }
        if let Some(reference) = schema.get(Keyword::Ref.name()).and_then(Value::as_str) {
            let (url, resolved) = self.resolver.resolve(reference)?;
            self.resolver.push_scope(&url);
            let result = self.declared_format(&resolved, depth + 1);
            self.resolver.pop_scope()?;
            return result;
        }
        Ok(schema
            .get(Keyword::Format.name())
            .and_then(Value::as_str)
            .map(str::to_owned))
    }
}

fn tag_errors(errors: &mut [ValidationError], keyword: Keyword) {
    for error in errors {
        error.schema_path.push_front(PathStep::Key(keyword.name().to_owned()));
        if error.keyword.is_none() {
            error.keyword = Some(keyword);
        }
    }
}
