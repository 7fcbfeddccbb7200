//! One evaluator per schema keyword.
//!
//! Evaluators push ordinary violations onto the caller's error list and keep going;
//! only broken schemas and unsupported features come back as `Err`. A keyword that
//! does not apply to the instance's runtime type is a no-op.

use crate::schema::error::{PathStep, SchemaError, ValidationError};
use crate::schema::keyword::Keyword;
use crate::schema::merge::merge_all;
use crate::schema::validator::{Session, Validated};
use crate::value::{Map, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// What a keyword contributed: a rewritten instance and the schema fragment it applied.
/// `None` means "unchanged" and "the keyword's own value" respectively.
#[derive(Debug, Default)]
pub(crate) struct Applied {
    pub(crate) instance: Option<Value>,
    pub(crate) schema: Option<Value>,
}

impl Applied {
    fn unchanged() -> Self {
        Self::default()
    }
}

pub(crate) fn evaluate(
    session: &mut Session<'_>,
    keyword: Keyword,
    instance: &Value,
    value: &Value,
    node: &Map,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    match keyword {
        Keyword::Ref => reference(session, instance, value, errors),
        Keyword::Type => type_(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Enum => enum_(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::MinLength => min_length(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::MaxLength => max_length(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Pattern => pattern(session, instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Minimum => minimum(instance, value, node, errors).map(|()| Applied::unchanged()),
        Keyword::Maximum => maximum(instance, value, node, errors).map(|()| Applied::unchanged()),
        Keyword::MultipleOf => multiple_of(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Properties => properties(session, instance, value, errors),
        Keyword::PatternProperties => pattern_properties(session, instance, value, errors),
        Keyword::AdditionalProperties => additional_properties(session, instance, value, node, errors),
        Keyword::Required => required(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::MinProperties => min_properties(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::MaxProperties => max_properties(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Dependencies => Err(SchemaError::Unsupported(
            "the dependencies keyword".to_owned(),
        )),
        Keyword::Items => items(session, instance, value, errors),
        Keyword::AdditionalItems => additional_items(session, instance, value, node, errors),
        Keyword::MinItems => min_items(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::MaxItems => max_items(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::UniqueItems => unique_items(instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::AllOf => all_of(session, instance, value, errors),
        Keyword::AnyOf => any_of(session, instance, value, errors),
        Keyword::OneOf => one_of(session, instance, value, errors),
        Keyword::Not => not(session, instance, value, errors).map(|()| Applied::unchanged()),
        Keyword::Format => format(session, instance, value, errors),
    }
}

fn malformed(keyword: Keyword, expected: &str) -> SchemaError {
    SchemaError::Malformed(format!("{} must be {}", keyword, expected))
}

fn owned(instance: Cow<'_, Value>) -> Option<Value> {
    match instance {
        Cow::Owned(value) => Some(value),
        Cow::Borrowed(_) => None,
    }
}

/// Whether `instance` is of the named primitive type.
fn is_type(instance: &Value, name: &str) -> Result<bool, SchemaError> {
    Ok(match name {
        "array" => matches!(instance, Value::Array(_)),
        "object" => matches!(instance, Value::Object(_)),
        "null" => instance.is_null(),
        "boolean" => matches!(instance, Value::Bool(_)),
        // Booleans never count as numbers or integers.
        "integer" => matches!(instance, Value::Integer(_)),
        "number" => matches!(instance, Value::Integer(_) | Value::Float(_)),
        "string" => matches!(instance, Value::String(_)) || instance.is_typed_string(),
        other => return Err(SchemaError::UnknownType(other.to_owned())),
    })
}

fn reference(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let reference = value
        .as_str()
        .ok_or_else(|| malformed(Keyword::Ref, "a string"))?;
    let Validated { instance, schema } = session.follow_ref(instance, reference, errors)?;
    Ok(Applied {
        instance: owned(instance),
        schema: Some(schema),
    })
}

fn type_(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let types: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names
            .iter()
            .map(|name| name.as_str().ok_or_else(|| malformed(Keyword::Type, "a string or an array of strings")))
            .collect::<Result<_, _>>()?,
        _ => return Err(malformed(Keyword::Type, "a string or an array of strings")),
    };
    for name in &types {
        if is_type(instance, name)? {
            return Ok(());
        }
    }
    errors.push(ValidationError::new(format!(
        "{} is not of type {}",
        instance,
        types.join(", ")
    )));
    Ok(())
}

fn enum_(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let options = value
        .as_array()
        .ok_or_else(|| malformed(Keyword::Enum, "an array"))?;
    if !options.contains(instance) {
        errors.push(ValidationError::new(format!("{} is not one of {}", instance, value)));
    }
    Ok(())
}

fn limit(keyword: Keyword, value: &Value) -> Result<usize, SchemaError> {
    value
        .as_u64()
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        .ok_or_else(|| malformed(keyword, "a non-negative integer"))
}

fn min_length(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let min = limit(Keyword::MinLength, value)?;
    if let Value::String(s) = instance {
        if s.chars().count() < min {
            errors.push(ValidationError::new(format!("{} is too short", instance)));
        }
    }
    Ok(())
}

fn max_length(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let max = limit(Keyword::MaxLength, value)?;
    if let Value::String(s) = instance {
        if s.chars().count() > max {
            errors.push(ValidationError::new(format!("{} is too long", instance)));
        }
    }
    Ok(())
}

fn pattern(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<(), SchemaError> {
    let source = value
        .as_str()
        .ok_or_else(|| malformed(Keyword::Pattern, "a string"))?;
    if let Value::String(s) = instance {
        if !session.validator.patterns().get(source)?.is_match(s) {
            errors.push(ValidationError::new(format!("{} does not match {:?}", instance, source)));
        }
    }
    Ok(())
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn minimum(
    instance: &Value,
    value: &Value,
    node: &Map,
    errors: &mut Vec<ValidationError>,
) -> Result<(), SchemaError> {
    if !value.is_number() {
        return Err(malformed(Keyword::Minimum, "a number"));
    }
    if !instance.is_number() {
        return Ok(());
    }
    let exclusive = node.get("exclusiveMinimum").and_then(Value::as_bool) == Some(true);
    let ordering = compare(instance, value);
    let (failed, relation) = if exclusive {
        (ordering != Some(Ordering::Greater), "less than or equal to")
    } else {
        (ordering == Some(Ordering::Less), "less than")
    };
    if failed {
        errors.push(ValidationError::new(format!(
            "{} is {} the minimum of {}",
            instance, relation, value
        )));
    }
    Ok(())
}

fn maximum(
    instance: &Value,
    value: &Value,
    node: &Map,
    errors: &mut Vec<ValidationError>,
) -> Result<(), SchemaError> {
    if !value.is_number() {
        return Err(malformed(Keyword::Maximum, "a number"));
    }
    if !instance.is_number() {
        return Ok(());
    }
    let exclusive = node.get("exclusiveMaximum").and_then(Value::as_bool) == Some(true);
    let ordering = compare(instance, value);
    let (failed, relation) = if exclusive {
        (ordering != Some(Ordering::Less), "greater than or equal to")
    } else {
        (ordering == Some(Ordering::Greater), "greater than")
    };
    if failed {
        errors.push(ValidationError::new(format!(
            "{} is {} the maximum of {}",
            instance, relation, value
        )));
    }
    Ok(())
}

fn multiple_of(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let failed = match (value, instance) {
        (Value::Integer(0), _) => return Err(malformed(Keyword::MultipleOf, "non-zero")),
        (Value::Float(divisor), _) if *divisor == 0.0 => {
            return Err(malformed(Keyword::MultipleOf, "non-zero"))
        }
        (Value::Integer(_) | Value::Float(_), Value::Bool(_)) => false,
        (Value::Float(divisor), _) => match instance.as_f64() {
            Some(n) => {
                let quotient = n / divisor;
                quotient.trunc() != quotient
            }
            None => false,
        },
        (Value::Integer(divisor), Value::Integer(n)) => n.checked_rem(*divisor).is_some_and(|r| r != 0),
        (Value::Integer(divisor), Value::Float(n)) => n % (*divisor as f64) != 0.0,
        (Value::Integer(_), _) => false,
        _ => return Err(malformed(Keyword::MultipleOf, "a number")),
    };
    if failed {
        errors.push(ValidationError::new(format!(
            "{} is not a multiple of {}",
            instance, value
        )));
    }
    Ok(())
}

fn properties(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let declared = value
        .as_object()
        .ok_or_else(|| malformed(Keyword::Properties, "an object"))?;
    let Some(object) = instance.as_object() else {
        return Ok(Applied::unchanged());
    };

    let mut updated: Option<Map> = None;
    let mut applied = Map::new();
    for (name, subschema) in declared {
        let step = || Some(PathStep::Key(name.clone()));
        if let Some(child) = object.get(name) {
            let out = session.descend(child, subschema, errors, step(), step())?;
            if let Some(rewritten) = owned(out.instance) {
                updated
                    .get_or_insert_with(|| object.clone())
                    .insert(name.clone(), rewritten);
            }
            applied.insert(name.clone(), out.schema);
            continue;
        }

        // Missing property: an explicit null counts as present and never gets here.
        match session.default_for(subschema)? {
            Some(default) if default.is_container() => {
                let out = session.descend(&default, subschema, errors, step(), step())?;
                let schema = out.schema;
                let filled = out.instance.into_owned();
                updated
                    .get_or_insert_with(|| object.clone())
                    .insert(name.clone(), filled);
                applied.insert(name.clone(), schema);
            }
            Some(default) => {
                let filled = session.coerce_scalar_default(default, subschema)?;
                updated
                    .get_or_insert_with(|| object.clone())
                    .insert(name.clone(), filled);
                applied.insert(name.clone(), subschema.clone());
            }
            None => {
                applied.insert(name.clone(), subschema.clone());
            }
        }
    }

    Ok(Applied {
        instance: updated.map(Value::Object),
        schema: Some(Value::Object(applied)),
    })
}

fn pattern_properties(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let patterns = value
        .as_object()
        .ok_or_else(|| malformed(Keyword::PatternProperties, "an object"))?;
    let Some(object) = instance.as_object() else {
        return Ok(Applied::unchanged());
    };

    let mut updated: Option<Map> = None;
    for (source, subschema) in patterns {
        let regex = session.validator.patterns().get(source)?;
        for (name, child) in object {
            if !regex.is_match(name) {
                continue;
            }
            let out = session.descend(
                child,
                subschema,
                errors,
                Some(PathStep::Key(name.clone())),
                Some(PathStep::Key(source.clone())),
            )?;
            if let Some(rewritten) = owned(out.instance) {
                updated
                    .get_or_insert_with(|| object.clone())
                    .insert(name.clone(), rewritten);
            }
        }
    }

    Ok(Applied {
        instance: updated.map(Value::Object),
        schema: None,
    })
}

fn additional_properties(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    node: &Map,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    if !matches!(value, Value::Object(_) | Value::Bool(_)) {
        return Err(malformed(Keyword::AdditionalProperties, "a schema or a boolean"));
    }
    let Some(object) = instance.as_object() else {
        return Ok(Applied::unchanged());
    };

    let declared = node.get(Keyword::Properties.name()).and_then(Value::as_object);
    let patterns = node
        .get(Keyword::PatternProperties.name())
        .and_then(Value::as_object)
        .filter(|patterns| !patterns.is_empty());
    let any_pattern = match patterns {
        Some(patterns) => {
            let joined = patterns.keys().map(String::as_str).collect::<Vec<_>>().join("|");
            Some(session.validator.patterns().get(&joined)?)
        }
        None => None,
    };

    let extras: Vec<&String> = object
        .keys()
        .filter(|name| !declared.is_some_and(|declared| declared.contains_key(*name)))
        .filter(|name| !any_pattern.as_ref().is_some_and(|regex| regex.is_match(name)))
        .collect();

    match value {
        Value::Object(_) => {
            let mut updated: Option<Map> = None;
            for name in extras {
                let out = session.descend(
                    &object[name],
                    value,
                    errors,
                    Some(PathStep::Key(name.clone())),
                    None,
                )?;
                if let Some(rewritten) = owned(out.instance) {
                    updated
                        .get_or_insert_with(|| object.clone())
                        .insert(name.clone(), rewritten);
                }
            }
            Ok(Applied {
                instance: updated.map(Value::Object),
                schema: None,
            })
        }
        Value::Bool(false) if !extras.is_empty() => {
            let message = match patterns {
                Some(patterns) => {
                    let mut sources: Vec<&String> = patterns.keys().collect();
                    sources.sort();
                    let mut extras = extras;
                    extras.sort();
                    format!(
                        "{} do not match any of the regexes: {}",
                        quoted(&extras),
                        quoted(&sources)
                    )
                }
                None => format!(
                    "Additional properties are not allowed ({} were unexpected)",
                    quoted(&extras)
                ),
            };
            errors.push(ValidationError::new(message));
            Ok(Applied::unchanged())
        }
        _ => Ok(Applied::unchanged()),
    }
}

fn quoted(names: &[&String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn required(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let names = value
        .as_array()
        .ok_or_else(|| malformed(Keyword::Required, "an array of strings"))?;
    let Some(object) = instance.as_object() else {
        return Ok(());
    };
    for name in names {
        let name = name
            .as_str()
            .ok_or_else(|| malformed(Keyword::Required, "an array of strings"))?;
        if !object.contains_key(name) {
            errors.push(ValidationError::new(format!("'{}' is a required property", name)));
        }
    }
    Ok(())
}

fn min_properties(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let min = limit(Keyword::MinProperties, value)?;
    if let Value::Object(object) = instance {
        if object.len() < min {
            errors.push(ValidationError::new(format!(
                "{} does not have enough properties",
                instance
            )));
        }
    }
    Ok(())
}

fn max_properties(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let max = limit(Keyword::MaxProperties, value)?;
    if let Value::Object(object) = instance {
        if object.len() > max {
            errors.push(ValidationError::new(format!("{} has too many properties", instance)));
        }
    }
    Ok(())
}

fn items(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    if !matches!(value, Value::Object(_) | Value::Array(_)) {
        return Err(malformed(Keyword::Items, "a schema or an array of schemas"));
    }
    let Some(elements) = instance.as_array() else {
        return Ok(Applied::unchanged());
    };

    let mut updated: Option<Vec<Value>> = None;
    let schema = match value {
        Value::Array(schemas) => {
            // Tuple form: only the overlapping prefix is checked here.
            let mut applied = Vec::with_capacity(schemas.len());
            for (index, (element, subschema)) in elements.iter().zip(schemas).enumerate() {
                let out = session.descend(
                    element,
                    subschema,
                    errors,
                    Some(PathStep::Index(index)),
                    Some(PathStep::Index(index)),
                )?;
                if let Some(rewritten) = owned(out.instance) {
                    updated.get_or_insert_with(|| elements.clone())[index] = rewritten;
                }
                applied.push(out.schema);
            }
            applied.extend(schemas.iter().skip(elements.len()).cloned());
            Some(Value::Array(applied))
        }
        _ => {
            let mut last = None;
            for (index, element) in elements.iter().enumerate() {
                let out = session.descend(element, value, errors, Some(PathStep::Index(index)), None)?;
                if let Some(rewritten) = owned(out.instance) {
                    updated.get_or_insert_with(|| elements.clone())[index] = rewritten;
                }
                last = Some(out.schema);
            }
            last
        }
    };

    Ok(Applied {
        instance: updated.map(Value::Array),
        schema,
    })
}

fn additional_items(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    node: &Map,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    if !matches!(value, Value::Object(_) | Value::Bool(_)) {
        return Err(malformed(Keyword::AdditionalItems, "a schema or a boolean"));
    }
    let Some(elements) = instance.as_array() else {
        return Ok(Applied::unchanged());
    };
    // Only meaningful next to the tuple form of `items`.
    let Some(tuple) = node.get(Keyword::Items.name()).and_then(Value::as_array) else {
        return Ok(Applied::unchanged());
    };
    let extras = elements.get(tuple.len()..).unwrap_or_default();

    match value {
        Value::Object(_) => {
            let mut updated: Option<Vec<Value>> = None;
            for (offset, element) in extras.iter().enumerate() {
                let index = tuple.len() + offset;
                let out = session.descend(element, value, errors, Some(PathStep::Index(index)), None)?;
                if let Some(rewritten) = owned(out.instance) {
                    updated.get_or_insert_with(|| elements.clone())[index] = rewritten;
                }
            }
            Ok(Applied {
                instance: updated.map(Value::Array),
                schema: None,
            })
        }
        Value::Bool(false) if !extras.is_empty() => {
            let unexpected = extras
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(ValidationError::new(format!(
                "Additional items are not allowed ({} were unexpected)",
                unexpected
            )));
            Ok(Applied::unchanged())
        }
        _ => Ok(Applied::unchanged()),
    }
}

fn min_items(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let min = limit(Keyword::MinItems, value)?;
    if let Value::Array(elements) = instance {
        if elements.len() < min {
            errors.push(ValidationError::new(format!("{} is too short", instance)));
        }
    }
    Ok(())
}

fn max_items(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let max = limit(Keyword::MaxItems, value)?;
    if let Value::Array(elements) = instance {
        if elements.len() > max {
            errors.push(ValidationError::new(format!("{} is too long", instance)));
        }
    }
    Ok(())
}

fn unique_items(instance: &Value, value: &Value, errors: &mut Vec<ValidationError>) -> Result<(), SchemaError> {
    let enabled = value
        .as_bool()
        .ok_or_else(|| malformed(Keyword::UniqueItems, "a boolean"))?;
    if !enabled {
        return Ok(());
    }
    if let Value::Array(elements) = instance {
        let duplicated = elements
            .iter()
            .enumerate()
            .any(|(i, element)| elements[i + 1..].contains(element));
        if duplicated {
            errors.push(ValidationError::new(format!("{} has non-unique elements", instance)));
        }
    }
    Ok(())
}

fn branches(keyword: Keyword, value: &Value) -> Result<&Vec<Value>, SchemaError> {
    value
        .as_array()
        .ok_or_else(|| malformed(keyword, "an array of schemas"))
}

fn all_of(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let branches = branches(Keyword::AllOf, value)?;
    if branches.is_empty() {
        return Ok(Applied::unchanged());
    }

    let mut results = Vec::with_capacity(branches.len());
    for (index, branch) in branches.iter().enumerate() {
        results.push(session.descend(instance, branch, errors, None, Some(PathStep::Index(index)))?);
    }
    Ok(combine(results))
}

fn any_of(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let branches = branches(Keyword::AnyOf, value)?;

    let mut passing = Vec::new();
    let mut context = Vec::new();
    for (index, branch) in branches.iter().enumerate() {
        let mut local = Vec::new();
        let out = session.descend(instance, branch, &mut local, None, Some(PathStep::Index(index)))?;
        if local.is_empty() {
            passing.push(out);
        } else {
            context.append(&mut local);
        }
    }

    if passing.is_empty() {
        errors.push(
            ValidationError::new(format!(
                "{} is not valid under any of the given schemas",
                instance
            ))
            .with_context(context),
        );
        return Ok(Applied::unchanged());
    }
    Ok(combine(passing))
}

fn one_of(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let branches = branches(Keyword::OneOf, value)?;

    let mut passing = Vec::new();
    let mut context = Vec::new();
    for (index, branch) in branches.iter().enumerate() {
        let mut local = Vec::new();
        let out = session.descend(instance, branch, &mut local, None, Some(PathStep::Index(index)))?;
        if local.is_empty() {
            passing.push((index, out));
        } else {
            context.append(&mut local);
        }
    }

    match passing.len() {
        1 => {
            let (_, Validated { instance, schema }) = passing.remove(0);
            Ok(Applied {
                instance: owned(instance),
                schema: Some(schema),
            })
        }
        0 => {
            errors.push(
                ValidationError::new(format!(
                    "{} is not valid under any of the given schemas",
                    instance
                ))
                .with_context(context),
            );
            Ok(Applied::unchanged())
        }
        _ => {
            let matched = passing
                .iter()
                .map(|(index, _)| branches[*index].to_string())
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(ValidationError::new(format!(
                "{} is valid under each of {}",
                instance, matched
            )));
            Ok(Applied::unchanged())
        }
    }
}

/// Deep-merges branch results in order. The merge only runs when a branch rewrote
/// the instance, so untouched instances keep their identity.
fn combine(results: Vec<Validated<'_>>) -> Applied {
    let rewritten = results.iter().any(Validated::is_transformed);
    let instance = if rewritten {
        merge_all(results.iter().map(|result| &*result.instance))
    } else {
        None
    };
    Applied {
        instance,
        schema: Some(Value::Array(
            results.into_iter().map(|result| result.schema).collect(),
        )),
    }
}

fn not(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<(), SchemaError> {
    let mut local = Vec::new();
    session.descend(instance, value, &mut local, None, None)?;
    if local.is_empty() {
        errors.push(ValidationError::new(format!(
            "{} is not allowed for {}",
            value, instance
        )));
    }
    Ok(())
}

fn format(
    session: &mut Session<'_>,
    instance: &Value,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) -> Result<Applied, SchemaError> {
    let name = value
        .as_str()
        .ok_or_else(|| malformed(Keyword::Format, "a string"))?;
    match session.validator.formats().check(name, instance) {
        Ok(coerced) => Ok(Applied {
            instance: coerced,
            schema: None,
        }),
        Err(cause) => {
            errors.push(
                ValidationError::new(format!("{} is not a {}", instance, name)).with_cause(cause),
            );
            Ok(Applied::unchanged())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::error::SchemaError;
    use crate::schema::resolver::DocumentStore;
    use crate::schema::validator::Validator;
    use crate::value;
    use crate::value::Value;
    use std::sync::Arc;

    fn validator() -> Validator {
        Validator::new(Arc::new(DocumentStore::new("", Value::Null)))
    }

    fn messages(instance: Value, schema: Value) -> Vec<String> {
        validator()
            .iter_errors(&instance, &schema)
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[test]
    fn booleans_are_not_integers() {
        assert_eq!(messages(value!(true), value!({"type": "integer"})), vec!["true is not of type integer"]);
        assert_eq!(messages(value!(false), value!({"type": ["number", "string"]})).len(), 1);
        assert!(messages(value!(1.5), value!({"type": "number"})).is_empty());
    }

    #[test]
    fn unknown_type_is_fatal() {
        let err = validator()
            .iter_errors(&value!(1), &value!({"type": "decimal"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(name) if name == "decimal"));
    }

    #[test]
    fn dependencies_fail_closed() {
        let err = validator()
            .iter_errors(&value!({}), &value!({"dependencies": {"a": ["b"]}}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unsupported(_)));
    }

    #[test]
    fn size_keywords_ignore_other_types() {
        let schema = value!({"minLength": 3, "minItems": 2, "minProperties": 1, "maximum": 0});
        assert!(messages(value!(true), schema.clone()).is_empty());
        assert_eq!(messages(value!("ab"), schema.clone()), vec!["\"ab\" is too short"]);
        assert_eq!(messages(value!([1]), schema).len(), 1);
    }

    #[test]
    fn string_length_counts_characters() {
        assert!(messages(value!("日本"), value!({"maxLength": 2})).is_empty());
    }

    #[test]
    fn exclusive_bounds_are_boolean_modifiers() {
        let inclusive = value!({"minimum": 5, "maximum": 10});
        assert!(messages(value!(5), inclusive.clone()).is_empty());
        assert!(messages(value!(10), inclusive).is_empty());

        let exclusive = value!({"minimum": 5, "exclusiveMinimum": true, "maximum": 10, "exclusiveMaximum": true});
        assert_eq!(
            messages(value!(5), exclusive.clone()),
            vec!["5 is less than or equal to the minimum of 5"]
        );
        assert_eq!(
            messages(value!(10), exclusive),
            vec!["10 is greater than or equal to the maximum of 10"]
        );
    }

    #[test]
    fn multiple_of_handles_integer_and_float_divisors() {
        assert!(messages(value!(10), value!({"multipleOf": 5})).is_empty());
        assert_eq!(messages(value!(7), value!({"multipleOf": 5})).len(), 1);
        assert!(messages(value!(7.5), value!({"multipleOf": 2.5})).is_empty());
        assert_eq!(messages(value!(7.4), value!({"multipleOf": 2.5})).len(), 1);
    }

    #[test]
    fn enum_and_unique_items_compare_by_value() {
        assert!(messages(value!(1.0), value!({"enum": [1, "a"]})).is_empty());
        assert_eq!(messages(value!([1, 1.0]), value!({"uniqueItems": true})).len(), 1);
        assert!(messages(value!([1, true]), value!({"uniqueItems": true})).is_empty());
    }

    #[test]
    fn required_checks_presence_not_value() {
        assert!(messages(value!({"a": null}), value!({"required": ["a"]})).is_empty());
        assert_eq!(
            messages(value!({}), value!({"required": ["a", "b"]})),
            vec!["'a' is a required property", "'b' is a required property"]
        );
    }

    #[test]
    fn additional_properties_respects_patterns() {
        let schema = value!({
            "properties": {"id": {}},
            "patternProperties": {"^x-": {"type": "string"}},
            "additionalProperties": false
        });
        assert!(messages(value!({"id": 1, "x-a": "s"}), schema.clone()).is_empty());
        assert_eq!(
            messages(value!({"id": 1, "x-a": 2, "zz": 1, "aa": 2}), schema),
            vec![
                "2 is not of type string",
                "'aa', 'zz' do not match any of the regexes: '^x-'"
            ]
        );
        assert_eq!(
            messages(value!({"b": 1, "c": 2}), value!({"additionalProperties": false})),
            vec!["Additional properties are not allowed ('b', 'c' were unexpected)"]
        );
    }

    #[test]
    fn additional_properties_schema_validates_extras() {
        let schema = value!({"properties": {"a": {}}, "additionalProperties": {"type": "integer"}});
        let errors = validator()
            .iter_errors(&value!({"a": "x", "b": "y"}), &schema)
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pointer(), "/b");
    }

    #[test]
    fn tuple_items_and_additional_items() {
        let schema = value!({"items": [{"type": "integer"}, {"type": "string"}], "additionalItems": false});
        assert!(messages(value!([1]), schema.clone()).is_empty());
        assert!(messages(value!([1, "a"]), schema.clone()).is_empty());
        assert_eq!(
            messages(value!([1, "a", 3, 4]), schema),
            vec!["Additional items are not allowed (3, 4 were unexpected)"]
        );

        let open = value!({"items": [{"type": "integer"}], "additionalItems": {"type": "string"}});
        let errors = validator().iter_errors(&value!([1, "a", 2]), &open).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pointer(), "/2");
    }

    #[test]
    fn one_of_without_match_nests_branch_errors() {
        let errors = validator()
            .iter_errors(&value!(123), &value!({"oneOf": [{"type": "array"}, {"type": "object"}]}))
            .unwrap();
        assert_eq!(errors.len(), 1);
        let context: Vec<_> = errors[0].context.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(context, vec!["123 is not of type array", "123 is not of type object"]);
    }

    #[test]
    fn one_of_with_several_matches_is_an_error() {
        let errors = messages(value!(1), value!({"oneOf": [{"type": "integer"}, {"minimum": 0}]}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is valid under each of"));
    }

    #[test]
    fn all_of_reports_every_branch() {
        assert_eq!(
            messages(value!({}), value!({"allOf": [{"required": ["a"]}, {"required": ["b"]}]})),
            vec!["'a' is a required property", "'b' is a required property"]
        );
    }

    #[test]
    fn any_of_passes_with_one_branch() {
        let schema = value!({"anyOf": [{"type": "string"}, {"type": "integer"}]});
        assert!(messages(value!(3), schema.clone()).is_empty());
        let errors = validator().iter_errors(&value!(null), &schema).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].context.len(), 2);
    }

    #[test]
    fn not_inverts_its_subschema() {
        assert_eq!(messages(value!("x"), value!({"not": {"type": "string"}})).len(), 1);
        assert!(messages(value!(1), value!({"not": {"type": "string"}})).is_empty());
    }

    #[test]
    fn format_failure_keeps_its_cause() {
        let errors = validator()
            .iter_errors(&value!("2017/01/01"), &value!({"type": "string", "format": "date"}))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].cause.is_some());
        assert!(std::error::Error::source(&errors[0]).is_some());
    }

    #[test]
    fn format_coerces_valid_strings() {
        let instance = value!({"when": "2017-12-01"});
        let validated = validator()
            .validate(&instance, &value!({"properties": {"when": {"format": "date"}}}))
            .unwrap();
        assert!(matches!(validated.instance.get("when"), Some(Value::Date(_))));
    }

    #[test]
    fn pattern_search_is_unanchored() {
        assert!(messages(value!("abc123"), value!({"pattern": "[0-9]+"})).is_empty());
        assert_eq!(messages(value!("abc"), value!({"pattern": "^[0-9]+$"})).len(), 1);
    }
}
