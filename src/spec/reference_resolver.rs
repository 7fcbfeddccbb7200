use crate::schema::{DocumentStore, SchemaError};
use crate::value::Value;
use std::borrow::Cow;

/// Upper bound on `$ref` hops between component objects.
const MAX_HOPS: usize = 16;

/// OpenAPI component sections that structural `$ref`s point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Parameter,
    RequestBody,
    Response,
}

impl Component {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Parameter => "#/components/parameters/",
            Self::RequestBody => "#/components/requestBodies/",
            Self::Response => "#/components/responses/",
        }
    }
}

/// Resolves OpenAPI structure-level `$ref` to actual component definitions
///
/// This handles references to OpenAPI components like:
/// - `$ref: "#/components/parameters/PageLimit"`
/// - `$ref: "#/components/requestBodies/CreateUser"`
/// - `$ref: "#/components/responses/ErrorResponse"`
///
/// Schema-level references (inside a `schema`) are left alone; the schema engine
/// follows those itself with proper scope tracking.
pub trait ResolveReference {
    fn resolve_component<'a>(
        &'a self,
        store: &DocumentStore,
        component: Component,
    ) -> Result<Cow<'a, Value>, SchemaError>;
}

impl ResolveReference for Value {
    fn resolve_component<'a>(
        &'a self,
        store: &DocumentStore,
        component: Component,
    ) -> Result<Cow<'a, Value>, SchemaError> {
        let mut current = Cow::Borrowed(self);
        for _ in 0..MAX_HOPS {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Ok(current);
            };
            if !reference.starts_with(component.prefix()) {
                return Err(SchemaError::Malformed(format!(
                    "invalid reference: {}. Expected prefix: {}",
                    reference,
                    component.prefix()
                )));
            }
            let (_, target) = store.resolver().resolve(reference)?;
            current = Cow::Owned((*target).clone());
        }
        Err(SchemaError::ReferenceCycle(component.prefix().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn store() -> DocumentStore {
        DocumentStore::new(
            "",
            value!({
                "components": {
                    "parameters": {
                        "Limit": {"name": "limit", "in": "query"},
                        "Alias": {"$ref": "#/components/parameters/Limit"},
                        "Loop": {"$ref": "#/components/parameters/Loop"}
                    }
                }
            }),
        )
    }

    #[test]
    fn inline_objects_are_borrowed() {
        let inline = value!({"name": "q", "in": "query"});
        let resolved = inline.resolve_component(&store(), Component::Parameter).unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));
    }

    #[test]
    fn chains_of_references_are_followed() {
        let reference = value!({"$ref": "#/components/parameters/Alias"});
        let resolved = reference.resolve_component(&store(), Component::Parameter).unwrap();
        assert_eq!(resolved.get("name"), Some(&value!("limit")));
    }

    #[test]
    fn wrong_section_is_rejected() {
        let reference = value!({"$ref": "#/components/parameters/Limit"});
        assert!(matches!(
            reference.resolve_component(&store(), Component::Response),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn loops_are_reported() {
        let reference = value!({"$ref": "#/components/parameters/Loop"});
        assert!(matches!(
            reference.resolve_component(&store(), Component::Parameter),
            Err(SchemaError::ReferenceCycle(_))
        ));
    }
}
