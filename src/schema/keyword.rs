use std::fmt;

/// Every schema keyword the engine evaluates.
///
/// [`Keyword::ORDER`] is the fixed evaluation order within one schema node. Every
/// keyword is evaluated against the instance as received; the order only decides how
/// errors are listed and which rewrite wins when two keywords change the same leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Ref,
    Type,
    Enum,
    MinLength,
    MaxLength,
    Pattern,
    Minimum,
    Maximum,
    MultipleOf,
    Properties,
    PatternProperties,
    AdditionalProperties,
    Required,
    MinProperties,
    MaxProperties,
    Dependencies,
    Items,
    AdditionalItems,
    MinItems,
    MaxItems,
    UniqueItems,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    Format,
}

impl Keyword {
    pub const ORDER: [Keyword; 26] = [
        Keyword::Ref,
        Keyword::Type,
        Keyword::Enum,
        Keyword::MinLength,
        Keyword::MaxLength,
        Keyword::Pattern,
        Keyword::Minimum,
        Keyword::Maximum,
        Keyword::MultipleOf,
        Keyword::Properties,
        Keyword::PatternProperties,
        Keyword::AdditionalProperties,
        Keyword::Required,
        Keyword::MinProperties,
        Keyword::MaxProperties,
        Keyword::Dependencies,
        Keyword::Items,
        Keyword::AdditionalItems,
        Keyword::MinItems,
        Keyword::MaxItems,
        Keyword::UniqueItems,
        Keyword::AllOf,
        Keyword::AnyOf,
        Keyword::OneOf,
        Keyword::Not,
        Keyword::Format,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::Ref => "$ref",
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::MinLength => "minLength",
            Keyword::MaxLength => "maxLength",
            Keyword::Pattern => "pattern",
            Keyword::Minimum => "minimum",
            Keyword::Maximum => "maximum",
            Keyword::MultipleOf => "multipleOf",
            Keyword::Properties => "properties",
            Keyword::PatternProperties => "patternProperties",
            Keyword::AdditionalProperties => "additionalProperties",
            Keyword::Required => "required",
            Keyword::MinProperties => "minProperties",
            Keyword::MaxProperties => "maxProperties",
            Keyword::Dependencies => "dependencies",
            Keyword::Items => "items",
            Keyword::AdditionalItems => "additionalItems",
            Keyword::MinItems => "minItems",
            Keyword::MaxItems => "maxItems",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::AllOf => "allOf",
            Keyword::AnyOf => "anyOf",
            Keyword::OneOf => "oneOf",
            Keyword::Not => "not",
            Keyword::Format => "format",
        }
    }

    /// Annotation keywords (`title`, `default`, `nullable`, ...) map to `None`.
    pub fn from_name(name: &str) -> Option<Keyword> {
        Keyword::ORDER.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_the_table() {
        for keyword in Keyword::ORDER {
            assert_eq!(Keyword::from_name(keyword.name()), Some(keyword));
        }
        assert_eq!(Keyword::from_name("nullable"), None);
        assert_eq!(Keyword::from_name("exclusiveMinimum"), None);
    }

    #[test]
    fn format_runs_after_string_constraints() {
        let position = |k| Keyword::ORDER.iter().position(|x| *x == k);
        assert!(position(Keyword::Pattern) < position(Keyword::Format));
        assert!(position(Keyword::Properties) < position(Keyword::Required));
        assert_eq!(Keyword::ORDER[0], Keyword::Ref);
    }
}
