//! Turning transport strings into typed parameter values.
//!
//! Decoding happens in two independent stages: [`style`] undoes the OpenAPI
//! serialization style (`simple`, `form`, `deepObject`), then [`coerce`] converts the
//! string leaves to the types the schema declares.

pub mod coerce;
pub mod style;

pub use coerce::{coerce, declared_type, CoerceError};
pub use style::{decode_strategy, deep_object, parse_query, Decode, QueryMap};

use crate::schema::SchemaError;
use std::fmt;
use std::str::FromStr;

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
    Cookie,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            other => Err(SchemaError::Malformed(format!(
                "unknown parameter location {:?}",
                other
            ))),
        }
    }
}

/// OpenAPI serialization styles. Only `simple`, `form` and `deepObject` decode; the
/// rest parse so they can be reported as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Simple,
    Form,
    DeepObject,
    Matrix,
    Label,
    SpaceDelimited,
    PipeDelimited,
}

impl Style {
    /// `form` for query and cookie parameters, `simple` elsewhere.
    pub fn default_for(location: Location) -> Self {
        match location {
            Location::Query | Location::Cookie => Self::Form,
            Location::Path | Location::Header => Self::Simple,
        }
    }

    /// Only `form` explodes unless told otherwise.
    pub fn default_explode(self) -> bool {
        self == Self::Form
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Form => "form",
            Self::DeepObject => "deepObject",
            Self::Matrix => "matrix",
            Self::Label => "label",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "form" => Ok(Self::Form),
            "deepObject" => Ok(Self::DeepObject),
            "matrix" => Ok(Self::Matrix),
            "label" => Ok(Self::Label),
            "spaceDelimited" => Ok(Self::SpaceDelimited),
            "pipeDelimited" => Ok(Self::PipeDelimited),
            other => Err(SchemaError::Malformed(format!("unknown parameter style {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_depend_on_location() {
        assert_eq!(Style::default_for(Location::Query), Style::Form);
        assert_eq!(Style::default_for(Location::Cookie), Style::Form);
        assert_eq!(Style::default_for(Location::Path), Style::Simple);
        assert_eq!(Style::default_for(Location::Header), Style::Simple);
        assert!(Style::Form.default_explode());
        assert!(!Style::Simple.default_explode());
        assert!(!Style::DeepObject.default_explode());
    }

    #[test]
    fn names_round_trip() {
        for style in [Style::Simple, Style::Form, Style::DeepObject, Style::PipeDelimited] {
            assert_eq!(style.as_str().parse::<Style>().unwrap(), style);
        }
        assert!("body".parse::<Location>().is_err());
    }
}
