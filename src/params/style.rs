use crate::error::StyleError;
use crate::params::Style;
use crate::schema::SchemaError;
use crate::value::{Map, Value};
use indexmap::IndexMap;
use url::form_urlencoded;

/// Parsed query string: every key with its values in arrival order.
pub type QueryMap = IndexMap<String, Vec<String>>;

/// How a raw parameter string is split before type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Kept as a single string.
    PassThrough,
    /// `a,b,c` to a list.
    SplitList,
    /// `k1=v1,k2=v2` to a mapping.
    SplitPairs,
    /// `k1,v1,k2,v2` to a mapping.
    SplitFlat,
}

fn is_primitive(type_name: &str) -> bool {
    matches!(type_name, "string" | "integer" | "number" | "boolean")
}

/// Picks the decoding for `style`/`explode` and the declared schema type.
pub fn decode_strategy(style: Style, explode: bool, declared_type: &str) -> Result<Decode, SchemaError> {
    let shape = if is_primitive(declared_type) {
        "string"
    } else {
        declared_type
    };
    let decode = match (style, shape, explode) {
        (Style::Simple, "string", _) => Decode::PassThrough,
        (Style::Simple, "array", _) => Decode::SplitList,
        (Style::Simple, "object", true) => Decode::SplitPairs,
        (Style::Simple, "object", false) => Decode::SplitFlat,
        (Style::Form, "string", _) => Decode::PassThrough,
        (Style::Form, "array", true) => Decode::PassThrough,
        (Style::Form, "array", false) => Decode::SplitList,
        (Style::Form, "object", false) => Decode::SplitFlat,
        _ => {
            return Err(SchemaError::Unsupported(format!(
                "style={}, explode={}, type={}",
                style, explode, declared_type
            )))
        }
    };
    Ok(decode)
}

impl Decode {
    pub fn apply(self, raw: &str) -> Result<Value, StyleError> {
        match self {
            Decode::PassThrough => Ok(Value::from(raw)),
            Decode::SplitList => Ok(Value::Array(raw.split(',').map(Value::from).collect())),
            Decode::SplitPairs => {
                let mut object = Map::new();
                for pair in raw.split(',') {
                    let (key, value) = parse_field(pair).ok_or_else(|| StyleError::MalformedPair(pair.to_owned()))?;
                    object.insert(key, Value::String(value));
                }
                Ok(Value::Object(object))
            }
            Decode::SplitFlat => {
                let parts: Vec<&str> = raw.split(',').collect();
                if parts.len() % 2 != 0 {
                    return Err(StyleError::OddPairs(parts.len()));
                }
                let object = parts
                    .chunks_exact(2)
                    .map(|pair| (pair[0].to_owned(), Value::from(pair[1])))
                    .collect();
                Ok(Value::Object(object))
            }
        }
    }
}

/// A single strictly-formed `key=value` field, form-decoded. Blank values are kept.
fn parse_field(field: &str) -> Option<(String, String)> {
    if !field.contains('=') {
        return None;
    }
    form_urlencoded::parse(field.as_bytes())
        .next()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
}

/// Strict `application/x-www-form-urlencoded` parsing: every `&`-separated field must
/// be a non-empty `key=value`.
pub fn parse_query(query: &str) -> Result<QueryMap, StyleError> {
    let mut parsed = QueryMap::new();
    if query.is_empty() {
        return Ok(parsed);
    }
    for field in query.split('&') {
        let (key, value) =
            parse_field(field).ok_or_else(|| StyleError::MalformedQuery(field.to_owned()))?;
        parsed.entry(key).or_default().push(value);
    }
    Ok(parsed)
}

/// Reassembles `name[key]=value` query entries into a mapping. `None` when no key
/// belongs to `name`; only the first value of a repeated key counts.
pub fn deep_object(name: &str, queries: &QueryMap) -> Option<Value> {
    let object: Map = queries
        .iter()
        .filter_map(|(key, values)| {
            let inner = key.strip_prefix(name)?.strip_prefix('[')?.strip_suffix(']')?;
            let first = values.first()?;
            Some((inner.to_owned(), Value::from(first.as_str())))
        })
        .collect();
    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn simple_array_splits_on_commas() {
        let decode = decode_strategy(Style::Simple, false, "array").unwrap();
        assert_eq!(decode, Decode::SplitList);
        assert_eq!(decode.apply("1,2,3").unwrap(), value!(["1", "2", "3"]));
    }

    #[test]
    fn primitives_are_passed_through() {
        for declared in ["string", "integer", "number", "boolean"] {
            assert_eq!(decode_strategy(Style::Simple, false, declared).unwrap(), Decode::PassThrough);
            assert_eq!(decode_strategy(Style::Form, true, declared).unwrap(), Decode::PassThrough);
        }
    }

    #[test]
    fn objects_split_by_explode() {
        let pairs = decode_strategy(Style::Simple, true, "object").unwrap();
        assert_eq!(pairs.apply("a=1,b=x%20y").unwrap(), value!({"a": "1", "b": "x y"}));
        let flat = decode_strategy(Style::Simple, false, "object").unwrap();
        assert_eq!(flat.apply("a,1,b,2").unwrap(), value!({"a": "1", "b": "2"}));
        assert_eq!(flat.apply("a,1,b"), Err(StyleError::OddPairs(3)));
        assert!(matches!(pairs.apply("a=1,b"), Err(StyleError::MalformedPair(p)) if p == "b"));
    }

    #[test]
    fn unsupported_combinations_are_fatal() {
        assert!(matches!(
            decode_strategy(Style::Form, true, "object"),
            Err(SchemaError::Unsupported(_))
        ));
        assert!(decode_strategy(Style::Matrix, false, "string").is_err());
        assert!(decode_strategy(Style::PipeDelimited, false, "array").is_err());
        assert!(decode_strategy(Style::Simple, false, "null").is_err());
    }

    #[test]
    fn query_parsing_is_strict() {
        let parsed = parse_query("a=1&b=&a=2&c=x+y").unwrap();
        assert_eq!(parsed["a"], vec!["1", "2"]);
        assert_eq!(parsed["b"], vec![""]);
        assert_eq!(parsed["c"], vec!["x y"]);
        assert!(parse_query("a=1&&b=2").is_err());
        assert!(parse_query("flag").is_err());
        assert!(parse_query("").unwrap().is_empty());
    }

    #[test]
    fn deep_object_collects_bracketed_keys() {
        let queries = parse_query("filter[a]=1&filter[b]=2&other=3&filterx[c]=4").unwrap();
        assert_eq!(deep_object("filter", &queries), Some(value!({"a": "1", "b": "2"})));
        assert_eq!(deep_object("missing", &queries), None);
    }
}
