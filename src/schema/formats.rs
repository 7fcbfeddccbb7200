//! String format checkers.
//!
//! A checker validates an instance and may hand back a typed replacement (a parsed
//! date, decoded bytes, an address). Instances of a kind a checker does not apply to
//! pass untouched.

use crate::schema::error::FormatError;
use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use url::Url;

/// Outcome of a format check: `Ok(None)` leaves the instance as-is.
pub type FormatResult = Result<Option<Value>, FormatError>;

pub type FormatCheck = Box<dyn Fn(&Value) -> FormatResult + Send + Sync>;

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\.\-]{1,255}$").expect("hostname pattern is valid")
});

/// Schema dialects; they share keyword semantics and differ in their format set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Draft4,
    Draft5,
    #[default]
    Oas3,
}

impl Dialect {
    pub fn formats(self) -> FormatRegistry {
        match self {
            Dialect::Draft4 => FormatRegistry::draft4(),
            Dialect::Draft5 => FormatRegistry::draft5(),
            Dialect::Oas3 => FormatRegistry::oas3(),
        }
    }
}

/// Format name to checker table.
#[derive(Default)]
pub struct FormatRegistry {
    checks: HashMap<String, FormatCheck>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.checks.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry").field("formats", &names).finish()
    }
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// date-time, email, hostname, ipv4, ipv6, uri
    pub fn draft4() -> Self {
        let mut registry = Self::empty();
        registry.register("date-time", date_time);
        registry.register("email", email);
        registry.register("hostname", hostname);
        registry.register("ipv4", ipv4);
        registry.register("ipv6", ipv6);
        registry.register("uri", uri);
        registry
    }

    /// draft4 plus uri-reference (also under its older `uriref` spelling).
    pub fn draft5() -> Self {
        let mut registry = Self::draft4();
        registry.register("uri-reference", uri_reference);
        registry.register("uriref", uri_reference);
        registry
    }

    /// draft5 plus the OpenAPI 3 formats int32, int64, byte and date.
    pub fn oas3() -> Self {
        let mut registry = Self::draft5();
        registry.register("int32", int32);
        registry.register("int64", int64);
        registry.register("byte", byte);
        registry.register("date", date);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&Value) -> FormatResult + Send + Sync + 'static,
    {
        self.checks.insert(name.into(), Box::new(check));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Runs the checker for `name`; unknown formats pass.
    pub fn check(&self, name: &str, instance: &Value) -> FormatResult {
        match self.checks.get(name) {
            Some(check) => check(instance),
            None => Ok(None),
        }
    }
}

pub fn int32(instance: &Value) -> FormatResult {
    check_range(instance, i32::MIN.into(), i32::MAX.into(), "int32")
}

pub fn int64(instance: &Value) -> FormatResult {
    check_range(instance, i64::MIN, i64::MAX, "int64")
}

fn check_range(instance: &Value, min: i64, max: i64, format: &'static str) -> FormatResult {
    match instance {
        Value::Integer(value) if *value < min || *value > max => Err(FormatError::OutOfRange {
            value: *value,
            format,
        }),
        _ => Ok(None),
    }
}

pub fn byte(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) => Ok(Some(Value::Bytes(STANDARD.decode(s)?))),
        _ => Ok(None),
    }
}

pub fn date(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) => Ok(Some(Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d")?))),
        _ => Ok(None),
    }
}

/// RFC 3339 timestamps; a timezone designator is mandatory.
pub fn date_time(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) => Ok(Some(Value::DateTime(DateTime::parse_from_rfc3339(s)?))),
        _ => Ok(None),
    }
}

pub fn email(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) if !s.contains('@') => {
            Err(FormatError::Invalid("invalid email format".to_owned()))
        }
        _ => Ok(None),
    }
}

pub fn hostname(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) if !HOSTNAME.is_match(s) => {
            Err(FormatError::Invalid("invalid hostname format".to_owned()))
        }
        _ => Ok(None),
    }
}

pub fn ipv4(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) => Ok(Some(Value::Ip(IpAddr::V4(s.parse::<Ipv4Addr>()?)))),
        _ => Ok(None),
    }
}

pub fn ipv6(instance: &Value) -> FormatResult {
    match instance {
        Value::String(s) => Ok(Some(Value::Ip(IpAddr::V6(s.parse::<Ipv6Addr>()?)))),
        _ => Ok(None),
    }
}

pub fn uri(instance: &Value) -> FormatResult {
    if let Value::String(s) = instance {
        Url::parse(s)?;
    }
    Ok(None)
}

pub fn uri_reference(instance: &Value) -> FormatResult {
    static BASE: LazyLock<Url> =
        LazyLock::new(|| Url::parse("http://reference.invalid/").expect("base URL is valid"));

    if let Value::String(s) = instance {
        BASE.join(s)?;
    }
    Ok(None)
}
