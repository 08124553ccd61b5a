//! Typed literal values and the literal resolver.
//!
//! Query text carries no type annotations, so every literal in a WHERE clause
//! is resolved here exactly once, in a fixed priority order:
//! timestamp > number > boolean > null > string.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;

/// A literal value appearing on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Timestamp(DateTime<Utc>),
    /// Operand of `IN`, `NOT IN` and `ARRAY_CONTAINS_ANY`. Never produced by
    /// [`resolve_literal`].
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// JSON form handed to stores and formatters. Timestamps become RFC 3339
    /// strings with millisecond precision.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Number(n) => number_to_json(*n),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Null => JsonValue::Null,
            Value::Timestamp(ts) => {
                JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

fn number_to_json(n: f64) -> JsonValue {
    // Integral values below 2^53 keep their integer JSON form.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Number(_) => write!(f, "{}", self.to_json()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
            Value::Timestamp(ts) => write!(
                f,
                "timestamp({})",
                ts.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Resolve a raw literal token into a typed [`Value`].
///
/// One layer of matching single or double quotes is stripped first. The
/// unquoted text is then tried as a timestamp, a number, a boolean and `null`,
/// falling back to the string itself. Resolution never fails.
pub fn resolve_literal(raw: &str) -> Value {
    let text = strip_quotes(raw);

    if let Some(ts) = parse_timestamp(text) {
        return Value::Timestamp(ts);
    }
    if let Some(n) = parse_number(text) {
        return Value::Number(n);
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if text.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    Value::String(text.to_string())
}

/// Remove one layer of matching `'` or `"` quotes.
pub fn strip_quotes(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2}):(\d{2})(?:\.(\d{1,3}))?)?Z?$")
        .expect("valid ISO date pattern")
});

static US_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})$").expect("valid US date pattern"));

static LONG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+) (\d{1,2}), (\d{4})$").expect("valid long-form date pattern")
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parse text in one of the accepted timestamp shapes. All shapes are read
/// as UTC. Text that matches a shape but names an impossible date or time
/// returns `None`.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = caps[1].parse::<i32>().ok()?;
        let millis = match caps.get(7) {
            // ".5" is half a second
            Some(m) => format!("{:0<3}", m.as_str()).parse::<u32>().ok()?,
            None => 0,
        };
        return build_instant(
            year,
            num(2)?,
            num(3)?,
            num(4).unwrap_or(0),
            num(5).unwrap_or(0),
            num(6).unwrap_or(0),
            millis,
        );
    }

    if let Some(caps) = US_DATE.captures(text) {
        let month = caps[1].parse::<u32>().ok()?;
        let day = caps[2].parse::<u32>().ok()?;
        let year = caps[3].parse::<i32>().ok()?;
        return build_instant(year, month, day, 0, 0, 0, 0);
    }

    if let Some(caps) = LONG_DATE.captures(text) {
        let name = caps[1].to_lowercase();
        let month = MONTHS.iter().position(|m| *m == name)? as u32 + 1;
        let day = caps[2].parse::<u32>().ok()?;
        let year = caps[3].parse::<i32>().ok()?;
        return build_instant(year, month, day, 0, 0, 0, 0);
    }

    None
}

fn build_instant(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_milli_opt(hour, minute, second, millis)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Whole-text numeric parse. Spelled-out forms such as `inf` or `NaN` are
/// not numbers here.
fn parse_number(text: &str) -> Option<f64> {
    if text.is_empty()
        || text
            .chars()
            .any(|c| c.is_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Interpret a stored field value as an instant, if it looks like one.
///
/// Accepted: strings in a literal timestamp shape or RFC 3339, and timestamp
/// objects of the form `{"_seconds", "_nanoseconds"}` or `{"seconds", "nanos"}`.
pub fn date_like(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => parse_timestamp(s).or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
        JsonValue::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(JsonValue::as_i64)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanos"))
                .or_else(|| map.get("nanoseconds"))
                .and_then(JsonValue::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}
