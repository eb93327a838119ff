//! Stateless helpers that turn filter intents into backend conditions.
//!
//! These functions are the building blocks behind the `by_*` methods of
//! [`FilterSet`](crate::filter::FilterSet): text matching (exact, contains,
//! starts with), numeric and date ranges, and existence checks.
//!
//! Text helpers share one pipeline: the user value is regex-escaped, `%` turns
//! into `.*` and `?` into `.` (so users can type simple wildcards), and the
//! `like` form additionally percent-encodes `&`, `#` and `+` so that the value
//! survives being sent in a query string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::{Condition, Dialect, Operation, Operator};

const REGEX_METACHARACTERS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Escapes regex metacharacters so the value matches itself literally.
pub fn escape_for_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if REGEX_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn prepare_pattern(value: &str, use_like: bool) -> String {
    let pattern = escape_for_regex(value)
        .replace('%', ".*")
        .replace("\\?", ".");

    if use_like {
        pattern
            .replace('&', "%26")
            .replace('#', "%23")
            .replace('+', "%2B")
    } else {
        pattern
    }
}

fn text_operation(pattern: String, use_like: bool) -> Operation {
    if use_like {
        Operation::new(Operator::Like, pattern).with_options("i")
    } else {
        Operation::new(Operator::Regexp, format!("/{pattern}/i"))
    }
}

/// Case-insensitive "equals".
pub fn text_is(value: &str, use_like: bool) -> Operation {
    text_operation(format!("^{}$", prepare_pattern(value, use_like)), use_like)
}

/// Case-insensitive "contains".
pub fn text_contains(value: &str, use_like: bool) -> Operation {
    text_operation(prepare_pattern(value, use_like), use_like)
}

/// Case-insensitive "starts with".
pub fn text_start_with(value: &str, use_like: bool) -> Operation {
    text_operation(format!("^{}", prepare_pattern(value, use_like)), use_like)
}

/// Returns true if a range bound carries nothing to compare against.
///
/// Numbers are never empty (`0` is a valid bound). Otherwise null, booleans,
/// and empty strings, arrays and objects are empty.
pub fn is_empty_bound(value: &Value) -> bool {
    match value {
        Value::Number(_) => false,
        Value::Null | Value::Bool(_) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// A `{from, to}` pair coming from a range input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl RangeValue {
    pub fn new(from: Option<Value>, to: Option<Value>) -> Self {
        Self { from, to }
    }

    pub fn at_least(from: impl Into<Value>) -> Self {
        Self::new(Some(from.into()), None)
    }

    pub fn at_most(to: impl Into<Value>) -> Self {
        Self::new(None, Some(to.into()))
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::new(Some(from.into()), Some(to.into()))
    }

    fn usable(bound: &Option<Value>) -> Option<&Value> {
        bound.as_ref().filter(|value| !is_empty_bound(value))
    }
}

/// Builds `between`, `gte` or `lte` from whichever bounds are present.
///
/// Returns `None` when neither bound is usable; callers treat that as "no
/// condition".
pub fn range_compare(range: &RangeValue) -> Option<Operation> {
    match (RangeValue::usable(&range.from), RangeValue::usable(&range.to)) {
        (Some(from), Some(to)) => Some(Operation::new(
            Operator::Between,
            Value::Array(vec![from.clone(), to.clone()]),
        )),
        (Some(from), None) => Some(Operation::new(Operator::Gte, from.clone())),
        (None, Some(to)) => Some(Operation::new(Operator::Lte, to.clone())),
        (None, None) => None,
    }
}

/// One end of a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateBound {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    /// Free text, parsed as RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
    Text(String),
}

impl DateBound {
    /// Converts the bound to an ISO-8601 UTC string with millisecond precision.
    pub fn to_iso_string(&self) -> Option<String> {
        let instant = match self {
            DateBound::DateTime(instant) => Some(*instant),
            DateBound::Date(date) => date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()),
            DateBound::Text(text) => Self::parse_text(text),
        };

        instant.map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn parse_text(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let parsed = DateTime::parse_from_rfc3339(text)
            .map(|instant| instant.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            });

        if parsed.is_none() {
            tracing::warn!(value = %text, "Ignoring unparseable date bound");
        }

        parsed
    }
}

impl From<DateTime<Utc>> for DateBound {
    fn from(instant: DateTime<Utc>) -> Self {
        DateBound::DateTime(instant)
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::Date(date)
    }
}

impl From<&str> for DateBound {
    fn from(text: &str) -> Self {
        DateBound::Text(text.to_string())
    }
}

impl From<String> for DateBound {
    fn from(text: String) -> Self {
        DateBound::Text(text)
    }
}

/// A `{startDate, endDate}` pair coming from a date range input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateBound>,
}

impl DateRangeValue {
    pub fn new(start_date: Option<DateBound>, end_date: Option<DateBound>) -> Self {
        Self { start_date, end_date }
    }

    pub fn since(start_date: impl Into<DateBound>) -> Self {
        Self::new(Some(start_date.into()), None)
    }

    pub fn until(end_date: impl Into<DateBound>) -> Self {
        Self::new(None, Some(end_date.into()))
    }

    pub fn between(start_date: impl Into<DateBound>, end_date: impl Into<DateBound>) -> Self {
        Self::new(Some(start_date.into()), Some(end_date.into()))
    }
}

/// Date flavour of [`range_compare`]: bounds are sent as ISO-8601 UTC strings.
pub fn date_range_compare(range: &DateRangeValue) -> Option<Operation> {
    let iso = |bound: &Option<DateBound>| {
        bound
            .as_ref()
            .and_then(DateBound::to_iso_string)
            .map(Value::String)
    };

    range_compare(&RangeValue::new(iso(&range.start_date), iso(&range.end_date)))
}

/// "Field is set": present, not null and not the empty string.
///
/// Spelled out as three clauses because `neq: null` alone is not reliable on
/// every datastore driver.
pub fn has_value(field: &str, dialect: Dialect) -> Condition {
    Condition::and(vec![
        Condition::op(field, Operation::new(Operator::Exists, true).with_dialect(dialect)),
        Condition::op(field, Operation::new(Operator::Neq, Value::Null).with_dialect(dialect)),
        Condition::op(field, Operation::new(Operator::Neq, "").with_dialect(dialect)),
    ])
}

/// "Field is not set": missing, null, or (with `check_empty_string`) the empty string.
pub fn doesnt_have_value(field: &str, check_empty_string: bool, dialect: Dialect) -> Condition {
    let mut conditions = vec![
        Condition::op(field, Operation::new(Operator::Exists, false).with_dialect(dialect)),
        Condition::op(field, Operation::new(Operator::Eq, Value::Null).with_dialect(dialect)),
    ];
    if check_empty_string {
        conditions.push(Condition::op(
            field,
            Operation::new(Operator::Eq, "").with_dialect(dialect),
        ));
    }
    Condition::or(conditions)
}

/// Builds a left-anchored pattern matching the digits of a phone number with
/// any non-digit separators in between, and anything after the last digit.
///
/// Returns `None` if the input contains no digits.
pub fn phone_number_pattern(value: &str) -> Option<String> {
    let digits = value.chars().filter(char::is_ascii_digit).collect::<Vec<_>>();
    if digits.is_empty() {
        return None;
    }

    let mut pattern = String::from("^");
    for digit in digits {
        pattern.push_str("[^0-9]*");
        pattern.push(digit);
    }
    Some(pattern)
}
