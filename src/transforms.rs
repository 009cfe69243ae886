//! Built-in and registered transforms.
//!
//! A transform turns a rich value into a plain encoding plus a [`TypeAnnotation`], and back.
//! Detection runs in a fixed order: the built-in rule table first, then typed arrays, then
//! registered classes, registered symbols and finally custom transformers in registration
//! order. The first match wins.

use crate::annotation::TypeAnnotation;
use crate::registry::{ClassEntry, CustomTransformer, Registry};
use crate::value::{ErrorValue, Number, RegExp, TypedArray};
use crate::{Error, ObjectMap, Result, Symbol, Value};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use num_bigint::BigInt;
use serde_json::Value as JsonValue;

/// The plain encoding of a transformed value.
///
/// Structural encodings hold rich members that the walker still has to visit, at the paths
/// their position implies: `Items` at their index, `Fields` at their key, `Entries` at
/// `index.0` (key) and `index.1` (value).
#[derive(Debug)]
pub(crate) enum Encoded {
    Plain(JsonValue),
    Items(Vec<Value>),
    Fields(Vec<(String, Value)>),
    Entries(Vec<(Value, Value)>),
}

struct Rule {
    tag: TypeAnnotation,
    applies: fn(&Value) -> bool,
    encode: fn(&Value, &Registry) -> Encoded,
    decode: fn(Value) -> Result<Value>,
}

static SIMPLE_RULES: [Rule; 8] = [
    Rule {
        tag: TypeAnnotation::Undefined,
        applies: |v| matches!(v, Value::Undefined),
        encode: |_, _| Encoded::Plain(JsonValue::Null),
        decode: |_| Ok(Value::Undefined),
    },
    Rule {
        tag: TypeAnnotation::Number,
        applies: |v| matches!(v, Value::Number(n) if n.is_special()),
        encode: encode_special_number,
        decode: decode_special_number,
    },
    Rule {
        tag: TypeAnnotation::BigInt,
        applies: |v| matches!(v, Value::BigInt(_)),
        encode: |v, _| match v {
            Value::BigInt(bi) => Encoded::Plain(JsonValue::String(bi.to_string())),
            _ => Encoded::Plain(JsonValue::Null),
        },
        decode: decode_bigint,
    },
    Rule {
        tag: TypeAnnotation::Date,
        applies: |v| matches!(v, Value::Date(_)),
        encode: |v, _| match v {
            Value::Date(dt) => Encoded::Plain(JsonValue::String(format_date(dt))),
            _ => Encoded::Plain(JsonValue::Null),
        },
        decode: decode_date,
    },
    Rule {
        tag: TypeAnnotation::RegExp,
        applies: |v| matches!(v, Value::RegExp(_)),
        encode: |v, _| match v {
            Value::RegExp(re) => Encoded::Plain(JsonValue::String(re.to_string())),
            _ => Encoded::Plain(JsonValue::Null),
        },
        decode: decode_regexp,
    },
    Rule {
        tag: TypeAnnotation::Error,
        applies: |v| matches!(v, Value::Error(_)),
        encode: encode_error,
        decode: decode_error,
    },
    Rule {
        tag: TypeAnnotation::Set,
        applies: |v| matches!(v, Value::Set(_)),
        encode: |v, _| match v {
            Value::Set(items) => Encoded::Items(items.borrow().clone()),
            _ => Encoded::Items(Vec::new()),
        },
        decode: |v| Ok(Value::set(expect_items(v, "set")?)),
    },
    Rule {
        tag: TypeAnnotation::Map,
        applies: |v| matches!(v, Value::Map(_)),
        encode: |v, _| match v {
            Value::Map(entries) => Encoded::Entries(entries.borrow().clone()),
            _ => Encoded::Entries(Vec::new()),
        },
        decode: decode_map,
    },
];

/// Finds the transform for `value`, if any, and encodes it.
pub(crate) fn transform_value(
    value: &Value,
    registry: &Registry,
) -> Result<Option<(TypeAnnotation, Encoded)>> {
    if let Some(rule) = SIMPLE_RULES.iter().find(|rule| (rule.applies)(value)) {
        return Ok(Some((rule.tag.clone(), (rule.encode)(value, registry))));
    }

    match value {
        Value::TypedArray(array) => {
            let items = array.numbers().into_iter().map(Value::Number).collect();
            return Ok(Some((
                TypeAnnotation::TypedArray(array.constructor_name().to_string()),
                Encoded::Items(items),
            )));
        }
        Value::Instance(instance) => {
            let instance = instance.borrow();
            if let Some(identifier) = registry.class_identifier(&instance.class) {
                let allowed = registry
                    .class(identifier)
                    .and_then(|entry| entry.allow_props.as_ref());
                let fields = instance
                    .fields
                    .iter()
                    .filter(|(key, _)| allowed.map_or(true, |props| props.contains(key)))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                return Ok(Some((
                    TypeAnnotation::Class(identifier.to_string()),
                    Encoded::Fields(fields),
                )));
            }
        }
        Value::Symbol(symbol) => {
            if let Some(identifier) = registry.symbol_identifier(symbol) {
                let description = symbol
                    .description()
                    .map_or(JsonValue::Null, |d| JsonValue::String(d.to_string()));
                return Ok(Some((
                    TypeAnnotation::Symbol(identifier.to_string()),
                    Encoded::Plain(description),
                )));
            }
        }
        _ => {}
    }

    match registry.find_custom(value) {
        Some((name, transformer)) => Ok(Some((
            TypeAnnotation::Custom(name.to_string()),
            Encoded::Plain(transformer.serialize(value)?),
        ))),
        None => Ok(None),
    }
}

/// The inverse of an annotation, resolved against a registry.
pub(crate) struct Inverse<'r> {
    steps: Vec<Step<'r>>,
}

enum Step<'r> {
    Builtin(fn(Value) -> Result<Value>),
    TypedArray(&'r str),
    Class(&'r ClassEntry),
    Symbol(&'r Symbol),
    Custom(&'r dyn CustomTransformer),
}

/// Resolves `tag` to its inverse without touching any value.
///
/// Fails with [`Error::UnknownTransform`] when the tag names nothing this crate or `registry`
/// knows.
pub(crate) fn resolve<'r>(tag: &'r TypeAnnotation, registry: &'r Registry) -> Result<Inverse<'r>> {
    let mut steps = Vec::new();
    push_steps(tag, registry, &mut steps)?;
    Ok(Inverse { steps })
}

fn push_steps<'r>(
    tag: &'r TypeAnnotation,
    registry: &'r Registry,
    steps: &mut Vec<Step<'r>>,
) -> Result<()> {
    let step = match tag {
        TypeAnnotation::Chain(tags) => {
            for tag in tags {
                push_steps(tag, registry, steps)?;
            }
            return Ok(());
        }
        TypeAnnotation::TypedArray(ctor) => {
            if TypedArray::from_numbers(ctor, &[]).is_none() {
                return Err(Error::unknown_transform(tag));
            }
            Step::TypedArray(ctor)
        }
        TypeAnnotation::Class(identifier) => {
            Step::Class(registry.class(identifier).ok_or_else(|| Error::unknown_transform(tag))?)
        }
        TypeAnnotation::Symbol(identifier) => Step::Symbol(
            registry
                .symbol(identifier)
                .ok_or_else(|| Error::unknown_transform(tag))?,
        ),
        TypeAnnotation::Custom(name) => {
            Step::Custom(registry.custom(name).ok_or_else(|| Error::unknown_transform(tag))?)
        }
        TypeAnnotation::Unrecognized(_) => return Err(Error::unknown_transform(tag)),
        simple => {
            let rule = SIMPLE_RULES
                .iter()
                .find(|rule| rule.tag == *simple)
                .ok_or_else(|| Error::unknown_transform(tag))?;
            Step::Builtin(rule.decode)
        }
    };
    steps.push(step);
    Ok(())
}

impl Inverse<'_> {
    /// Applies each step in order.
    pub(crate) fn apply(&self, value: Value) -> Result<Value> {
        self.steps.iter().try_fold(value, |value, step| match step {
            Step::Builtin(decode) => decode(value),
            Step::TypedArray(ctor) => decode_typed_array(ctor, value),
            Step::Class(entry) => Ok(Value::instance(&entry.class, expect_fields(value, "class instance")?)),
            Step::Symbol(symbol) => Ok(Value::Symbol((*symbol).clone())),
            Step::Custom(transformer) => transformer.deserialize(value.to_plain()?),
        })
    }
}

fn mismatch(expected: &str, found: &Value) -> Error {
    Error::invalid_payload(format!(
        "expected the plain encoding of a {}, found {}",
        expected,
        found.kind()
    ))
}

fn expect_string(value: Value, expected: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch(expected, &other)),
    }
}

fn expect_items(value: Value, expected: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        other => Err(mismatch(expected, &other)),
    }
}

fn expect_fields(value: Value, expected: &str) -> Result<ObjectMap> {
    match value {
        Value::Object(fields) => Ok(fields.borrow().clone()),
        other => Err(mismatch(expected, &other)),
    }
}

fn encode_special_number(value: &Value, _: &Registry) -> Encoded {
    let name = match value {
        Value::Number(n) => n.special_name(),
        _ => None,
    };
    Encoded::Plain(name.map_or(JsonValue::Null, |name| JsonValue::String(name.to_string())))
}

fn decode_special_number(value: Value) -> Result<Value> {
    let number = match expect_string(value, "number")?.as_str() {
        "NaN" => Number::NaN,
        "Infinity" => Number::Infinity,
        "-Infinity" => Number::NegativeInfinity,
        other => {
            return Err(Error::invalid_payload(format!(
                "`{}` is not a special number",
                other
            )))
        }
    };
    Ok(Value::Number(number))
}

fn decode_bigint(value: Value) -> Result<Value> {
    let digits = expect_string(value, "bigint")?;
    digits
        .parse::<BigInt>()
        .map(Value::BigInt)
        .map_err(|e| Error::invalid_payload(format!("`{}` is not a bigint: {}", digits, e)))
}

/// Writes a date at millisecond precision; anything finer is dropped.
///
/// Years 0 through 9999 use plain RFC 3339. Other years use the signed six-digit form,
/// `+010000-01-01T00:00:00.000Z` or `-000005-06-07T00:00:00.000Z`.
fn format_date(dt: &DateTime<Utc>) -> String {
    let year = dt.year();
    if (0..=9999).contains(&year) {
        return dt.to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    let sign = if year < 0 { '-' } else { '+' };
    format!(
        "{}{:06}{}",
        sign,
        year.unsigned_abs(),
        dt.format("-%m-%dT%H:%M:%S%.3fZ")
    )
}

fn decode_date(value: Value) -> Result<Value> {
    let text = expect_string(value, "date")?;
    parse_date(&text).map(Value::Date)
}

fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    let invalid = |reason: &dyn std::fmt::Display| {
        Error::invalid_payload(format!("`{}` is not a date: {}", text, reason))
    };

    let negative = match text.as_bytes().first() {
        Some(b'+') => false,
        Some(b'-') => true,
        _ => {
            return DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| invalid(&e));
        }
    };

    let body = &text[1..];
    let year_end = body.find('-').ok_or_else(|| invalid(&"missing month"))?;
    let digits = &body[..year_end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(&"year is not a number"));
    }
    let year: i32 = digits.parse().map_err(|e| invalid(&e))?;
    let year = if negative { -year } else { year };

    // Parse the rest against a leap year so February 29 gets through, then move to `year`.
    let rest = format!("2000{}", &body[year_end..]);
    DateTime::parse_from_rfc3339(&rest)
        .map_err(|e| invalid(&e))?
        .with_year(year)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid(&"day does not exist in that year"))
}

fn decode_regexp(value: Value) -> Result<Value> {
    let text = expect_string(value, "regexp")?;
    match (text.strip_prefix('/'), text.rfind('/')) {
        (Some(_), Some(end)) if end > 0 => Ok(Value::RegExp(RegExp::new(
            &text[1..end],
            &text[end + 1..],
        ))),
        _ => Err(Error::invalid_payload(format!(
            "`{}` is not a regular expression literal",
            text
        ))),
    }
}

fn encode_error(value: &Value, registry: &Registry) -> Encoded {
    let Value::Error(error) = value else {
        return Encoded::Fields(Vec::new());
    };
    let error = error.borrow();

    let mut fields = vec![
        ("name".to_string(), Value::String(error.name.clone())),
        ("message".to_string(), Value::String(error.message.clone())),
    ];
    for prop in registry.allowed_error_props() {
        let extra = match prop.as_str() {
            "name" | "message" => None,
            "stack" => error.stack.clone().map(Value::String),
            other => error.props.get(other).cloned(),
        };
        if let Some(extra) = extra {
            fields.push((prop.clone(), extra));
        }
    }
    Encoded::Fields(fields)
}

fn decode_error(value: Value) -> Result<Value> {
    let fields = expect_fields(value, "error")?;

    let mut error = ErrorValue::new("");
    for (key, value) in fields {
        match (key.as_str(), value) {
            ("name", Value::String(name)) => error.name = name,
            ("message", Value::String(message)) => error.message = message,
            ("stack", Value::String(stack)) => error.stack = Some(stack),
            (_, value) => {
                error.props.insert(key, value);
            }
        }
    }
    Ok(Value::error(error))
}

fn decode_map(value: Value) -> Result<Value> {
    let entries = expect_items(value, "map")?
        .into_iter()
        .map(|entry| match expect_items(entry, "map entry")?.as_slice() {
            [key, value] => Ok((key.clone(), value.clone())),
            other => Err(Error::invalid_payload(format!(
                "a map entry must have 2 elements, found {}",
                other.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::map(entries))
}

fn decode_typed_array(ctor: &str, value: Value) -> Result<Value> {
    let numbers = expect_items(value, "typed array")?
        .iter()
        .map(|item| match item {
            Value::Number(n) => Ok(*n),
            other => Err(mismatch("typed array element", other)),
        })
        .collect::<Result<Vec<_>>>()?;
    TypedArray::from_numbers(ctor, &numbers)
        .map(Value::TypedArray)
        .ok_or_else(|| Error::unknown_transform(ctor))
}
