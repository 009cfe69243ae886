//! # serde_lossless
//!
//! Lossless serialization of rich value graphs on top of plain JSON.
//!
//! JSON can hold strings, numbers, booleans, null, arrays and objects. Real data holds more:
//! `undefined`, NaN and the infinities, big integers, dates, regular expressions, maps, sets,
//! errors, typed arrays, instances of known classes, and objects referenced from several places
//! (or from inside themselves). This crate turns such a value into a [`Payload`]: the plain JSON
//! the value degrades to, plus metadata saying where each lost type goes and which locations
//! share one object. Deserializing the payload rebuilds the original, identity included.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use serde_lossless::{parse, stringify, value, ObjectMap, Value};
//!
//! let mut fields = ObjectMap::new();
//! fields.insert("when".to_string(), Value::Date(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
//! fields.insert("tags".to_string(), Value::set(vec![value!("a"), value!("b")]));
//! fields.insert("ratio".to_string(), Value::from(f64::NAN));
//! let original = Value::object(fields);
//!
//! let text = stringify(&original).unwrap();
//! assert_eq!(
//!     text,
//!     concat!(
//!         r#"{"json":{"when":"2020-01-01T00:00:00.000Z","tags":["a","b"],"ratio":"NaN"},"#,
//!         r#""meta":{"values":{"when":["Date"],"tags":["set"],"ratio":["number"]}}}"#
//!     )
//! );
//!
//! let back = parse(&text).unwrap();
//! assert_eq!(back, original);
//! ```
//!
//! ## Shared and Cyclic References
//!
//! Containers in a [`Value`] are reference-counted; a clone is the same object. Each object is
//! written once, at the first path where it is met; later occurrences become `null`
//! placeholders listed in `referentialEqualities`, and are pointed back at the one object on
//! the way in.
//!
//! ```rust
//! use serde_lossless::{deserialize, serialize, ObjectMap, Value};
//!
//! let node = Value::object(ObjectMap::new());
//! if let Value::Object(fields) = &node {
//!     fields.borrow_mut().insert("self".to_string(), node.clone());
//! }
//!
//! let payload = serialize(&node).unwrap();
//! assert_eq!(payload.json, serde_json::json!({"self": null}));
//!
//! let back = deserialize(payload).unwrap();
//! assert!(back.ptr_eq(&back.get("self").unwrap()));
//! ```
//!
//! ## Classes, Symbols and Custom Types
//!
//! The free functions use a default [`Codec`] that only knows the built-in transforms. Build a
//! codec and register classes, symbols and [`CustomTransformer`]s on it to carry those too.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade: `debug` for per-call
//! summaries and values that are dropped to `null`, `trace` for every repeated reference and
//! every transform applied during reconstruction.

pub mod annotation;
mod annotator;
pub mod codec;
pub mod error;
pub mod macros;
pub mod map;
pub mod options;
pub mod path;
pub mod payload;
pub mod registry;
pub mod ser;
mod transforms;
pub mod tree;
pub mod value;
mod walker;

pub use annotation::TypeAnnotation;
pub use codec::Codec;
pub use error::{Error, Result};
pub use map::ObjectMap;
pub use options::Options;
pub use payload::{Meta, Payload};
pub use registry::{CustomTransformer, RegisterOptions, Registry};
pub use ser::{to_value, ValueSerializer};
pub use value::{Class, ErrorValue, Instance, Number, RegExp, Symbol, TypedArray, Value};

use std::io;

/// Serializes a value into a payload with the default codec.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::{serialize, Value};
///
/// let payload = serialize(&Value::Undefined).unwrap();
/// assert_eq!(
///     serde_json::to_value(&payload).unwrap(),
///     serde_json::json!({"json": null, "meta": {"values": ["undefined"]}})
/// );
/// ```
///
/// # Errors
///
/// Fails with [`Error::DepthLimitExceeded`] for values nested deeper than the default limit,
/// or with whatever a custom transformer reports.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn serialize(value: &Value) -> Result<Payload> {
    Codec::default().serialize(value)
}

/// Rebuilds a value from a payload with the default codec.
///
/// # Errors
///
/// Fails with [`Error::UnknownTransform`] for annotations naming transforms the default codec
/// does not know (classes, symbols, custom transformers), with [`Error::PathResolution`] for
/// paths that do not exist, and with [`Error::InvalidPayload`] for malformed metadata.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn deserialize(payload: Payload) -> Result<Value> {
    Codec::default().deserialize(payload)
}

/// Serializes a value to payload text with the default codec.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn stringify(value: &Value) -> Result<String> {
    Codec::default().stringify(value)
}

/// Parses payload text and rebuilds the value with the default codec.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::{parse, Value};
///
/// let value = parse(r#"{"json": "123", "meta": {"values": ["bigint"]}}"#).unwrap();
/// assert!(matches!(value, Value::BigInt(_)));
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse(text: &str) -> Result<Value> {
    Codec::default().parse(text)
}

/// Writes the payload of a value to a writer with the default codec.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(writer: W, value: &Value) -> Result<()>
where
    W: io::Write,
{
    let payload = serialize(value)?;
    serde_json::to_writer(writer, &payload)?;
    Ok(())
}

/// Reads payload text from a reader and rebuilds the value with the default codec.
///
/// # Errors
///
/// Returns an error if reading fails, the text is not a payload, or reconstruction fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(mut reader: R) -> Result<Value>
where
    R: io::Read,
{
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::Json(e.to_string()))?;
    parse(&text)
}
