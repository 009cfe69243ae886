//! Rich in-memory values.
//!
//! [`Value`] is the source and result type of every round trip. Besides the plain JSON shapes
//! it carries the types that plain data interchange cannot express: `undefined`, special
//! numbers, big integers, dates, regular expressions, symbols, typed arrays, maps, sets,
//! errors and instances of registered classes.
//!
//! ## Identity
//!
//! Container variants (`Array`, `Object`, `Map`, `Set`, `Error`, `Instance`) and `Opaque` hold
//! their contents behind an `Rc`. Cloning a `Value` clones the reference, so two clones are the
//! *same* object, exactly like two bindings of one JavaScript object. This identity is what the
//! serializer records and the deserializer restores:
//!
//! ```rust
//! use serde_lossless::{deserialize, serialize, ObjectMap, Value};
//!
//! let shared = Value::array(vec![Value::from(1)]);
//! let mut fields = ObjectMap::new();
//! fields.insert("a".to_string(), shared.clone());
//! fields.insert("b".to_string(), shared);
//!
//! let result = deserialize(serialize(&Value::object(fields)).unwrap()).unwrap();
//! let (a, b) = (result.get("a").unwrap(), result.get("b").unwrap());
//! assert!(a.ptr_eq(&b));
//! ```
//!
//! Reference cycles are `Rc` cycles: they round-trip, but they are not freed until broken by
//! hand.

use crate::ObjectMap;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Shared, interiorly mutable container storage.
pub type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// A dynamically-typed rich value.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::{Number, Value};
///
/// let null = Value::Null;
/// let num = Value::Number(Number::Integer(42));
/// let text = Value::from("hello");
///
/// assert!(null.is_null());
/// assert!(num.is_number());
/// assert!(text.is_string());
/// ```
#[derive(Clone, Default)]
pub enum Value {
    Undefined,
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    BigInt(BigInt),
    /// Serialized with millisecond precision, so anything finer is truncated on the way out.
    /// Years outside 0000 to 9999 are written in the signed six-digit form (`+010000-...`).
    Date(DateTime<Utc>),
    RegExp(RegExp),
    Symbol(Symbol),
    TypedArray(TypedArray),
    Array(Shared<Vec<Value>>),
    Object(Shared<ObjectMap>),
    Map(Shared<Vec<(Value, Value)>>),
    /// Insertion-ordered. Uniqueness of members is the caller's concern.
    Set(Shared<Vec<Value>>),
    Error(Shared<ErrorValue>),
    Instance(Shared<Instance>),
    Opaque(Opaque),
}

/// A numeric value: an integer, a float, or one of the special IEEE values.
///
/// Numbers compare numerically (`Integer(1) == Float(1.0)`) and `NaN` equals `NaN`, so a
/// round trip through JSON compares equal to its source.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::Number;
///
/// assert!(Number::Integer(42).is_integer());
/// assert_eq!(Number::from(f64::INFINITY), Number::Infinity);
/// assert_eq!(Number::NaN, Number::from(f64::NAN));
/// assert!(Number::NaN.is_special());
/// ```
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Integer(i64),
    Float(f64),
    Infinity,
    NegativeInfinity,
    NaN,
}

impl Number {
    /// Returns `true` if this is an integer value.
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    /// Returns `true` if this is a floating-point value.
    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Returns `true` if this number has no JSON representation (NaN or an infinity).
    #[inline]
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.special_name().is_some()
    }

    /// Name of a special value as it appears in payloads.
    pub(crate) fn special_name(&self) -> Option<&'static str> {
        match self {
            Number::Integer(_) => None,
            Number::Float(f) if f.is_finite() => None,
            _ => {
                let f = self.as_f64();
                Some(if f.is_nan() {
                    "NaN"
                } else if f > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                })
            }
        }
    }

    /// Converts this number to an `i64` if it is integral and in range.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(i) => Some(*i),
            Number::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Converts this number to an `f64`.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
            Number::Infinity => f64::INFINITY,
            Number::NegativeInfinity => f64::NEG_INFINITY,
            Number::NaN => f64::NAN,
        }
    }

    pub(crate) fn to_json(self) -> JsonValue {
        match self {
            Number::Integer(i) => JsonValue::from(i),
            other => serde_json::Number::from_f64(other.as_f64())
                .map_or(JsonValue::Null, JsonValue::Number),
        }
    }

    pub(crate) fn from_json(number: &serde_json::Number) -> Self {
        match number.as_i64() {
            Some(i) => Number::Integer(i),
            None => Number::from(number.as_f64().unwrap_or(f64::NAN)),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a == b,
            _ => {
                let (a, b) = (self.as_f64(), other.as_f64());
                (a.is_nan() && b.is_nan()) || a == b
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.special_name()) {
            (_, Some(name)) => f.write_str(name),
            (Number::Integer(i), None) => write!(f, "{}", i),
            (_, None) => write!(f, "{}", self.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Integer(value as i64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Number::NaN
        } else if value == f64::INFINITY {
            Number::Infinity
        } else if value == f64::NEG_INFINITY {
            Number::NegativeInfinity
        } else {
            Number::Float(value)
        }
    }
}

/// A regular expression literal, kept as source text and flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

impl RegExp {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        RegExp {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

impl fmt::Display for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A unique symbol. Two symbols are equal only if they are the same symbol.
///
/// ```rust
/// use serde_lossless::Symbol;
///
/// let a = Symbol::new("token");
/// assert_eq!(a, a.clone());
/// assert_ne!(a, Symbol::new("token"));
/// ```
#[derive(Clone)]
pub struct Symbol(Rc<Option<String>>);

impl Symbol {
    pub fn new(description: impl Into<String>) -> Self {
        Symbol(Rc::new(Some(description.into())))
    }

    pub fn anonymous() -> Self {
        Symbol(Rc::new(None))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

/// A class: the nominal type of an [`Instance`]. Classes compare by identity, so two classes
/// that happen to share a name stay distinct.
#[derive(Clone)]
pub struct Class(Rc<str>);

impl Class {
    pub fn new(name: &str) -> Self {
        Class(Rc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name())
    }
}

/// An object whose class is known.
#[derive(Clone, Debug)]
pub struct Instance {
    pub class: Class,
    pub fields: ObjectMap,
}

/// An error value: name, message, optional stack and any extra properties.
#[derive(Clone, Debug)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub props: ObjectMap,
}

impl ErrorValue {
    /// Creates an error named `Error` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        ErrorValue {
            name: "Error".to_string(),
            message: message.into(),
            stack: None,
            props: ObjectMap::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// A typed numeric array.
#[derive(Clone, Debug)]
pub enum TypedArray {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Uint8Clamped(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl TypedArray {
    /// The constructor name used in annotations, e.g. `Uint8Array`.
    pub fn constructor_name(&self) -> &'static str {
        match self {
            TypedArray::Int8(_) => "Int8Array",
            TypedArray::Uint8(_) => "Uint8Array",
            TypedArray::Uint8Clamped(_) => "Uint8ClampedArray",
            TypedArray::Int16(_) => "Int16Array",
            TypedArray::Uint16(_) => "Uint16Array",
            TypedArray::Int32(_) => "Int32Array",
            TypedArray::Uint32(_) => "Uint32Array",
            TypedArray::Float32(_) => "Float32Array",
            TypedArray::Float64(_) => "Float64Array",
        }
    }

    /// Returns the elements as numbers.
    pub fn numbers(&self) -> Vec<Number> {
        fn widen<T: Copy + Into<f64>>(items: &[T]) -> Vec<Number> {
            items.iter().map(|&x| Number::from(x.into())).collect()
        }

        match self {
            TypedArray::Int8(v) => v.iter().map(|&x| Number::Integer(x.into())).collect(),
            TypedArray::Uint8(v) | TypedArray::Uint8Clamped(v) => {
                v.iter().map(|&x| Number::Integer(x.into())).collect()
            }
            TypedArray::Int16(v) => v.iter().map(|&x| Number::Integer(x.into())).collect(),
            TypedArray::Uint16(v) => v.iter().map(|&x| Number::Integer(x.into())).collect(),
            TypedArray::Int32(v) => v.iter().map(|&x| Number::Integer(x.into())).collect(),
            TypedArray::Uint32(v) => v.iter().map(|&x| Number::Integer(x.into())).collect(),
            TypedArray::Float32(v) => widen(v),
            TypedArray::Float64(v) => widen(v),
        }
    }

    /// Builds the typed array named by `constructor` from numbers, or `None` for an unknown
    /// constructor. Elements are converted with `as`, so out-of-range values saturate.
    pub fn from_numbers(constructor: &str, numbers: &[Number]) -> Option<Self> {
        let floats = numbers.iter().map(Number::as_f64);
        Some(match constructor {
            "Int8Array" => TypedArray::Int8(floats.map(|f| f as i8).collect()),
            "Uint8Array" => TypedArray::Uint8(floats.map(|f| f as u8).collect()),
            "Uint8ClampedArray" => TypedArray::Uint8Clamped(floats.map(|f| f as u8).collect()),
            "Int16Array" => TypedArray::Int16(floats.map(|f| f as i16).collect()),
            "Uint16Array" => TypedArray::Uint16(floats.map(|f| f as u16).collect()),
            "Int32Array" => TypedArray::Int32(floats.map(|f| f as i32).collect()),
            "Uint32Array" => TypedArray::Uint32(floats.map(|f| f as u32).collect()),
            "Float32Array" => TypedArray::Float32(floats.map(|f| f as f32).collect()),
            "Float64Array" => TypedArray::Float64(floats.collect()),
            _ => return None,
        })
    }
}

impl PartialEq for TypedArray {
    fn eq(&self, other: &Self) -> bool {
        self.constructor_name() == other.constructor_name() && self.numbers() == other.numbers()
    }
}

/// A host value this crate knows nothing about. It serializes only through a registered
/// custom transformer; otherwise it is emitted as `null` and cannot be reconstructed.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    data: Rc<dyn Any>,
}

impl Opaque {
    pub fn new<T: Any>(data: T) -> Self {
        Opaque {
            type_name: std::any::type_name::<T>(),
            data: Rc::new(data),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.data) as *const u8 as usize
    }
}

impl Value {
    /// Creates a new array.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(shared(items))
    }

    /// Creates a new object.
    pub fn object(fields: ObjectMap) -> Self {
        Value::Object(shared(fields))
    }

    /// Creates a new map from its entries, in order.
    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(shared(entries))
    }

    /// Creates a new set from its members, in order.
    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(shared(items))
    }

    /// Creates a new error value.
    pub fn error(error: ErrorValue) -> Self {
        Value::Error(shared(error))
    }

    /// Creates a new instance of `class`.
    pub fn instance(class: &Class, fields: ObjectMap) -> Self {
        Value::Instance(shared(Instance {
            class: class.clone(),
            fields,
        }))
    }

    /// Wraps an arbitrary host value.
    pub fn opaque<T: Any>(data: T) -> Self {
        Value::Opaque(Opaque::new(data))
    }

    /// Address of the shared allocation behind this value, if it has reference identity.
    ///
    /// Only meaningful while the value is alive.
    pub fn identity(&self) -> Option<usize> {
        fn address<T: ?Sized>(rc: &Rc<T>) -> usize {
            Rc::as_ptr(rc) as *const u8 as usize
        }

        match self {
            Value::Array(rc) | Value::Set(rc) => Some(address(rc)),
            Value::Object(rc) => Some(address(rc)),
            Value::Map(rc) => Some(address(rc)),
            Value::Error(rc) => Some(address(rc)),
            Value::Instance(rc) => Some(address(rc)),
            Value::Opaque(opaque) => Some(opaque.identity()),
            _ => None,
        }
    }

    /// Returns `true` if both values are the same object.
    ///
    /// Values without reference identity (primitives, dates, ...) are never the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::BigInt(_) => "bigint",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Symbol(_) => "symbol",
            Value::TypedArray(_) => "typed array",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Error(_) => "error",
            Value::Instance(_) => "instance",
            Value::Opaque(_) => "opaque value",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(dt) => Some(dt),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(bi) => Some(bi),
            _ => None,
        }
    }

    /// Looks up a field of an object or class instance, or an index of an array or set.
    ///
    /// Returns a clone of the member, which shares identity with it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_lossless::value;
    ///
    /// let v = value!({"tags": ["a", "b"]});
    /// let tags = v.get("tags").unwrap();
    /// assert_eq!(tags.get(1).and_then(|t| t.as_str().map(str::to_owned)), Some("b".to_string()));
    /// ```
    pub fn get<I: Index>(&self, index: I) -> Option<Value> {
        index.index_into(self)
    }

    /// Converts a plain-shaped value back into JSON.
    ///
    /// Fails for anything JSON cannot hold directly (special numbers, dates, maps, ...).
    pub fn to_plain(&self) -> crate::Result<JsonValue> {
        match self {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) if !n.is_special() => Ok(n.to_json()),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(Value::to_plain)
                .collect::<crate::Result<Vec<_>>>()
                .map(JsonValue::Array),
            Value::Object(fields) => fields
                .borrow()
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.to_plain()?)))
                .collect::<crate::Result<serde_json::Map<_, _>>>()
                .map(JsonValue::Object),
            other => Err(crate::Error::unsupported_type(&format!(
                "{} is not a plain value",
                other.kind()
            ))),
        }
    }
}

/// A type usable with [`Value::get`]: `&str` for fields, `usize` for positions.
pub trait Index {
    fn index_into(&self, value: &Value) -> Option<Value>;
}

impl Index for &str {
    fn index_into(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(fields) => fields.borrow().get(self).cloned(),
            Value::Instance(instance) => instance.borrow().fields.get(self).cloned(),
            _ => None,
        }
    }
}

impl Index for usize {
    fn index_into(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Array(items) | Value::Set(items) => items.borrow().get(*self).cloned(),
            _ => None,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(Number::from_json(&n)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(fields) => Value::object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    /// Deep, graph-aware equality.
    ///
    /// Terminates on cyclic graphs: a pair of references already under comparison is assumed
    /// equal. Object fields are compared without regard to order; maps and sets in order.
    fn eq(&self, other: &Self) -> bool {
        graph_eq(self, other, &mut HashSet::new())
    }
}

fn graph_eq(a: &Value, b: &Value, active: &mut HashSet<(usize, usize)>) -> bool {
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y || !active.insert((x, y)) {
            return true;
        }
    }

    let all_eq = |xs: &[Value], ys: &[Value], active: &mut HashSet<(usize, usize)>| {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| graph_eq(x, y, active))
    };
    let fields_eq = |xs: &ObjectMap, ys: &ObjectMap, active: &mut HashSet<(usize, usize)>| {
        xs.len() == ys.len()
            && xs
                .iter()
                .all(|(k, x)| ys.get(k).is_some_and(|y| graph_eq(x, y, active)))
    };

    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::RegExp(x), Value::RegExp(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::TypedArray(x), Value::TypedArray(y)) => x == y,
        (Value::Array(x), Value::Array(y)) | (Value::Set(x), Value::Set(y)) => {
            all_eq(&x.borrow()[..], &y.borrow()[..], active)
        }
        (Value::Object(x), Value::Object(y)) => fields_eq(&*x.borrow(), &*y.borrow(), active),
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().zip(y.iter()).all(|((xk, xv), (yk, yv))| {
                    graph_eq(xk, yk, active) && graph_eq(xv, yv, active)
                })
        }
        (Value::Error(x), Value::Error(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.name == y.name
                && x.message == y.message
                && x.stack == y.stack
                && fields_eq(&x.props, &y.props, active)
        }
        (Value::Instance(x), Value::Instance(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.class == y.class && fields_eq(&x.fields, &y.fields, active)
        }
        _ => false,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = RefCell::new(Vec::new());
        DebugGraph {
            value: self,
            active: &active,
        }
        .fmt(f)
    }
}

/// Debug adapter that prints `<cycle>` instead of re-entering a reference being printed.
struct DebugGraph<'a> {
    value: &'a Value,
    active: &'a RefCell<Vec<usize>>,
}

impl<'a> DebugGraph<'a> {
    fn child<'b>(&self, value: &'b Value) -> DebugGraph<'b>
    where
        'a: 'b,
    {
        DebugGraph {
            value,
            active: self.active,
        }
    }
}

impl fmt::Debug for DebugGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.value.identity();
        if let Some(id) = identity {
            if self.active.borrow().contains(&id) {
                return f.write_str("<cycle>");
            }
            self.active.borrow_mut().push(id);
        }

        let result = match self.value {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::BigInt(bi) => write!(f, "BigInt({})", bi),
            Value::Date(dt) => write!(f, "Date({})", dt.to_rfc3339()),
            Value::RegExp(re) => write!(f, "RegExp({})", re),
            Value::Symbol(s) => write!(f, "{:?}", s),
            Value::TypedArray(arr) => write!(f, "{:?}", arr),
            Value::Array(items) => {
                let items = items.borrow();
                f.debug_list()
                    .entries(items.iter().map(|v| self.child(v)))
                    .finish()
            }
            Value::Set(items) => {
                let items = items.borrow();
                f.write_str("Set ")?;
                f.debug_set()
                    .entries(items.iter().map(|v| self.child(v)))
                    .finish()
            }
            Value::Object(fields) => {
                let fields = fields.borrow();
                f.debug_map()
                    .entries(fields.iter().map(|(k, v)| (k, self.child(v))))
                    .finish()
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                f.write_str("Map ")?;
                f.debug_map()
                    .entries(entries.iter().map(|(k, v)| (self.child(k), self.child(v))))
                    .finish()
            }
            Value::Error(error) => {
                let error = error.borrow();
                f.debug_struct(&error.name)
                    .field("message", &error.message)
                    .field("stack", &error.stack)
                    .finish()
            }
            Value::Instance(instance) => {
                let instance = instance.borrow();
                f.write_str(instance.class.name())?;
                f.write_str(" ")?;
                f.debug_map()
                    .entries(instance.fields.iter().map(|(k, v)| (k, self.child(v))))
                    .finish()
            }
            Value::Opaque(opaque) => write!(f, "Opaque({})", opaque.type_name()),
        };

        if identity.is_some() {
            self.active.borrow_mut().pop();
        }
        result
    }
}

// From implementations for creating Value from primitives
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Integer(value as i64))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Integer(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(Number::Integer(value as i64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<RegExp> for Value {
    fn from(value: RegExp) -> Self {
        Value::RegExp(value)
    }
}

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Value::Symbol(value)
    }
}

impl From<TypedArray> for Value {
    fn from(value: TypedArray) -> Self {
        Value::TypedArray(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::array(value)
    }
}

impl From<ObjectMap> for Value {
    fn from(value: ObjectMap) -> Self {
        Value::object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(Number::Integer(1), Number::Float(1.0));
        assert_eq!(Number::NaN, Number::Float(f64::NAN));
        assert_ne!(Number::Infinity, Number::NegativeInfinity);
        assert_eq!(Number::Float(f64::NEG_INFINITY).special_name(), Some("-Infinity"));
        assert_eq!(Number::Float(2.5).special_name(), None);
    }

    #[test]
    fn test_clones_share_identity() {
        let a = Value::array(vec![]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Value::array(vec![])));
        assert!(!Value::Null.ptr_eq(&Value::Null));
    }

    #[test]
    fn test_equality_terminates_on_cycles() {
        let make = || {
            let node = Value::object(ObjectMap::new());
            if let Value::Object(fields) = &node {
                fields.borrow_mut().insert("self".to_string(), node.clone());
            }
            node
        };

        assert_eq!(make(), make());
    }

    #[test]
    fn test_object_equality_ignores_field_order() {
        let a: ObjectMap = vec![("x".to_string(), Value::from(1)), ("y".to_string(), Value::from(2))]
            .into_iter()
            .collect();
        let b: ObjectMap = vec![("y".to_string(), Value::from(2)), ("x".to_string(), Value::from(1))]
            .into_iter()
            .collect();
        assert_eq!(Value::object(a), Value::object(b));
    }

    #[test]
    fn test_debug_marks_cycles() {
        let node = Value::array(vec![]);
        if let Value::Array(items) = &node {
            items.borrow_mut().push(node.clone());
        }
        assert_eq!(format!("{:?}", node), "[<cycle>]");
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(serde_json::json!({"a": [1, 2.5, null], "b": "x"}));
        let a = value.get("a").unwrap();
        assert_eq!(a.get(0).unwrap(), Value::from(1));
        assert_eq!(a.get(1).unwrap(), Value::from(2.5));
        assert!(a.get(2).unwrap().is_null());
        assert_eq!(value.get("b").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_to_plain_rejects_rich_values() {
        assert!(Value::Undefined.to_plain().is_err());
        assert!(Value::from(f64::NAN).to_plain().is_err());
        assert_eq!(
            value_of_json(serde_json::json!({"k": [true]})).to_plain().unwrap(),
            serde_json::json!({"k": [true]})
        );
    }

    fn value_of_json(json: JsonValue) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_typed_array_numbers() {
        let arr = TypedArray::Int16(vec![-1, 300]);
        let back = TypedArray::from_numbers("Int16Array", &arr.numbers()).unwrap();
        assert_eq!(arr, back);
        assert!(TypedArray::from_numbers("BigInt64Array", &[]).is_none());
    }
}
