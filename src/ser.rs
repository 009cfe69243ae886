//! Conversion of `Serialize` types into rich values.
//!
//! [`to_value`] runs any [`serde::Serialize`] type through [`ValueSerializer`], which maps the
//! serde data model onto [`Value`]:
//!
//! - structs and maps with string keys become objects; maps with other keys become `Map`s
//! - integers outside the `i64` range become `BigInt`s
//! - byte buffers become `Uint8Array` typed arrays
//! - `None` and `()` become `null`
//! - enum variants are externally tagged, as in `serde_json`
//!
//! ```rust
//! use serde::Serialize;
//! use serde_lossless::{to_value, serialize};
//! use std::collections::BTreeMap;
//!
//! #[derive(Serialize)]
//! struct Account {
//!     id: u64,
//!     balance: u128,
//!     limits: BTreeMap<u8, String>,
//! }
//!
//! let mut limits = BTreeMap::new();
//! limits.insert(1, "daily".to_string());
//! let account = Account { id: 7, balance: u128::MAX, limits };
//!
//! let value = to_value(&account).unwrap();
//! let payload = serialize(&value).unwrap();
//! assert_eq!(payload.json["balance"], "340282366920938463463374607431768211455");
//! assert_eq!(payload.json["limits"], serde_json::json!([[1, "daily"]]));
//! ```

use crate::value::{Number, TypedArray};
use crate::{Error, ObjectMap, Result, Value};
use num_bigint::BigInt;
use serde::ser::{self, Serialize};

/// Converts any `Serialize` type into a [`Value`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// A serializer whose output is a [`Value`].
pub struct ValueSerializer;

pub struct SerializeVec {
    vec: Vec<Value>,
    variant: Option<&'static str>,
}

pub struct SerializeMap {
    entries: Vec<(Value, Value)>,
    current_key: Option<Value>,
    variant: Option<&'static str>,
}

fn wide_integer<I>(v: I) -> Value
where
    I: Copy + Into<BigInt> + TryInto<i64>,
{
    match v.try_into() {
        Ok(small) => Value::Number(Number::Integer(small)),
        Err(_) => Value::BigInt(v.into()),
    }
}

/// Wraps `value` as `{variant: value}`.
fn tagged(variant: &'static str, value: Value) -> Value {
    let mut fields = ObjectMap::with_capacity(1);
    fields.insert(variant.to_string(), value);
    Value::object(fields)
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeMap;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v)))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(wide_integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::Number(Number::Integer(v as i64)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(wide_integer(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(wide_integer(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Number(Number::from(v as f64)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Number(Number::from(v)))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::TypedArray(TypedArray::Uint8(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Ok(tagged(variant, to_value(value)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVec> {
        Ok(SerializeVec::new(len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap::new(None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeMap> {
        Ok(SerializeMap::new(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeMap> {
        Ok(SerializeMap::new(Some(variant)))
    }
}

impl SerializeVec {
    fn new(capacity: usize, variant: Option<&'static str>) -> Self {
        SerializeVec {
            vec: Vec::with_capacity(capacity),
            variant,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.vec.push(to_value(value)?);
        Ok(())
    }

    fn finish(self) -> Value {
        let array = Value::array(self.vec);
        match self.variant {
            Some(variant) => tagged(variant, array),
            None => array,
        }
    }
}

impl SerializeMap {
    fn new(variant: Option<&'static str>) -> Self {
        SerializeMap {
            entries: Vec::new(),
            current_key: None,
            variant,
        }
    }

    /// An object if every key is a string, a `Map` otherwise.
    fn finish(self) -> Value {
        let value = if self.entries.iter().all(|(key, _)| key.is_string()) {
            Value::object(
                self.entries
                    .into_iter()
                    .filter_map(|(key, value)| match key {
                        Value::String(key) => Some((key, value)),
                        _ => None,
                    })
                    .collect(),
            )
        } else {
            Value::map(self.entries)
        };
        match self.variant {
            Some(variant) => tagged(variant, value),
            None => value,
        }
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.current_key = Some(to_value(key)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.entries.push((key, to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.entries
            .push((Value::String(key.to_string()), to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.entries
            .push((Value::String(key.to_string()), to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: String,
        email: Option<String>,
    }

    #[derive(Serialize)]
    enum Shape {
        Point,
        Circle(f64),
        Rect(u8, u8),
        Labeled { text: String },
    }

    #[test]
    fn test_struct_becomes_object() {
        let user = User {
            id: 1,
            name: "Ann".to_string(),
            email: None,
        };
        let value = to_value(&user).unwrap();
        assert_eq!(value.get("id").unwrap(), Value::from(1));
        assert_eq!(value.get("name").unwrap().as_str(), Some("Ann"));
        assert!(value.get("email").unwrap().is_null());
    }

    #[test]
    fn test_wide_integers() {
        assert_eq!(to_value(&7u64).unwrap(), Value::from(7));
        assert_eq!(
            to_value(&u64::MAX).unwrap(),
            Value::BigInt(BigInt::from(u64::MAX))
        );
        assert_eq!(
            to_value(&i128::MIN).unwrap(),
            Value::BigInt(BigInt::from(i128::MIN))
        );
        assert_eq!(to_value(&-3i128).unwrap(), Value::from(-3));
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(to_value(&f64::NAN).unwrap(), Value::Number(Number::NaN));
        assert_eq!(to_value(&f32::INFINITY).unwrap(), Value::Number(Number::Infinity));
    }

    #[test]
    fn test_maps_by_key_type() {
        let mut named = HashMap::new();
        named.insert("a".to_string(), 1);
        assert!(to_value(&named).unwrap().is_object());

        let mut numbered = BTreeMap::new();
        numbered.insert(2u8, "two");
        let value = to_value(&numbered).unwrap();
        assert_eq!(
            value,
            Value::map(vec![(Value::from(2), Value::from("two"))])
        );
    }

    #[test]
    fn test_bytes_become_typed_array() {
        let value = to_value(&Bytes(&[1, 2, 3])).unwrap();
        assert_eq!(value, Value::TypedArray(TypedArray::Uint8(vec![1, 2, 3])));
    }

    struct Bytes<'a>(&'a [u8]);

    impl Serialize for Bytes<'_> {
        fn serialize<S: ser::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    #[test]
    fn test_enum_variants_are_externally_tagged() {
        assert_eq!(to_value(&Shape::Point).unwrap(), Value::from("Point"));

        let circle = to_value(&Shape::Circle(1.5)).unwrap();
        assert_eq!(circle.get("Circle").unwrap(), Value::from(1.5));

        let rect = to_value(&Shape::Rect(2, 3)).unwrap();
        assert_eq!(
            rect.get("Rect").unwrap(),
            Value::array(vec![Value::from(2), Value::from(3)])
        );

        let labeled = to_value(&Shape::Labeled {
            text: "t".to_string(),
        })
        .unwrap();
        assert_eq!(
            labeled.get("Labeled").unwrap().get("text").unwrap().as_str(),
            Some("t")
        );
    }
}
