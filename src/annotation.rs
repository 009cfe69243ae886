//! Type annotations: the tags recorded in the annotation tree.
//!
//! On the wire a simple tag is a string (`"Date"`), a composite tag a two-element array of a
//! keyword and an argument (`["class", "User"]`), and a chain any other array of tags, applied
//! in order when reconstructing.

use serde::de::value::SeqAccessDeserializer;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, SerializeSeq, SerializeTuple, Serializer};
use std::fmt;

const TYPED_ARRAY: &str = "typed-array";
const CLASS: &str = "class";
const SYMBOL: &str = "symbol";
const CUSTOM: &str = "custom";

/// A tag naming the transform that produced the plain value at one location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAnnotation {
    Undefined,
    /// NaN or an infinity, encoded by name.
    Number,
    BigInt,
    Date,
    RegExp,
    Error,
    Set,
    Map,
    /// Typed array with the given constructor name, e.g. `Uint8Array`.
    TypedArray(String),
    /// Instance of the class registered under this identifier.
    Class(String),
    /// The symbol registered under this identifier.
    Symbol(String),
    /// Output of the custom transformer registered under this name.
    Custom(String),
    /// Several tags, applied in order.
    Chain(Vec<TypeAnnotation>),
    /// A simple tag this crate does not know. Kept so that the failure surfaces when the
    /// annotation is applied, not while the payload is read.
    Unrecognized(String),
}

impl TypeAnnotation {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "undefined" => TypeAnnotation::Undefined,
            "number" => TypeAnnotation::Number,
            "bigint" => TypeAnnotation::BigInt,
            "Date" => TypeAnnotation::Date,
            "regexp" => TypeAnnotation::RegExp,
            "Error" => TypeAnnotation::Error,
            "set" => TypeAnnotation::Set,
            "map" => TypeAnnotation::Map,
            other => TypeAnnotation::Unrecognized(other.to_string()),
        }
    }

    fn composite(keyword: &str, argument: String) -> Option<Self> {
        match keyword {
            TYPED_ARRAY => Some(TypeAnnotation::TypedArray(argument)),
            CLASS => Some(TypeAnnotation::Class(argument)),
            SYMBOL => Some(TypeAnnotation::Symbol(argument)),
            CUSTOM => Some(TypeAnnotation::Custom(argument)),
            _ => None,
        }
    }

    fn simple_tag(&self) -> Option<&str> {
        Some(match self {
            TypeAnnotation::Undefined => "undefined",
            TypeAnnotation::Number => "number",
            TypeAnnotation::BigInt => "bigint",
            TypeAnnotation::Date => "Date",
            TypeAnnotation::RegExp => "regexp",
            TypeAnnotation::Error => "Error",
            TypeAnnotation::Set => "set",
            TypeAnnotation::Map => "map",
            TypeAnnotation::Unrecognized(tag) => tag,
            _ => return None,
        })
    }

    fn composite_parts(&self) -> Option<(&'static str, &str)> {
        match self {
            TypeAnnotation::TypedArray(ctor) => Some((TYPED_ARRAY, ctor)),
            TypeAnnotation::Class(id) => Some((CLASS, id)),
            TypeAnnotation::Symbol(id) => Some((SYMBOL, id)),
            TypeAnnotation::Custom(name) => Some((CUSTOM, name)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = self.simple_tag() {
            return write!(f, "\"{}\"", tag);
        }
        if let Some((keyword, argument)) = self.composite_parts() {
            return write!(f, "[\"{}\", \"{}\"]", keyword, argument);
        }
        if let TypeAnnotation::Chain(tags) = self {
            f.write_str("[")?;
            for (i, tag) in tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", tag)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl Serialize for TypeAnnotation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let Some(tag) = self.simple_tag() {
            return serializer.serialize_str(tag);
        }
        if let Some((keyword, argument)) = self.composite_parts() {
            let mut tuple = serializer.serialize_tuple(2)?;
            tuple.serialize_element(keyword)?;
            tuple.serialize_element(argument)?;
            return tuple.end();
        }

        let tags = match self {
            TypeAnnotation::Chain(tags) => &tags[..],
            _ => &[][..],
        };
        let mut seq = serializer.serialize_seq(Some(tags.len()))?;
        for tag in tags {
            seq.serialize_element(tag)?;
        }
        seq.end()
    }
}

/// One element of an array-shaped annotation, before we know whether the array is a
/// composite tag or a chain.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Element {
    Tag(String),
    Nested(TypeAnnotation),
}

impl<'de> Deserialize<'de> for TypeAnnotation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AnnotationVisitor;

        impl<'de> Visitor<'de> for AnnotationVisitor {
            type Value = TypeAnnotation;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a type tag string or an array of tags")
            }

            fn visit_str<E>(self, tag: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TypeAnnotation::from_tag(tag))
            }

            fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let elements = Vec::<Element>::deserialize(SeqAccessDeserializer::new(seq))?;

                if let [Element::Tag(keyword), Element::Tag(argument)] = &elements[..] {
                    if let Some(tag) = TypeAnnotation::composite(keyword, argument.clone()) {
                        return Ok(tag);
                    }
                }
                if elements.is_empty() {
                    return Err(de::Error::invalid_length(0, &self));
                }

                Ok(TypeAnnotation::Chain(
                    elements
                        .into_iter()
                        .map(|element| match element {
                            Element::Tag(tag) => TypeAnnotation::from_tag(&tag),
                            Element::Nested(tag) => tag,
                        })
                        .collect(),
                ))
            }
        }

        deserializer.deserialize_any(AnnotationVisitor)
    }
}
