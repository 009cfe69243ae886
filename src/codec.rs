//! The entry point: a [`Codec`] owns a [`Registry`] and [`Options`] and converts values to
//! and from payloads.

use crate::payload::{Meta, Payload};
use crate::registry::{CustomTransformer, RegisterOptions, Registry};
use crate::{annotator, walker, Class, Error, Options, Result, Symbol, Value};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Serializes rich values into payloads and reconstructs them.
///
/// The free functions [`serialize`](crate::serialize), [`deserialize`](crate::deserialize),
/// [`stringify`](crate::stringify) and [`parse`](crate::parse) use a default codec, which knows
/// the built-in transforms only. Create a codec to register classes, symbols or custom
/// transformers.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::{Class, Codec, ObjectMap, RegisterOptions, Value};
///
/// let point = Class::new("Point");
/// let mut codec = Codec::new();
/// codec.register_class(&point, RegisterOptions::new()).unwrap();
///
/// let mut fields = ObjectMap::new();
/// fields.insert("x".to_string(), Value::from(1));
/// let text = codec.stringify(&Value::instance(&point, fields)).unwrap();
/// assert_eq!(text, r#"{"json":{"x":1},"meta":{"values":[["class","Point"]]}}"#);
///
/// let back = codec.parse(&text).unwrap();
/// assert!(matches!(back, Value::Instance(ref i) if i.borrow().class == point));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Codec {
    registry: Registry,
    options: Options,
}

impl Codec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Codec {
            registry: Registry::new(),
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers a class. See [`Registry::register_class`].
    pub fn register_class(&mut self, class: &Class, options: RegisterOptions) -> Result<()> {
        self.registry.register_class(class, options)
    }

    /// Registers a symbol. See [`Registry::register_symbol`].
    pub fn register_symbol(&mut self, symbol: &Symbol, identifier: Option<&str>) -> Result<()> {
        self.registry.register_symbol(symbol, identifier)
    }

    /// Registers a custom transformer. See [`Registry::register_custom`].
    pub fn register_custom<C>(&mut self, name: &str, transformer: C) -> Result<()>
    where
        C: CustomTransformer + 'static,
    {
        self.registry.register_custom(name, transformer)
    }

    /// Allows extra error properties to be serialized. See [`Registry::allow_error_props`].
    pub fn allow_error_props<I, S>(&mut self, props: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.allow_error_props(props);
    }

    /// Converts a rich value into its plain form plus metadata.
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn serialize(&self, value: &Value) -> Result<Payload> {
        let walked = walker::walk(value, &self.registry, &self.options)?;
        Ok(Payload::new(
            walked.json,
            Meta {
                values: walked.annotations,
                referential_equalities: walked.referential_equalities,
            },
        ))
    }

    /// Rebuilds a rich value from a payload.
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn deserialize(&self, payload: Payload) -> Result<Value> {
        let Payload { json, meta } = payload;
        let meta = meta.unwrap_or_default();
        annotator::reconstruct(
            json,
            meta.values,
            &meta.referential_equalities,
            &self.registry,
        )
    }

    /// Rebuilds a rich value from a payload held as JSON.
    ///
    /// A payload of the wrong shape fails with [`Error::InvalidPayload`](crate::Error::InvalidPayload).
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn deserialize_json(&self, payload: JsonValue) -> Result<Value> {
        self.deserialize(serde_json::from_value(payload)?)
    }

    /// Serializes a rich value to payload text, pretty-printed if the options say so.
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn stringify(&self, value: &Value) -> Result<String> {
        let payload = self.serialize(value)?;
        let text = if self.options.pretty {
            serde_json::to_string_pretty(&payload)?
        } else {
            serde_json::to_string(&payload)?
        };
        Ok(text)
    }

    /// Parses payload text and rebuilds the rich value.
    ///
    /// Anything [`stringify`](Codec::stringify) writes under the same options parses back.
    /// Text nesting far deeper than `max_depth` allows is refused up front with
    /// [`Error::DepthLimitExceeded`](crate::Error::DepthLimitExceeded).
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn parse(&self, text: &str) -> Result<Value> {
        check_nesting(text, self.options.max_depth)?;

        let mut de = serde_json::Deserializer::from_str(text);
        de.disable_recursion_limit();
        let payload = Payload::deserialize(&mut de)?;
        de.end()?;
        self.deserialize(payload)
    }
}

/// Bracket nesting a payload needs for values up to `max_depth` deep.
///
/// Map entries take two levels per value level and so do annotation tree nodes; the rest is
/// the payload envelope.
fn nesting_limit(max_depth: usize) -> usize {
    max_depth.saturating_mul(2).saturating_add(16)
}

/// Scans `text` for `[` and `{` outside strings and fails once they nest past the limit.
fn check_nesting(text: &str, max_depth: usize) -> Result<()> {
    let limit = nesting_limit(max_depth);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return Err(Error::DepthLimitExceeded(max_depth));
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ObjectMap};
    use serde_json::json;

    #[test]
    fn test_deserialize_json_rejects_wrong_shape() {
        let codec = Codec::new();
        assert!(matches!(
            codec.deserialize_json(json!([1, 2])),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            codec.deserialize_json(json!({"meta": {}})),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_parse_reports_syntax_errors() {
        assert!(matches!(Codec::new().parse("{\"json\": "), Err(Error::Json(_))));
    }

    #[test]
    fn test_registrations_go_through_registry() {
        let mut codec = Codec::new();
        codec
            .register_class(&Class::new("A"), RegisterOptions::new())
            .unwrap();
        assert!(codec.registry().class("A").is_some());

        let token = Symbol::new("token");
        codec.register_symbol(&token, None).unwrap();
        let payload = codec.serialize(&Value::Symbol(token.clone())).unwrap();
        assert_eq!(payload.json, json!("token"));
        assert_eq!(codec.deserialize(payload).unwrap(), Value::Symbol(token));
    }

    #[test]
    fn test_check_nesting_skips_strings() {
        let text = format!(r#"{{"json":"{}\"{}"}}"#, "[".repeat(100), "{".repeat(100));
        assert!(check_nesting(&text, 1).is_ok());
        let expected = format!("{}\"{}", "[".repeat(100), "{".repeat(100));
        assert_eq!(Codec::new().parse(&text).unwrap(), Value::from(expected));
    }

    #[test]
    fn test_parse_rejects_runaway_nesting() {
        let text = format!(r#"{{"json":{}{}}}"#, "[".repeat(100), "]".repeat(100));
        let codec = Codec::with_options(Options::new().with_max_depth(10));
        assert!(matches!(codec.parse(&text), Err(Error::DepthLimitExceeded(10))));
        assert!(Codec::new().parse(&text).is_ok());
    }

    #[test]
    fn test_parse_beyond_serde_json_recursion_limit() {
        let mut value = Value::from(1);
        for _ in 0..200 {
            value = Value::array(vec![value]);
        }
        let codec = Codec::with_options(Options::new().with_max_depth(200));
        let text = codec.stringify(&value).unwrap();
        assert_eq!(codec.parse(&text).unwrap(), value);
    }

    #[test]
    fn test_parse_rejects_trailing_text() {
        assert!(matches!(
            Codec::new().parse(r#"{"json": 1} 2"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_pretty_output() {
        let codec = Codec::with_options(Options::pretty());
        let mut fields = ObjectMap::new();
        fields.insert("a".to_string(), Value::from(1));
        let text = codec.stringify(&Value::object(fields)).unwrap();
        assert_eq!(text, "{\n  \"json\": {\n    \"a\": 1\n  }\n}");
    }
}
