//! Registries for classes, symbols and custom transformers.
//!
//! A [`Registry`] holds everything the built-in transforms cannot know on their own: which
//! classes and symbols may cross the wire (and under which identifier), which custom
//! transformers to try, and which extra error properties to keep.
//!
//! ```rust
//! use serde_lossless::{Class, RegisterOptions, Registry};
//!
//! let user = Class::new("User");
//! let mut registry = Registry::new();
//! registry.register_class(&user, RegisterOptions::new()).unwrap();
//!
//! // Registering the same class twice is an error.
//! assert!(registry.register_class(&user, RegisterOptions::new()).is_err());
//! ```

use crate::{Class, Error, Result, Symbol, Value};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A user-supplied transform for values the built-in rules do not cover.
///
/// Transformers are tried in registration order after every built-in rule; the first one whose
/// [`is_applicable`](CustomTransformer::is_applicable) accepts a value encodes it.
///
/// ```rust
/// use serde_lossless::{CustomTransformer, Result, Value};
/// use serde_json::Value as JsonValue;
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f64);
///
/// struct CelsiusTransformer;
///
/// impl CustomTransformer for CelsiusTransformer {
///     fn is_applicable(&self, value: &Value) -> bool {
///         matches!(value, Value::Opaque(o) if o.downcast_ref::<Celsius>().is_some())
///     }
///
///     fn serialize(&self, value: &Value) -> Result<JsonValue> {
///         match value {
///             Value::Opaque(o) => Ok(JsonValue::from(o.downcast_ref::<Celsius>().map_or(0.0, |c| c.0))),
///             _ => Ok(JsonValue::Null),
///         }
///     }
///
///     fn deserialize(&self, json: JsonValue) -> Result<Value> {
///         Ok(Value::opaque(Celsius(json.as_f64().unwrap_or_default())))
///     }
/// }
/// ```
pub trait CustomTransformer {
    fn is_applicable(&self, value: &Value) -> bool;

    fn serialize(&self, value: &Value) -> Result<JsonValue>;

    fn deserialize(&self, json: JsonValue) -> Result<Value>;
}

/// Options for [`Registry::register_class`].
#[derive(Clone, Debug, Default)]
pub struct RegisterOptions {
    /// Identifier used on the wire. Defaults to the class name.
    pub identifier: Option<String>,
    /// If set, only these fields are serialized.
    pub allow_props: Option<Vec<String>>,
}

impl RegisterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_allow_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_props = Some(props.into_iter().map(Into::into).collect());
        self
    }
}

/// A registered class.
#[derive(Clone, Debug)]
pub struct ClassEntry {
    pub class: Class,
    pub allow_props: Option<Vec<String>>,
}

/// Two-way lookup between identifiers and identity-compared entries.
#[derive(Clone)]
struct IdentityRegistry<V> {
    kind: &'static str,
    by_identifier: IndexMap<String, V>,
    by_identity: HashMap<usize, String>,
}

impl<V> IdentityRegistry<V> {
    fn new(kind: &'static str) -> Self {
        IdentityRegistry {
            kind,
            by_identifier: IndexMap::new(),
            by_identity: HashMap::new(),
        }
    }

    fn register(&mut self, identifier: String, identity: usize, value: V) -> Result<()> {
        if let Some(existing) = self.by_identity.get(&identity) {
            return Err(Error::duplicate_registration(self.kind, existing));
        }
        if self.by_identifier.contains_key(&identifier) {
            return Err(Error::duplicate_registration(self.kind, &identifier));
        }

        log::debug!("registered {} `{}`", self.kind, identifier);
        self.by_identity.insert(identity, identifier.clone());
        self.by_identifier.insert(identifier, value);
        Ok(())
    }

    fn identifier_of(&self, identity: usize) -> Option<&str> {
        self.by_identity.get(&identity).map(String::as_str)
    }

    fn get(&self, identifier: &str) -> Option<&V> {
        self.by_identifier.get(identifier)
    }

    fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.by_identifier.keys().map(String::as_str)
    }
}

/// Class, symbol and custom transformer registrations plus the allowed error properties.
#[derive(Clone)]
pub struct Registry {
    classes: IdentityRegistry<ClassEntry>,
    symbols: IdentityRegistry<Symbol>,
    custom: IndexMap<String, Rc<dyn CustomTransformer>>,
    allowed_error_props: Vec<String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Registry {
            classes: IdentityRegistry::new("class"),
            symbols: IdentityRegistry::new("symbol"),
            custom: IndexMap::new(),
            allowed_error_props: Vec::new(),
        }
    }

    /// Registers a class so its instances keep their class across a round trip.
    pub fn register_class(&mut self, class: &Class, options: RegisterOptions) -> Result<()> {
        let identifier = options
            .identifier
            .unwrap_or_else(|| class.name().to_string());
        self.classes.register(
            identifier,
            class.identity(),
            ClassEntry {
                class: class.clone(),
                allow_props: options.allow_props,
            },
        )
    }

    /// Registers a symbol. The identifier defaults to the symbol's description.
    pub fn register_symbol(&mut self, symbol: &Symbol, identifier: Option<&str>) -> Result<()> {
        let identifier = identifier
            .or_else(|| symbol.description())
            .ok_or_else(|| Error::unsupported_type("a symbol without description needs an identifier"))?
            .to_string();
        self.symbols.register(identifier, symbol.identity(), symbol.clone())
    }

    /// Registers a custom transformer under `name`.
    pub fn register_custom<C>(&mut self, name: &str, transformer: C) -> Result<()>
    where
        C: CustomTransformer + 'static,
    {
        if self.custom.contains_key(name) {
            return Err(Error::duplicate_registration("custom transformer", name));
        }
        log::debug!("registered custom transformer `{}`", name);
        self.custom.insert(name.to_string(), Rc::new(transformer));
        Ok(())
    }

    /// Allows extra error properties (`stack`, or fields in [`ErrorValue::props`]) to be
    /// serialized.
    ///
    /// [`ErrorValue::props`]: crate::ErrorValue::props
    pub fn allow_error_props<I, S>(&mut self, props: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prop in props {
            let prop = prop.into();
            if !self.allowed_error_props.contains(&prop) {
                self.allowed_error_props.push(prop);
            }
        }
    }

    pub fn allowed_error_props(&self) -> &[String] {
        &self.allowed_error_props
    }

    pub(crate) fn class_identifier(&self, class: &Class) -> Option<&str> {
        self.classes.identifier_of(class.identity())
    }

    pub fn class(&self, identifier: &str) -> Option<&ClassEntry> {
        self.classes.get(identifier)
    }

    pub(crate) fn symbol_identifier(&self, symbol: &Symbol) -> Option<&str> {
        self.symbols.identifier_of(symbol.identity())
    }

    pub fn symbol(&self, identifier: &str) -> Option<&Symbol> {
        self.symbols.get(identifier)
    }

    /// The first custom transformer, in registration order, that accepts `value`.
    pub(crate) fn find_custom(&self, value: &Value) -> Option<(&str, &dyn CustomTransformer)> {
        self.custom
            .iter()
            .find(|(_, transformer)| transformer.is_applicable(value))
            .map(|(name, transformer)| (name.as_str(), transformer.as_ref()))
    }

    pub fn custom(&self, name: &str) -> Option<&dyn CustomTransformer> {
        self.custom.get(name).map(|transformer| transformer.as_ref())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes.identifiers().collect::<Vec<_>>())
            .field("symbols", &self.symbols.identifiers().collect::<Vec<_>>())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("allowed_error_props", &self.allowed_error_props)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl CustomTransformer for Never {
        fn is_applicable(&self, _: &Value) -> bool {
            false
        }

        fn serialize(&self, _: &Value) -> Result<JsonValue> {
            Ok(JsonValue::Null)
        }

        fn deserialize(&self, _: JsonValue) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_class_identifier_defaults_to_name() {
        let point = Class::new("Point");
        let mut registry = Registry::new();
        registry.register_class(&point, RegisterOptions::new()).unwrap();
        assert_eq!(registry.class_identifier(&point), Some("Point"));
        assert!(registry.class("Point").unwrap().class == point);
    }

    #[test]
    fn test_same_name_different_class_is_unregistered() {
        let mut registry = Registry::new();
        registry
            .register_class(&Class::new("Point"), RegisterOptions::new())
            .unwrap();
        assert_eq!(registry.class_identifier(&Class::new("Point")), None);
    }

    #[test]
    fn test_duplicate_identifier_fails() {
        let mut registry = Registry::new();
        registry
            .register_class(&Class::new("A"), RegisterOptions::new().with_identifier("x"))
            .unwrap();
        let err = registry
            .register_class(&Class::new("B"), RegisterOptions::new().with_identifier("x"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { kind: "class", .. }));
    }

    #[test]
    fn test_symbols() {
        let token = Symbol::new("token");
        let mut registry = Registry::new();
        registry.register_symbol(&token, None).unwrap();
        assert_eq!(registry.symbol_identifier(&token), Some("token"));
        assert!(registry.register_symbol(&token, Some("other")).is_err());
        assert!(registry.register_symbol(&Symbol::anonymous(), None).is_err());
        registry
            .register_symbol(&Symbol::anonymous(), Some("anon"))
            .unwrap();
        assert!(registry.symbol("anon").is_some());
    }

    #[test]
    fn test_custom_names_are_unique() {
        let mut registry = Registry::new();
        registry.register_custom("never", Never).unwrap();
        assert!(registry.register_custom("never", Never).is_err());
        assert!(registry.find_custom(&Value::Null).is_none());
        assert!(registry.custom("never").is_some());
    }

    #[test]
    fn test_allowed_error_props_are_deduplicated() {
        let mut registry = Registry::new();
        registry.allow_error_props(["stack", "code"]);
        registry.allow_error_props(vec!["code".to_string()]);
        assert_eq!(registry.allowed_error_props(), ["stack", "code"]);
    }
}
