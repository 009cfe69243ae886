//! Field storage for objects, class instances and error properties.
//!
//! [`ObjectMap`] keeps fields in insertion order. Order plays no part in equality, but it is
//! kept in the plain output, so serializing the same value twice gives the same text and the
//! annotation paths come out in field order.
//!
//! ```rust
//! use serde_lossless::{stringify, ObjectMap, Value};
//!
//! let mut fields = ObjectMap::new();
//! fields.insert("zeta".to_string(), Value::Undefined);
//! fields.insert("alpha".to_string(), Value::from(1));
//!
//! assert_eq!(
//!     stringify(&Value::object(fields)).unwrap(),
//!     r#"{"json":{"zeta":null,"alpha":1},"meta":{"values":{"zeta":["undefined"]}}}"#
//! );
//! ```

use crate::Value;
use indexmap::IndexMap;

/// Insertion-ordered fields, keyed by name.
///
/// Members are [`Value`]s, so a container stored here is shared, not copied:
///
/// ```rust
/// use serde_lossless::{ObjectMap, Value};
///
/// let tags = Value::set(vec![]);
/// let fields: ObjectMap = vec![("tags".to_string(), tags.clone())].into_iter().collect();
/// assert!(fields.get("tags").unwrap().ptr_eq(&tags));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectMap(IndexMap<String, Value>);

impl ObjectMap {
    #[must_use]
    pub fn new() -> Self {
        ObjectMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ObjectMap(IndexMap::with_capacity(capacity))
    }

    /// Sets a field. Replacing an existing field returns the old value and keeps the field's
    /// position.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Removes a key, preserving the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Returns `true` if the map contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<IndexMap<String, Value>> for ObjectMap {
    fn from(map: IndexMap<String, Value>) -> Self {
        ObjectMap(map)
    }
}

impl IntoIterator for ObjectMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ObjectMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for ObjectMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        ObjectMap(IndexMap::from_iter(iter))
    }
}
