//! The serialized form: plain JSON plus optional metadata.
//!
//! ```json
//! {
//!   "json": {"when": "2020-01-01T00:00:00.000Z", "a": [1], "b": null},
//!   "meta": {
//!     "values": {"when": ["Date"]},
//!     "referentialEqualities": [["a", "b"]]
//!   }
//! }
//! ```
//!
//! `meta` is omitted when there is nothing to record, and so is each of its fields.

use crate::annotation::TypeAnnotation;
use crate::tree::CollapsedTree;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A serialized value.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::{serialize, value};
///
/// let payload = serialize(&value!({"n": 1})).unwrap();
/// assert!(payload.meta.is_none());
/// assert_eq!(payload.json, serde_json::json!({"n": 1}));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub json: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Metadata needed to rebuild a value from its plain form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Where each transform applies.
    #[serde(default, skip_serializing_if = "CollapsedTree::is_absent")]
    pub values: CollapsedTree<TypeAnnotation>,
    /// Groups of paths that hold the same reference; the first path of each group is canonical.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referential_equalities: Vec<Vec<String>>,
}

impl Meta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_absent() && self.referential_equalities.is_empty()
    }
}

impl Payload {
    /// Builds a payload, dropping `meta` if it records nothing.
    pub fn new(json: JsonValue, meta: Meta) -> Self {
        Payload {
            json,
            meta: if meta.is_empty() { None } else { Some(meta) },
        }
    }
}
