//! The forward walk: rich value in, plain JSON plus annotations out.

use crate::annotation::TypeAnnotation;
use crate::path::stringify_path;
use crate::registry::Registry;
use crate::transforms::{transform_value, Encoded};
use crate::tree::{CollapsedTree, Tree};
use crate::{Error, Options, Result, Value};
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Everything a walk produces.
#[derive(Debug)]
pub(crate) struct Walked {
    pub json: JsonValue,
    pub annotations: CollapsedTree<TypeAnnotation>,
    pub referential_equalities: Vec<Vec<String>>,
}

/// Walks `value`, encoding every location that plain JSON cannot express.
pub(crate) fn walk(value: &Value, registry: &Registry, options: &Options) -> Result<Walked> {
    let mut walker = Walker {
        registry,
        max_depth: options.max_depth,
        seen: IndexMap::new(),
        tags: Vec::new(),
    };
    let json = walker.walk(value, &mut Vec::new(), 0)?;

    let referential_equalities: Vec<Vec<String>> = walker
        .seen
        .into_values()
        .filter(|paths| paths.len() > 1)
        .map(|paths| paths.iter().map(|path| stringify_path(path)).collect())
        .collect();
    log::debug!(
        "walked value: {} annotations, {} equivalence groups",
        walker.tags.len(),
        referential_equalities.len()
    );

    Ok(Walked {
        json,
        annotations: annotation_tree(walker.tags),
        referential_equalities,
    })
}

/// Builds the compressed, root-collapsed annotation tree from a flat list of tags.
fn annotation_tree(tags: Vec<(Vec<String>, TypeAnnotation)>) -> CollapsedTree<TypeAnnotation> {
    let mut root = Tree::leaf(None);
    let mut children = IndexMap::new();

    for (path, tag) in tags {
        if path.is_empty() {
            root.value = Some(tag);
        } else {
            children.insert(stringify_path(&path), Tree::leaf(Some(tag)));
        }
    }

    if !children.is_empty() {
        root.children = Some(children);
        root.compress();
    }
    root.collapse_root()
}

struct Walker<'a> {
    registry: &'a Registry,
    max_depth: usize,
    /// Paths at which each reference was seen, first-seen order.
    seen: IndexMap<usize, Vec<Vec<String>>>,
    tags: Vec<(Vec<String>, TypeAnnotation)>,
}

impl Walker<'_> {
    fn walk(&mut self, value: &Value, path: &mut Vec<String>, depth: usize) -> Result<JsonValue> {
        if depth > self.max_depth {
            return Err(Error::DepthLimitExceeded(self.max_depth));
        }

        if let Some(identity) = value.identity() {
            let paths = self.seen.entry(identity).or_default();
            paths.push(path.clone());
            if paths.len() > 1 {
                log::trace!(
                    "repeated reference at `{}`, first seen at `{}`",
                    stringify_path(path),
                    stringify_path(&paths[0])
                );
                return Ok(JsonValue::Null);
            }
        }

        if let Some((tag, encoded)) = transform_value(value, self.registry)? {
            self.tags.push((path.clone(), tag));
            return match encoded {
                Encoded::Plain(json) => Ok(json),
                Encoded::Items(items) => self.walk_items(&items, path, depth),
                Encoded::Fields(fields) => {
                    self.walk_fields(fields.iter().map(|(k, v)| (k, v)), path, depth)
                }
                Encoded::Entries(entries) => self.walk_entries(&entries, path, depth),
            };
        }

        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) => Ok(n.to_json()),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Array(items) => self.walk_items(&items.borrow(), path, depth),
            Value::Object(fields) => self.walk_fields(fields.borrow().iter(), path, depth),
            Value::Instance(instance) => {
                let instance = instance.borrow();
                log::debug!(
                    "instance of unregistered class `{}` at `{}` is emitted as a plain object",
                    instance.class.name(),
                    stringify_path(path)
                );
                self.walk_fields(instance.fields.iter(), path, depth)
            }
            other => {
                log::debug!(
                    "{} at `{}` has no plain representation and is emitted as null",
                    other.kind(),
                    stringify_path(path)
                );
                Ok(JsonValue::Null)
            }
        }
    }

    fn walk_member(
        &mut self,
        value: &Value,
        segment: String,
        path: &mut Vec<String>,
        depth: usize,
    ) -> Result<JsonValue> {
        path.push(segment);
        let result = self.walk(value, path, depth + 1);
        path.pop();
        result
    }

    fn walk_items(&mut self, items: &[Value], path: &mut Vec<String>, depth: usize) -> Result<JsonValue> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.walk_member(item, i.to_string(), path, depth))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array)
    }

    fn walk_fields<'v, I>(&mut self, fields: I, path: &mut Vec<String>, depth: usize) -> Result<JsonValue>
    where
        I: Iterator<Item = (&'v String, &'v Value)>,
    {
        let mut object = JsonMap::new();
        for (key, value) in fields {
            let json = self.walk_member(value, key.clone(), path, depth)?;
            object.insert(key.clone(), json);
        }
        Ok(JsonValue::Object(object))
    }

    fn walk_entries(
        &mut self,
        entries: &[(Value, Value)],
        path: &mut Vec<String>,
        depth: usize,
    ) -> Result<JsonValue> {
        let mut pairs = Vec::with_capacity(entries.len());
        for (i, (key, value)) in entries.iter().enumerate() {
            path.push(i.to_string());
            let key = self.walk_member(key, "0".to_string(), path, depth);
            let value = key.and_then(|key| {
                let value = self.walk_member(value, "1".to_string(), path, depth)?;
                Ok(JsonValue::Array(vec![key, value]))
            });
            path.pop();
            pairs.push(value?);
        }
        Ok(JsonValue::Array(pairs))
    }
}
