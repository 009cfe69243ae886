//! The reverse walk: plain JSON plus annotations in, rich value out.
//!
//! Reconstruction runs in two phases. First every annotation is applied, children before
//! parents, replacing the plain value at its path with the inverse transform's output. Then
//! every equivalence group is restored: the canonical (first) path of each group is resolved,
//! and only once all canonical values are known is each written into its alias paths.

use crate::annotation::TypeAnnotation;
use crate::path::{parse_path, stringify_path};
use crate::registry::Registry;
use crate::transforms::resolve;
use crate::tree::CollapsedTree;
use crate::value::{ErrorValue, Instance, Shared};
use crate::{Error, ObjectMap, Result, Value};
use serde_json::Value as JsonValue;

/// Rebuilds a rich value from its plain form and metadata.
pub(crate) fn reconstruct(
    json: JsonValue,
    annotations: CollapsedTree<TypeAnnotation>,
    referential_equalities: &[Vec<String>],
    registry: &Registry,
) -> Result<Value> {
    let mut root = Value::from(json);

    annotations
        .expand_root()
        .traverse_ignoring_empty_root(|tag, path| {
            let inverse = resolve(tag, registry)?;
            log::trace!("applying {} at `{}`", tag, stringify_path(path));
            replace_at(&mut root, path, |value| inverse.apply(value))
        })?;

    let mut groups = Vec::with_capacity(referential_equalities.len());
    for group in referential_equalities {
        let (canonical, aliases) = group
            .split_first()
            .ok_or_else(|| Error::invalid_payload("empty equivalence group"))?;
        groups.push((value_at(&root, &parse_path(canonical))?, aliases));
    }
    for (target, aliases) in groups {
        for alias in aliases {
            log::trace!("restoring reference at `{}`", alias);
            replace_at(&mut root, &parse_path(alias), |_| Ok(target.clone()))?;
        }
    }

    Ok(root)
}

/// Returns the value at `path`, sharing identity with it.
fn value_at(root: &Value, path: &[String]) -> Result<Value> {
    if path.is_empty() {
        return Ok(root.clone());
    }
    locate(root, path).map(|slot| slot.get())
}

/// Replaces the value at `path` with `f` applied to it.
fn replace_at<F>(root: &mut Value, path: &[String], f: F) -> Result<()>
where
    F: FnOnce(Value) -> Result<Value>,
{
    if path.is_empty() {
        *root = f(std::mem::take(root))?;
        return Ok(());
    }

    let slot = locate(root, path)?;
    let replacement = f(slot.get())?;
    slot.set(replacement);
    Ok(())
}

/// A location inside a container. Existence is checked when the slot is created.
enum Slot {
    Item(Shared<Vec<Value>>, usize),
    Field(Shared<ObjectMap>, String),
    InstanceField(Shared<Instance>, String),
    ErrorProp(Shared<ErrorValue>, String),
    MapKey(Shared<Vec<(Value, Value)>>, usize),
    MapValue(Shared<Vec<(Value, Value)>>, usize),
}

impl Slot {
    fn get(&self) -> Value {
        match self {
            Slot::Item(items, i) => items.borrow()[*i].clone(),
            Slot::Field(fields, key) => fields.borrow().get(key).cloned().unwrap_or_default(),
            Slot::InstanceField(instance, key) => instance
                .borrow()
                .fields
                .get(key)
                .cloned()
                .unwrap_or_default(),
            Slot::ErrorProp(error, key) => error.borrow().props.get(key).cloned().unwrap_or_default(),
            Slot::MapKey(entries, i) => entries.borrow()[*i].0.clone(),
            Slot::MapValue(entries, i) => entries.borrow()[*i].1.clone(),
        }
    }

    fn set(&self, value: Value) {
        match self {
            Slot::Item(items, i) => items.borrow_mut()[*i] = value,
            Slot::Field(fields, key) => {
                fields.borrow_mut().insert(key.clone(), value);
            }
            Slot::InstanceField(instance, key) => {
                instance.borrow_mut().fields.insert(key.clone(), value);
            }
            Slot::ErrorProp(error, key) => {
                error.borrow_mut().props.insert(key.clone(), value);
            }
            Slot::MapKey(entries, i) => entries.borrow_mut()[*i].0 = value,
            Slot::MapValue(entries, i) => entries.borrow_mut()[*i].1 = value,
        }
    }
}

/// Follows a non-empty `path` from `root` to the slot it names.
fn locate(root: &Value, path: &[String]) -> Result<Slot> {
    let mut current = root.clone();
    let mut rest = path;

    loop {
        let (slot, consumed) = step(&current, rest, path)?;
        rest = &rest[consumed..];
        if rest.is_empty() {
            return Ok(slot);
        }
        current = slot.get();
    }
}

/// Resolves the first segment(s) of `rest` inside `current`, returning the slot and the number
/// of segments consumed. Map entries consume two: the entry index, then `0` (key) or `1` (value).
fn step(current: &Value, rest: &[String], path: &[String]) -> Result<(Slot, usize)> {
    let fail = |reason: String| Error::path_resolution(&stringify_path(path), &reason);
    let segment = &rest[0];

    let index = |len: usize| -> Result<usize> {
        match segment.parse::<usize>() {
            Ok(i) if i < len => Ok(i),
            Ok(i) => Err(fail(format!("index {} out of range for length {}", i, len))),
            Err(_) => Err(fail(format!("`{}` is not an index", segment))),
        }
    };
    let missing = |kind: &str| fail(format!("no {} `{}`", kind, segment));

    let slot = match current {
        Value::Array(items) | Value::Set(items) => {
            let i = index(items.borrow().len())?;
            Slot::Item(items.clone(), i)
        }
        Value::Object(fields) => {
            if !fields.borrow().contains_key(segment) {
                return Err(missing("field"));
            }
            Slot::Field(fields.clone(), segment.clone())
        }
        Value::Instance(instance) => {
            if !instance.borrow().fields.contains_key(segment) {
                return Err(missing("field"));
            }
            Slot::InstanceField(instance.clone(), segment.clone())
        }
        Value::Error(error) => {
            if !error.borrow().props.contains_key(segment) {
                return Err(missing("error property"));
            }
            Slot::ErrorProp(error.clone(), segment.clone())
        }
        Value::Map(entries) => {
            let i = index(entries.borrow().len())?;
            let slot = match rest.get(1).map(String::as_str) {
                Some("0") => Slot::MapKey(entries.clone(), i),
                Some("1") => Slot::MapValue(entries.clone(), i),
                Some(other) => return Err(fail(format!("map side must be 0 or 1, found `{}`", other))),
                None => return Err(fail("a map entry needs a side, 0 or 1".to_string())),
            };
            return Ok((slot, 2));
        }
        other => return Err(fail(format!("cannot descend into a {}", other.kind()))),
    };
    Ok((slot, 1))
}
