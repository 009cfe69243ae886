//! Path-indexed trees.
//!
//! A [`Tree`] stores one value per location inside a value graph. Each node holds a value and,
//! unless it is a leaf, a map from escaped path strings (see [`crate::path`]) to child trees. A
//! child key may span several segments (`"a.b"`); [`Tree::compress`] folds such keys into
//! genuine nesting wherever a shorter key is a prefix of a longer one.
//!
//! ## Wire shape
//!
//! A leaf is `[value]` and an inner node `[value, {key: subtree, ...}]`. Annotation trees use
//! `None` (`null`) as the root sentinel for "nothing to do at the root" and travel in their
//! [`CollapsedTree`] form, which drops that sentinel.
//!
//! ```rust
//! use indexmap::IndexMap;
//! use serde_lossless::tree::Tree;
//!
//! let mut children = IndexMap::new();
//! children.insert("a".to_string(), Tree::leaf(1));
//! children.insert("a.b".to_string(), Tree::leaf(2));
//! let mut tree = Tree::inner(0, children);
//! tree.compress();
//!
//! let mut visited = Vec::new();
//! tree.traverse(|value, path| visited.push((*value, path.join("/"))));
//! assert_eq!(visited, vec![(2, "a/b".to_string()), (1, "a".to_string()), (0, String::new())]);
//! ```

use crate::path::{delimiter_positions, parse_path, stringify_path, EMPTY_KEY};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;

/// Child map of an inner node, keyed by escaped path strings.
pub type Children<T> = IndexMap<String, Tree<T>>;

/// A node of a path-indexed tree: a leaf (`children == None`) or an inner node.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree<T> {
    pub value: T,
    pub children: Option<Children<T>>,
}

impl<T> Tree<T> {
    pub fn leaf(value: T) -> Self {
        Tree {
            value,
            children: None,
        }
    }

    pub fn inner(value: T, children: Children<T>) -> Self {
        Tree {
            value,
            children: Some(children),
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Depth-first post-order traversal: every child (in map order) before the node itself.
    ///
    /// `visit` receives each node's value and its full, unescaped path.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&T, &[String]),
    {
        let result: std::result::Result<(), Infallible> = self.try_traverse(|value, path| {
            visit(value, path);
            Ok(())
        });
        if let Err(never) = result {
            match never {}
        }
    }

    /// Post-order traversal that stops at the first error returned by `visit`.
    pub fn try_traverse<F, E>(&self, mut visit: F) -> std::result::Result<(), E>
    where
        F: FnMut(&T, &[String]) -> std::result::Result<(), E>,
    {
        self.traverse_from(&mut Vec::new(), &mut visit)
    }

    fn traverse_from<F, E>(&self, origin: &mut Vec<String>, visit: &mut F) -> std::result::Result<(), E>
    where
        F: FnMut(&T, &[String]) -> std::result::Result<(), E>,
    {
        if let Some(children) = &self.children {
            for (key, child) in children {
                let depth = origin.len();
                origin.extend(parse_path(key));
                let result = child.traverse_from(origin, visit);
                origin.truncate(depth);
                result?;
            }
        }
        visit(&self.value, origin)
    }

    /// Folds child keys that extend another child key under that key, recursively.
    ///
    /// Keys are visited fewest segments first (ties keep their order). A key whose longest
    /// already-accepted proper prefix (cut at an unescaped delimiter) is `p` moves under `p`,
    /// keyed by the rest of the key; any other key stays at this level. The set of
    /// `(value, path)` pairs the tree enumerates is unchanged.
    ///
    /// A cut at offset 0 leaves the single empty segment, which is keyed as [`EMPTY_KEY`].
    pub fn compress(&mut self) {
        let Some(origin) = self.children.take() else {
            return;
        };

        let mut entries: Vec<(String, Tree<T>)> = origin.into_iter().collect();
        entries.sort_by_cached_key(|(key, _)| delimiter_positions(key).len());

        let mut accepted: Children<T> = IndexMap::with_capacity(entries.len());
        for (key, subtree) in entries {
            let parent = delimiter_positions(&key)
                .into_iter()
                .rev()
                .find(|&at| accepted.contains_key(prefix_key(&key, at)));

            match parent.and_then(|at| accepted.get_mut(prefix_key(&key, at)).map(|p| (at, p))) {
                Some((at, parent)) => {
                    let rest = match &key[at + 1..] {
                        "" => EMPTY_KEY,
                        rest => rest,
                    };
                    parent
                        .children
                        .get_or_insert_with(IndexMap::new)
                        .insert(rest.to_string(), subtree);
                }
                None => {
                    accepted.insert(key, subtree);
                }
            }
        }

        for subtree in accepted.values_mut() {
            subtree.compress();
        }
        self.children = Some(accepted);
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|children| children.values())
            .map(Tree::len)
            .sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The key of the part of `key` before the delimiter at `at`.
fn prefix_key(key: &str, at: usize) -> &str {
    match &key[..at] {
        "" => EMPTY_KEY,
        prefix => prefix,
    }
}

impl<T> Tree<Option<T>> {
    /// Post-order traversal that skips an empty root.
    ///
    /// An empty value anywhere below the root means the tree is malformed and fails with
    /// [`Error::InvalidPayload`].
    pub fn traverse_ignoring_empty_root<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&T, &[String]) -> Result<()>,
    {
        self.try_traverse(|value, path| match value {
            Some(value) => visit(value, path),
            None if path.is_empty() => Ok(()),
            None => Err(Error::invalid_payload(format!(
                "empty annotation below the root at `{}`",
                stringify_path(path)
            ))),
        })
    }

    /// Drops the empty root sentinel, producing the compact wire shape.
    pub fn collapse_root(self) -> CollapsedTree<T> {
        match self {
            Tree {
                value: None,
                children: None,
            } => CollapsedTree::Absent,
            Tree {
                value: None,
                children: Some(children),
            } => CollapsedTree::Rootless(children),
            rooted => CollapsedTree::Rooted(rooted),
        }
    }
}

/// Compact form of a tree with an optional root value.
///
/// `expand_root(collapse_root(t)) == t` for every tree `t`.
#[derive(Clone, Debug, PartialEq)]
pub enum CollapsedTree<T> {
    /// Empty root, no children. Omitted from payloads.
    Absent,
    /// Empty root with children: just the child map, `{key: subtree}`.
    Rootless(Children<Option<T>>),
    /// A tree whose root carries a value.
    Rooted(Tree<Option<T>>),
}

impl<T> CollapsedTree<T> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, CollapsedTree::Absent)
    }

    /// Restores the empty root sentinel.
    pub fn expand_root(self) -> Tree<Option<T>> {
        match self {
            CollapsedTree::Absent => Tree::leaf(None),
            CollapsedTree::Rootless(children) => Tree::inner(None, children),
            CollapsedTree::Rooted(tree) => tree,
        }
    }
}

impl<T> Default for CollapsedTree<T> {
    fn default() -> Self {
        CollapsedTree::Absent
    }
}

impl<T: Serialize> Serialize for Tree<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.children {
            None => {
                let mut tuple = serializer.serialize_tuple(1)?;
                tuple.serialize_element(&self.value)?;
                tuple.end()
            }
            Some(children) => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(&self.value)?;
                tuple.serialize_element(children)?;
                tuple.end()
            }
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tree<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TreeVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for TreeVisitor<T> {
            type Value = Tree<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a tree node: [value] or [value, {path: node}]")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let value = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let children = seq.next_element()?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(Tree { value, children })
            }
        }

        deserializer.deserialize_seq(TreeVisitor(PhantomData))
    }
}

impl<T: Serialize> Serialize for CollapsedTree<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CollapsedTree::Absent => serializer.serialize_none(),
            CollapsedTree::Rootless(children) => children.serialize(serializer),
            CollapsedTree::Rooted(tree) => tree.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for CollapsedTree<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CollapsedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for CollapsedVisitor<T> {
            type Value = CollapsedTree<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("null, a map of path to tree node, or a tree node")
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CollapsedTree::Absent)
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CollapsedTree::Absent)
            }

            fn visit_seq<A>(self, seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                Tree::deserialize(SeqAccessDeserializer::new(seq)).map(CollapsedTree::Rooted)
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                IndexMap::deserialize(MapAccessDeserializer::new(map)).map(CollapsedTree::Rootless)
            }
        }

        deserializer.deserialize_any(CollapsedVisitor(PhantomData))
    }
}
