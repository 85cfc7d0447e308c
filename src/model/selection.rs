use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::fmt;

/// One entry of a selection tree: either include the field as-is, or descend
/// into the related entity with a nested selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Leaf,
    Nested(SelectionTree),
}

impl Selection {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Selection::Leaf)
    }

    pub fn as_tree(&self) -> Option<&SelectionTree> {
        match self {
            Selection::Leaf => None,
            Selection::Nested(tree) => Some(tree),
        }
    }
}

// Leaves render as `true` so a parsed tree reads like `{"name": true, "address": {"city": true}}`
impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::Leaf => serializer.serialize_bool(true),
            Selection::Nested(tree) => tree.serialize(serializer),
        }
    }
}

/// Parsed `fields` parameter: field name -> leaf or nested tree.
///
/// Keys are unique per level and iterate in the order they were first
/// written. Equality ignores that order: `a,b` and `b,a` are the same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionTree {
    fields: IndexMap<String, Selection>,
}

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing (and returning) any earlier entry with the same
    /// name. A replaced entry keeps its original position.
    pub fn insert(&mut self, field: impl Into<String>, selection: Selection) -> Option<Selection> {
        self.fields.insert(field.into(), selection)
    }

    pub fn with_leaf(mut self, field: impl Into<String>) -> Self {
        self.insert(field, Selection::Leaf);
        self
    }

    pub fn with_nested(mut self, field: impl Into<String>, tree: SelectionTree) -> Self {
        self.insert(field, Selection::Nested(tree));
        self
    }

    pub fn get(&self, field: &str) -> Option<&Selection> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.fields.iter().map(|(field, selection)| (field.as_str(), selection))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of levels in the tree; `a(b(c))` has depth 3, an empty tree 0.
    pub fn depth(&self) -> usize {
        if self.fields.is_empty() {
            return 0;
        }
        1 + self
            .fields
            .values()
            .filter_map(Selection::as_tree)
            .map(SelectionTree::depth)
            .max()
            .unwrap_or(0)
    }
}

/// Renders the tree back into `fields` syntax, e.g. `name,address(city,zip)`.
impl fmt::Display for SelectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .fields
            .iter()
            .map(|(field, selection)| match selection {
                Selection::Leaf => field.clone(),
                Selection::Nested(tree) => format!("{}({})", field, tree),
            })
            .join(",");
        f.write_str(&rendered)
    }
}
