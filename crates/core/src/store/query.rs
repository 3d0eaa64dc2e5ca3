use std::fmt;

use super::Item;
use crate::document::DocumentKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    Equals(String),
    BeginsWith(String),
}

impl SortCondition {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            SortCondition::Equals(expected) => path == expected,
            SortCondition::BeginsWith(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// `type = :kind AND <sort condition on path>`
///
/// Targets the `(type, path)` index: the partition half is always an
/// equality on `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub kind: DocumentKind,
    pub path: SortCondition,
}

impl KeyCondition {
    pub fn path_prefix(kind: DocumentKind, prefix: impl Into<String>) -> Self {
        Self {
            kind,
            path: SortCondition::BeginsWith(prefix.into()),
        }
    }

    pub fn matches(&self, kind: DocumentKind, path: &str) -> bool {
        self.kind == kind && self.path.matches(path)
    }
}

impl fmt::Display for KeyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            SortCondition::Equals(p) => write!(f, "type = {:?} AND path = {p:?}", self.kind.as_str()),
            SortCondition::BeginsWith(p) => write!(
                f,
                "type = {:?} AND begins_with(path, {p:?})",
                self.kind.as_str()
            ),
        }
    }
}

/// Which fields of each matching item are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    All,
    Fields(&'static [&'static str]),
}

impl Projection {
    pub fn apply(&self, item: Item) -> Item {
        match self {
            Projection::All => item,
            Projection::Fields(fields) => item
                .into_iter()
                .filter(|(name, _)| fields.contains(&name.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub index_name: String,
    pub condition: KeyCondition,
    pub projection: Projection,
}

/// Escape `LIKE` metacharacters so a prefix matches literally.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
