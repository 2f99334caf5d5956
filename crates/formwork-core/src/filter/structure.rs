use super::Filter;
use crate::{BindValue, Record, Type};

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum FilterNode {
    Filter(Filter),
    Structure(FilterStructure),
}

#[derive(Debug, Clone)]
pub struct FilterEntry {
    pub name: String,
    pub junction: Junction,
    pub node: FilterNode,
}

/// An ordered AND/OR tree of named filters.
///
/// Names are unique per level and looked up case-insensitively. The
/// junction of the first entry is ignored.
#[derive(Debug, Clone, Default)]
pub struct FilterStructure {
    /// Keyed by lower-cased entry name
    entries: IndexMap<String, FilterEntry>,
}

impl FilterStructure {
    pub fn new() -> FilterStructure {
        FilterStructure::default()
    }

    /// Append `node` with AND, replacing any entry already named `name`.
    pub fn and(&mut self, node: impl Into<FilterNode>, name: impl Into<String>) -> &mut Self {
        self.push(Junction::And, node.into(), name.into())
    }

    /// Append `node` with OR, replacing any entry already named `name`.
    pub fn or(&mut self, node: impl Into<FilterNode>, name: impl Into<String>) -> &mut Self {
        self.push(Junction::Or, node.into(), name.into())
    }

    fn push(&mut self, junction: Junction, node: FilterNode, name: String) -> &mut Self {
        let key = name.to_lowercase();

        // A replaced entry moves to the end
        self.entries.shift_remove(&key);
        self.entries.insert(
            key,
            FilterEntry {
                name,
                junction,
                node,
            },
        );
        self
    }

    /// Number of entries at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when serializing would produce no clause: no entries, or only
    /// nested structures that are themselves empty.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|entry| match &entry.node {
            FilterNode::Filter(_) => false,
            FilterNode::Structure(nested) => nested.is_empty(),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &FilterEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Find an entry by name at any depth.
    pub fn get(&self, name: &str) -> Option<&FilterNode> {
        let key = name.to_lowercase();
        self.find(&key)
    }

    fn find(&self, key: &str) -> Option<&FilterNode> {
        if let Some(entry) = self.entries.get(key) {
            return Some(&entry.node);
        }

        self.entries.values().find_map(|entry| match &entry.node {
            FilterNode::Structure(nested) => nested.find(key),
            FilterNode::Filter(_) => None,
        })
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FilterNode> {
        let key = name.to_lowercase();
        self.find_mut(&key)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut FilterNode> {
        if self.entries.contains_key(key) {
            return self.entries.get_mut(key).map(|entry| &mut entry.node);
        }

        self.entries
            .values_mut()
            .find_map(|entry| match &mut entry.node {
                FilterNode::Structure(nested) => nested.find_mut(key),
                FilterNode::Filter(_) => None,
            })
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        match self.get(name)? {
            FilterNode::Filter(filter) => Some(filter),
            FilterNode::Structure(_) => None,
        }
    }

    pub fn filter_mut(&mut self, name: &str) -> Option<&mut Filter> {
        match self.get_mut(name)? {
            FilterNode::Filter(filter) => Some(filter),
            FilterNode::Structure(_) => None,
        }
    }

    pub fn structure(&self, name: &str) -> Option<&FilterStructure> {
        match self.get(name)? {
            FilterNode::Structure(structure) => Some(structure),
            FilterNode::Filter(_) => None,
        }
    }

    pub fn structure_mut(&mut self, name: &str) -> Option<&mut FilterStructure> {
        match self.get_mut(name)? {
            FilterNode::Structure(structure) => Some(structure),
            FilterNode::Filter(_) => None,
        }
    }

    /// Remove the first entry named `name`, searching nested structures
    /// depth-first after this level.
    pub fn delete(&mut self, name: &str) -> Option<FilterNode> {
        let key = name.to_lowercase();
        self.remove(&key)
    }

    fn remove(&mut self, key: &str) -> Option<FilterNode> {
        if let Some(entry) = self.entries.shift_remove(key) {
            return Some(entry.node);
        }

        self.entries
            .values_mut()
            .find_map(|entry| match &mut entry.node {
                FilterNode::Structure(nested) => nested.remove(key),
                FilterNode::Filter(_) => None,
            })
    }

    pub fn as_sql(&self) -> String {
        let mut sql = String::new();

        for entry in self.entries.values() {
            let clause = match &entry.node {
                FilterNode::Filter(filter) => filter.as_sql(),
                FilterNode::Structure(nested) if nested.is_empty() => continue,
                FilterNode::Structure(nested) => format!("({})", nested.as_sql()),
            };

            if !sql.is_empty() {
                sql.push_str(match entry.junction {
                    Junction::And => " and ",
                    Junction::Or => " or ",
                });
            }

            sql.push_str(&clause);
        }

        sql
    }

    /// Evaluate left to right. An empty structure evaluates to `true`.
    pub fn evaluate(&self, record: &Record) -> bool {
        let mut result = None;

        for entry in self.entries.values() {
            if let FilterNode::Structure(nested) = &entry.node {
                if nested.is_empty() {
                    continue;
                }
            }

            match (result, entry.junction) {
                (Some(true), Junction::Or) | (Some(false), Junction::And) => continue,
                _ => {}
            }

            result = Some(entry.node.evaluate(record));
        }

        result.unwrap_or(true)
    }

    /// Bind values of every leaf, in pre-order.
    pub fn bind_values(&self) -> Vec<BindValue> {
        self.entries
            .values()
            .flat_map(|entry| entry.node.bind_values())
            .collect()
    }

    pub fn infer_types(&mut self, types: &IndexMap<String, Type>) {
        for entry in self.entries.values_mut() {
            match &mut entry.node {
                FilterNode::Filter(filter) => filter.infer_types(types),
                FilterNode::Structure(nested) => nested.infer_types(types),
            }
        }
    }
}

impl FilterNode {
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            FilterNode::Filter(filter) => filter.evaluate(record),
            FilterNode::Structure(structure) => structure.evaluate(record),
        }
    }

    pub fn as_sql(&self) -> String {
        match self {
            FilterNode::Filter(filter) => filter.as_sql(),
            FilterNode::Structure(structure) => structure.as_sql(),
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        match self {
            FilterNode::Filter(filter) => filter.bind_values(),
            FilterNode::Structure(structure) => structure.bind_values(),
        }
    }
}

impl From<Filter> for FilterNode {
    fn from(value: Filter) -> FilterNode {
        FilterNode::Filter(value)
    }
}

impl From<FilterStructure> for FilterNode {
    fn from(value: FilterStructure) -> FilterNode {
        FilterNode::Structure(value)
    }
}
