//! Relationship kinds, edge records, and resolved join steps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How two tables relate. Carried on the edge at build time so the resolver
/// never re-derives it; adding a kind means adding a variant and a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelType {
    OneToOne,
    OneToMany,
    Recursive,
    Polymorphic,
    Embedded,
    Remote,
    Skip,
}

/// Weight marking an edge as recorded but never traversable.
pub(crate) const SKIP_WEIGHT: u32 = u32::MAX;

impl RelType {
    /// Traversal cost, lower preferred.
    pub fn weight(&self) -> u32 {
        match self {
            RelType::OneToOne | RelType::OneToMany => 1,
            RelType::Embedded => 5,
            RelType::Remote => 8,
            RelType::Recursive => 10,
            RelType::Polymorphic => 15,
            RelType::Skip => SKIP_WEIGHT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelType::OneToOne => "one_to_one",
            RelType::OneToMany => "one_to_many",
            RelType::Recursive => "recursive",
            RelType::Polymorphic => "polymorphic",
            RelType::Embedded => "embedded",
            RelType::Remote => "remote",
            RelType::Skip => "skip",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One stored relationship edge. Edges live in a flat arena keyed by ID;
/// `opposite_id` names the edge registered for the reverse direction and the
/// pointer is mutual for the life of the schema.
#[derive(Debug, Clone)]
pub struct RelEdge {
    pub id: usize,
    pub opposite_id: usize,
    pub from_node: usize,
    pub to_node: usize,
    pub weight: u32,
    pub rel_type: RelType,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
    /// Shorthand derived from the left column name.
    pub relation_name: String,
}

/// One hop of a resolved join path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub edge_id: usize,
    pub rel_type: RelType,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

/// A join step reshaped as an explicit relationship between two columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub rel_type: RelType,
    pub left: RelPoint,
    pub right: RelPoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelPoint {
    pub table: String,
    pub column: String,
}

pub fn path_to_rel(step: &JoinStep) -> Relationship {
    Relationship {
        rel_type: step.rel_type,
        left: RelPoint {
            table: step.left_table.clone(),
            column: step.left_column.clone(),
        },
        right: RelPoint {
            table: step.right_table.clone(),
            column: step.right_column.clone(),
        },
    }
}

/// Derives the relation shorthand from a foreign-key column name by
/// stripping the conventional id affixes. A name that strips to nothing
/// stays as-is.
pub fn rel_name(column: &str) -> &str {
    let stripped = column
        .strip_suffix("_id")
        .or_else(|| column.strip_suffix("_ids"))
        .or_else(|| column.strip_prefix("id_"))
        .or_else(|| column.strip_prefix("ids_"))
        .unwrap_or(column);
    if stripped.is_empty() {
        column
    } else {
        stripped
    }
}
