//! Join-path resolution over the relationship graph.
//!
//! `find_path` resolves the caller's `from` and `to` identifiers to candidate
//! handle sets, enumerates node paths between every handle pair, picks one
//! concrete edge per hop, and returns the cheapest surviving path as join
//! steps. The node enumeration ranks by hop count; edge weights decide
//! between surviving paths afterwards.

use log::debug;

use crate::digraph::GraphEdge;

use super::builder::{node_key, EdgeHandle, Schema};
use super::errors::SchemaError;
use super::relationship::{JoinStep, RelEdge, RelType, SKIP_WEIGHT};

/// A table adjacent to some starting table, with the relationship that
/// connects them. Feeds straight back into `find_path` identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedNode {
    pub schema: String,
    pub table: String,
    pub rel_type: RelType,
    pub edge_id: usize,
}

impl Schema {
    /// Resolves the cheapest join path between two identifiers. Either may
    /// be a table name, an alias, or a relation shorthand. A non-empty
    /// `through` constrains every candidate path to traverse that table.
    pub fn find_path(
        &self,
        from: &str,
        to: &str,
        through: &str,
    ) -> Result<Vec<JoinStep>, SchemaError> {
        let from_handles = self.handles(from).ok_or_else(|| {
            SchemaError::FromEdgeNotFound {
                name: from.to_string(),
            }
        })?;
        let to_handles = self.handles(to).ok_or_else(|| SchemaError::ToEdgeNotFound {
            name: to.to_string(),
        })?;

        let through_node = if through.is_empty() {
            None
        } else {
            let key = node_key(&self.catalog.schema, through);
            Some(*self.nodes_by_key.get(&key).ok_or_else(|| {
                SchemaError::ThroughNodeNotFound {
                    name: through.to_string(),
                }
            })?)
        };

        // (total edge weight, node count, picked edges), in discovery order.
        let mut candidates: Vec<(u32, usize, Vec<&RelEdge>)> = Vec::new();
        for f in from_handles {
            for t in to_handles {
                for node_path in self.graph.all_paths(f.node_id, t.node_id) {
                    if let Some(n) = through_node {
                        if !node_path.contains(&n) {
                            continue;
                        }
                    }
                    if let Some(edges) = self.pick_edges(&node_path, f, t) {
                        let weight = edges.iter().map(|e| e.weight).sum();
                        candidates.push((weight, node_path.len(), edges));
                    }
                }
            }
        }

        if candidates.is_empty() {
            return Err(SchemaError::PathNotFound {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        // Stable sort keeps discovery order among full ties.
        candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let (weight, _, edges) = &candidates[0];
        debug!(
            "resolved {} -> {} in {} hops (weight {}, {} candidates)",
            from,
            to,
            edges.len(),
            weight,
            candidates.len()
        );

        Ok(edges
            .iter()
            .map(|e| JoinStep {
                edge_id: e.id,
                rel_type: e.rel_type,
                left_table: e.left_table.clone(),
                left_column: e.left_column.clone(),
                right_table: e.right_table.clone(),
                right_column: e.right_column.clone(),
            })
            .collect())
    }

    /// Tables one hop away from `table`, one entry per connecting edge. A
    /// recursive relationship lists the table itself.
    pub fn first_degree(&self, table: &str) -> Vec<RelatedNode> {
        let Some(node) = self.node_id(&self.catalog.schema, table) else {
            return Vec::new();
        };
        self.adjacent(node, None)
    }

    /// Tables two hops away, gathered across every intermediate neighbor.
    /// The starting table itself is excluded.
    pub fn second_degree(&self, table: &str) -> Vec<RelatedNode> {
        let Some(node) = self.node_id(&self.catalog.schema, table) else {
            return Vec::new();
        };
        let mut related = Vec::new();
        for &mid in self.graph.neighbors(node) {
            if mid == node {
                continue;
            }
            related.extend(self.adjacent(mid, Some(node)));
        }
        related
    }

    /// Catalog lookup by table name. An empty schema name means the default
    /// schema.
    pub fn find(&self, schema: &str, table: &str) -> Result<&crate::catalog::Table, SchemaError> {
        let schema = if schema.is_empty() {
            &self.catalog.schema
        } else {
            schema
        };
        self.catalog
            .get_table(schema, table)
            .ok_or_else(|| SchemaError::TableNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
            })
    }

    fn handles(&self, name: &str) -> Option<&[EdgeHandle]> {
        self.edges_by_name
            .get(name)
            .map(Vec::as_slice)
            .filter(|h| !h.is_empty())
    }

    fn adjacent(&self, node: usize, exclude: Option<usize>) -> Vec<RelatedNode> {
        let mut related = Vec::new();
        for &neighbor in self.graph.neighbors(node) {
            if Some(neighbor) == exclude {
                continue;
            }
            for edge in self.graph.get_edges(node, neighbor) {
                let Some(rel) = self.all_edges.get(&edge.id) else {
                    continue;
                };
                let (schema, table) = &self.node_tables[neighbor];
                related.push(RelatedNode {
                    schema: schema.clone(),
                    table: table.clone(),
                    rel_type: rel.rel_type,
                    edge_id: rel.id,
                });
            }
        }
        related
    }

    /// Chooses one concrete edge per hop of a node path. The first hop must
    /// match the `from` intent, the last prefers the `to` intent, and no hop
    /// may traverse the reverse of the edge picked just before it. Returns
    /// None when any hop has no qualifying edge.
    fn pick_edges(
        &self,
        path: &[usize],
        from_handle: &EdgeHandle,
        to_handle: &EdgeHandle,
    ) -> Option<Vec<&RelEdge>> {
        let hops = path.len() - 1;
        let mut picked: Vec<&RelEdge> = Vec::with_capacity(hops);
        let mut prev_opposite: Option<usize> = None;

        for i in 1..path.len() {
            let bucket = self.graph.get_edges(path[i - 1], path[i]);
            let choice = if i == 1 {
                // Handles store edges pointing into their node, so an edge
                // leaving the start node matches through its opposite.
                bucket.iter().find(|e| {
                    e.weight != SKIP_WEIGHT
                        && (from_handle.edge_ids.contains(&e.id)
                            || from_handle.edge_ids.contains(&e.opposite_id))
                })
            } else if i == hops {
                bucket
                    .iter()
                    .find(|e| {
                        e.weight != SKIP_WEIGHT
                            && to_handle.edge_ids.contains(&e.id)
                            && Some(e.id) != prev_opposite
                    })
                    .or_else(|| min_weight_edge(bucket, prev_opposite))
            } else {
                min_weight_edge(bucket, prev_opposite)
            }?;

            prev_opposite = Some(choice.opposite_id);
            picked.push(self.all_edges.get(&choice.id)?);
        }

        Some(picked)
    }
}

/// Cheapest traversable edge in a bucket, excluding the reverse of the
/// previously picked edge. Insertion order breaks ties.
fn min_weight_edge(bucket: &[GraphEdge], prev_opposite: Option<usize>) -> Option<&GraphEdge> {
    let mut best: Option<&GraphEdge> = None;
    for edge in bucket {
        if edge.weight == SKIP_WEIGHT || Some(edge.id) == prev_opposite {
            continue;
        }
        if best.map(|b| edge.weight < b.weight).unwrap_or(true) {
            best = Some(edge);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::testing::test_catalog;

    fn blog_schema() -> Schema {
        Schema::build(test_catalog(), &HashMap::new()).unwrap()
    }

    #[test]
    fn direct_edge_beats_two_hop_route() {
        let s = blog_schema();
        let steps = s.find_path("comments", "users", "").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].left_table, "comments");
        assert_eq!(steps[0].left_column, "user_id");
        assert_eq!(steps[0].right_table, "users");
        assert_eq!(steps[0].right_column, "id");
    }

    #[test]
    fn unknown_identifiers_fail_by_side() {
        let s = blog_schema();
        assert_eq!(
            s.find_path("nope", "users", "").unwrap_err(),
            SchemaError::FromEdgeNotFound {
                name: "nope".to_string()
            }
        );
        assert_eq!(
            s.find_path("users", "nope", "").unwrap_err(),
            SchemaError::ToEdgeNotFound {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn unknown_through_table_fails() {
        let s = blog_schema();
        assert_eq!(
            s.find_path("comments", "users", "missing").unwrap_err(),
            SchemaError::ThroughNodeNotFound {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn find_defaults_to_the_catalog_schema() {
        let s = blog_schema();
        assert_eq!(s.find("", "posts").unwrap().name, "posts");
        assert!(matches!(
            s.find("", "ghosts"),
            Err(SchemaError::TableNotFound { .. })
        ));
    }

    #[test]
    fn degree_queries_on_unknown_table_are_empty() {
        let s = blog_schema();
        assert!(s.first_degree("ghosts").is_empty());
        assert!(s.second_degree("ghosts").is_empty());
    }
}
