//! Schema construction: registers catalog tables as graph nodes, turns
//! foreign keys and declared relationships into mutual edge pairs, and
//! maintains the name index the resolver looks identifiers up in.
//!
//! Build once, read many. After `Schema::build` returns the value is
//! immutable and safe to share across threads.

use std::collections::HashMap;

use log::debug;

use crate::catalog::{Catalog, Column, ForeignKey, Table};
use crate::digraph::Digraph;

use super::errors::SchemaError;
use super::relationship::{rel_name, RelEdge, RelType};

/// Index entry: the adjacent node a lookup name refers to and the edges
/// reachable under that name. Every listed edge points into `node_id`.
#[derive(Debug, Clone)]
pub struct EdgeHandle {
    pub node_id: usize,
    pub edge_ids: Vec<usize>,
}

/// The live relationship graph plus lookup indices.
#[derive(Debug)]
pub struct Schema {
    pub(super) catalog: Catalog,
    pub(super) graph: Digraph,
    /// `schema:table` and `schema:alias` keys to node IDs.
    pub(super) nodes_by_key: HashMap<String, usize>,
    /// Node ID back to its `(schema, table)` pair.
    pub(super) node_tables: Vec<(String, String)>,
    /// Lookup name to candidate handles. Multimap: a name shared by a table
    /// and a relation shorthand keeps one handle per adjacent node.
    pub(super) edges_by_name: HashMap<String, Vec<EdgeHandle>>,
    /// Edge arena; cross-references between edges are IDs into this map.
    pub(super) all_edges: HashMap<usize, RelEdge>,
}

impl Schema {
    /// Builds the relationship graph for a catalog. `aliases` maps an
    /// unqualified table name to secondary names that resolve identically.
    /// Any relationship that references an unregistered table is fatal.
    pub fn build(
        catalog: Catalog,
        aliases: &HashMap<String, Vec<String>>,
    ) -> Result<Self, SchemaError> {
        let mut b = Builder::new(aliases);

        for table in &catalog.tables {
            if table.blocked {
                continue;
            }
            b.add_node(table)?;
        }

        for table in &catalog.tables {
            if table.blocked {
                continue;
            }
            for column in &table.columns {
                if column.blocked {
                    continue;
                }
                if let Some(fk) = &column.foreign_key {
                    b.add_fk_edges(table, column, fk)?;
                }
            }
        }

        for vt in &catalog.virtual_tables {
            let right_col = vt.id_column.clone();
            for target in &vt.targets {
                let left_col = catalog
                    .get_table(&vt.schema, target)
                    .and_then(|t| t.primary_col.as_ref())
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| vt.id_column.clone());
                b.add_declared_edges(
                    RelType::Polymorphic,
                    &vt.schema,
                    target,
                    &left_col,
                    &vt.name,
                    &right_col,
                )?;
            }
        }

        for table in &catalog.tables {
            for column in &table.columns {
                if let Some(target) = &column.embedded_table {
                    let right_col = catalog
                        .get_table(&table.schema, target)
                        .and_then(|t| t.primary_col.as_ref())
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| "id".to_string());
                    b.add_declared_edges(
                        RelType::Embedded,
                        &table.schema,
                        &table.name,
                        &column.name,
                        target,
                        &right_col,
                    )?;
                }
            }
        }

        for rel in &catalog.remote_rels {
            b.add_declared_edges(
                RelType::Remote,
                &rel.schema,
                &rel.table,
                &rel.column,
                &rel.target_table,
                &rel.target_column,
            )?;
        }

        debug!(
            "schema built: {} nodes, {} edges, {} lookup names",
            b.graph.node_count(),
            b.all_edges.len(),
            b.edges_by_name.len()
        );

        Ok(Schema {
            catalog,
            graph: b.graph,
            nodes_by_key: b.nodes_by_key,
            node_tables: b.node_tables,
            edges_by_name: b.edges_by_name,
            all_edges: b.all_edges,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn edge(&self, id: usize) -> Option<&RelEdge> {
        self.all_edges.get(&id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &RelEdge> {
        self.all_edges.values()
    }

    pub fn lookup_names(&self) -> impl Iterator<Item = &str> {
        self.edges_by_name.keys().map(String::as_str)
    }

    pub fn node_id(&self, schema: &str, table: &str) -> Option<usize> {
        self.nodes_by_key.get(&node_key(schema, table)).copied()
    }
}

pub(super) fn node_key(schema: &str, table: &str) -> String {
    format!("{schema}:{table}")
}

struct Builder<'a> {
    aliases: &'a HashMap<String, Vec<String>>,
    graph: Digraph,
    nodes_by_key: HashMap<String, usize>,
    node_tables: Vec<(String, String)>,
    edges_by_name: HashMap<String, Vec<EdgeHandle>>,
    all_edges: HashMap<usize, RelEdge>,
}

impl<'a> Builder<'a> {
    fn new(aliases: &'a HashMap<String, Vec<String>>) -> Self {
        Self {
            aliases,
            graph: Digraph::new(),
            nodes_by_key: HashMap::new(),
            node_tables: Vec::new(),
            edges_by_name: HashMap::new(),
            all_edges: HashMap::new(),
        }
    }

    /// The lookup names a table answers to: its own unqualified name plus
    /// every declared alias.
    fn name_keys(&self, table: &str) -> Vec<String> {
        let mut keys = vec![table.to_string()];
        if let Some(extra) = self.aliases.get(table) {
            keys.extend(extra.iter().cloned());
        }
        keys
    }

    fn add_node(&mut self, table: &Table) -> Result<(), SchemaError> {
        let key = node_key(&table.schema, &table.name);
        if self.nodes_by_key.contains_key(&key) {
            return Err(SchemaError::DuplicateNode { key });
        }
        let node = self.graph.add_node();
        self.node_tables.push((table.schema.clone(), table.name.clone()));
        self.nodes_by_key.insert(key, node);

        for name in self.name_keys(&table.name) {
            if name != table.name {
                let alias_key = node_key(&table.schema, &name);
                if let Some(&existing) = self.nodes_by_key.get(&alias_key) {
                    if existing != node {
                        return Err(SchemaError::DuplicateNode { key: alias_key });
                    }
                } else {
                    self.nodes_by_key.insert(alias_key, node);
                }
            }
            // Seed an empty handle so every table name resolves even before
            // any relationship references it.
            self.index_edge(&name, node, None);
        }
        Ok(())
    }

    fn node_for(
        &self,
        schema: &str,
        table: &str,
        left_table: &str,
        left_column: &str,
    ) -> Result<usize, SchemaError> {
        self.nodes_by_key
            .get(&node_key(schema, table))
            .copied()
            .ok_or_else(|| SchemaError::EdgeToUnknownTable {
                table: left_table.to_string(),
                column: left_column.to_string(),
                target: table.to_string(),
            })
    }

    /// Classifies and registers the edge pair for one foreign key, then
    /// indexes it under the relation shorthand and both table names.
    fn add_fk_edges(
        &mut self,
        table: &Table,
        column: &Column,
        fk: &ForeignKey,
    ) -> Result<(), SchemaError> {
        let from = self.node_for(&table.schema, &table.name, &table.name, &column.name)?;
        let to = self.node_for(&fk.schema, &fk.table, &table.name, &column.name)?;

        let (fwd_type, rev_type) = if from == to {
            (RelType::Recursive, RelType::Recursive)
        } else if column.unique_key {
            (RelType::OneToMany, RelType::OneToOne)
        } else {
            (RelType::OneToMany, RelType::OneToMany)
        };

        let relation = rel_name(&column.name).to_string();
        let (fwd_id, rev_id) = self.add_edge_pair(
            from,
            to,
            fwd_type,
            rev_type,
            &table.name,
            &column.name,
            &fk.table,
            &fk.column,
            &relation,
        );

        self.index_edge(&relation, to, Some(fwd_id));
        for name in self.name_keys(&fk.table) {
            self.index_edge(&name, to, Some(fwd_id));
        }
        for name in self.name_keys(&table.name) {
            self.index_edge(&name, from, Some(rev_id));
        }
        Ok(())
    }

    /// Edge pair for a declared (polymorphic, embedded, remote)
    /// relationship; the kind carries both directions.
    fn add_declared_edges(
        &mut self,
        rel_type: RelType,
        schema: &str,
        left_table: &str,
        left_column: &str,
        right_table: &str,
        right_column: &str,
    ) -> Result<(), SchemaError> {
        let from = self.node_for(schema, left_table, left_table, left_column)?;
        let to = self.node_for(schema, right_table, left_table, left_column)?;

        let relation = rel_name(left_column).to_string();
        let (fwd_id, rev_id) = self.add_edge_pair(
            from,
            to,
            rel_type,
            rel_type,
            left_table,
            left_column,
            right_table,
            right_column,
            &relation,
        );

        self.index_edge(&relation, to, Some(fwd_id));
        for name in self.name_keys(right_table) {
            self.index_edge(&name, to, Some(fwd_id));
        }
        for name in self.name_keys(left_table) {
            self.index_edge(&name, from, Some(rev_id));
        }
        Ok(())
    }

    /// Registers the forward and reverse edges with mutual back-pointers and
    /// records both in the arena. Returns `(forward_id, reverse_id)`.
    #[allow(clippy::too_many_arguments)]
    fn add_edge_pair(
        &mut self,
        from: usize,
        to: usize,
        fwd_type: RelType,
        rev_type: RelType,
        left_table: &str,
        left_column: &str,
        right_table: &str,
        right_column: &str,
        relation: &str,
    ) -> (usize, usize) {
        let fwd_id = self.graph.next_edge_id();
        let rev_id = fwd_id + 1;
        self.graph
            .add_edge(from, to, rev_id, fwd_type.weight(), left_column);
        self.graph
            .add_edge(to, from, fwd_id, rev_type.weight(), right_column);

        self.all_edges.insert(
            fwd_id,
            RelEdge {
                id: fwd_id,
                opposite_id: rev_id,
                from_node: from,
                to_node: to,
                weight: fwd_type.weight(),
                rel_type: fwd_type,
                left_table: left_table.to_string(),
                left_column: left_column.to_string(),
                right_table: right_table.to_string(),
                right_column: right_column.to_string(),
                relation_name: relation.to_string(),
            },
        );
        self.all_edges.insert(
            rev_id,
            RelEdge {
                id: rev_id,
                opposite_id: fwd_id,
                from_node: to,
                to_node: from,
                weight: rev_type.weight(),
                rel_type: rev_type,
                left_table: right_table.to_string(),
                left_column: right_column.to_string(),
                right_table: left_table.to_string(),
                right_column: left_column.to_string(),
                relation_name: rel_name(right_column).to_string(),
            },
        );
        debug!(
            "registered {} edge pair {}({}) <-> {}({})",
            fwd_type, left_table, left_column, right_table, right_column
        );
        (fwd_id, rev_id)
    }

    /// Appends an edge under a lookup name. A handle is reused when the name
    /// already refers to the same adjacent node, otherwise the name gains a
    /// second candidate handle.
    fn index_edge(&mut self, name: &str, node_id: usize, edge_id: Option<usize>) {
        let handles = self.edges_by_name.entry(name.to_string()).or_default();
        match handles.iter_mut().find(|h| h.node_id == node_id) {
            Some(handle) => {
                if let Some(id) = edge_id {
                    if !handle.edge_ids.contains(&id) {
                        handle.edge_ids.push(id);
                    }
                }
            }
            None => handles.push(EdgeHandle {
                node_id,
                edge_ids: edge_id.into_iter().collect(),
            }),
        }
    }
}
