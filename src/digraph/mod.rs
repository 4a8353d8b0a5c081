//! Directed weighted multigraph of table nodes.
//!
//! Nodes are dense integer IDs. Parallel edges between the same node pair live
//! in a bucket keyed by the ordered `(from, to)` pair, each carrying a weight
//! and a back-pointer to the edge created for the reverse direction. Path
//! enumeration runs a best-first expansion over hop counts and leaves the
//! weight-sensitive edge choice to the caller.

mod min_heap;

use std::collections::{HashMap, HashSet};

use log::warn;

use min_heap::{MinHeap, PathState};

/// Upper bound on heap pops per enumeration. Dense schemas produce an
/// explosive number of candidate states; once the bound is hit the paths
/// found so far are returned as-is.
const MAX_POPS: usize = 3000;

/// One directed edge. `opposite_id` names the edge registered for the
/// reverse direction of the same relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: usize,
    pub opposite_id: usize,
    pub weight: u32,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct Digraph {
    edge_seq: usize,
    edges: HashMap<(usize, usize), Vec<GraphEdge>>,
    adj: Vec<Vec<usize>>,
}

impl Digraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self) -> usize {
        self.adj.push(Vec::new());
        self.adj.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// The ID the next `add_edge` call will mint. Callers adding an edge pair
    /// use this to wire mutual back-pointers up front.
    pub fn next_edge_id(&self) -> usize {
        self.edge_seq
    }

    /// Registers an edge and returns its ID. A neighbor appears once in the
    /// adjacency list no matter how many parallel edges connect to it.
    pub fn add_edge(
        &mut self,
        from: usize,
        to: usize,
        opposite_id: usize,
        weight: u32,
        name: &str,
    ) -> usize {
        let id = self.edge_seq;
        self.edge_seq += 1;
        self.edges.entry((from, to)).or_default().push(GraphEdge {
            id,
            opposite_id,
            weight,
            name: name.to_string(),
        });
        let neighbors = &mut self.adj[from];
        if !neighbors.contains(&to) {
            neighbors.push(to);
        }
        id
    }

    pub fn get_edges(&self, from: usize, to: usize) -> &[GraphEdge] {
        self.edges
            .get(&(from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        self.adj.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Enumerates simple node paths from `from` to `to`, cheapest hop count
    /// first. Re-entering a visited node is allowed only for the destination,
    /// so parallel routes that terminate at `to` stay discoverable. Distinct
    /// paths through shared prefixes are all emitted; only an exact repeat of
    /// an already-emitted node sequence is dropped.
    pub fn all_paths(&self, from: usize, to: usize) -> Vec<Vec<usize>> {
        let mut heap = MinHeap::new();
        heap.push(PathState {
            cost: 0,
            parent: None,
            path: vec![from],
        });

        let mut found: Vec<Vec<usize>> = Vec::new();
        let mut emitted: HashSet<Vec<usize>> = HashSet::new();
        // Transitions already expanded once. A state re-popped over the same
        // (parent, node) step contributes nothing new.
        let mut expanded: HashSet<(usize, usize)> = HashSet::new();
        let mut pops = 0usize;

        while let Some(state) = heap.pop() {
            pops += 1;
            if pops > MAX_POPS {
                warn!(
                    "path enumeration from node {} to {} stopped at {} pops, returning {} paths",
                    from,
                    to,
                    MAX_POPS,
                    found.len()
                );
                break;
            }

            let node = state.last();
            if let Some(parent) = state.parent {
                if !expanded.insert((parent, node)) {
                    continue;
                }
            }

            if node == to && state.path.len() > 1 && emitted.insert(state.path.clone()) {
                found.push(state.path.clone());
            }

            for &next in self.neighbors(node) {
                if state.visited(next) && next != to {
                    continue;
                }
                let mut path = state.path.clone();
                path.push(next);
                heap.push(PathState {
                    cost: state.cost + 1,
                    parent: Some(node),
                    path,
                });
            }
        }

        found
    }
}
