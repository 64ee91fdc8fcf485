use std::collections::HashMap;

use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};

use crate::model::{EntityId, FieldId, Model};

type EntityGraph = UnGraph<EntityId, FieldId, u32>;

/// Join structure of one statement.
///
/// Nodes are the entities a statement touches, edges the foreign keys joining them. The graph is
/// connected and rooted at the statement's base entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryGraph {
    graph: EntityGraph,
    root: NodeIndex<u32>,
    /// Hop distance of every node from the root, indexed by node.
    depths: Vec<usize>,
}

impl QueryGraph {
    /// Builds the graph of a statement path, `path[0]` being the root.
    ///
    /// # Return
    ///
    /// A description of the problem when the path is empty, repeats an entity or is not joined
    /// by foreign keys.
    pub fn from_path(model: &Model, path: &[EntityId]) -> Result<Self, String> {
        if path.is_empty() {
            return Err("empty path".to_string());
        }

        let mut graph = EntityGraph::default();
        let mut nodes = HashMap::new();
        for entity in path {
            if nodes.contains_key(entity) {
                return Err(format!(
                    "entity `{}` appears twice on the path",
                    model.entity_name(*entity)
                ));
            }
            nodes.insert(*entity, graph.add_node(*entity));
        }

        for hop in path.windows(2) {
            let relationship = model.relationship(hop[0], hop[1]).ok_or_else(|| {
                format!(
                    "no foreign key joins `{}` and `{}`",
                    model.entity_name(hop[0]),
                    model.entity_name(hop[1])
                )
            })?;
            graph.add_edge(nodes[&hop[0]], nodes[&hop[1]], relationship.field);
        }

        if connected_components(&graph) != 1 {
            return Err("statement graph is not connected".to_string());
        }

        let root = nodes[&path[0]];
        let distances = dijkstra(&graph, root, None, |_| 1usize);
        let depths = graph
            .node_indices()
            .map(|n| distances.get(&n).copied().unwrap_or(usize::MAX))
            .collect();

        Ok(Self {
            graph,
            root,
            depths,
        })
    }

    pub fn root(&self) -> EntityId {
        self.graph[self.root]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.graph.node_weights().any(|e| *e == entity)
    }

    /// Entities in breadth first order from the root.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut entities = Vec::with_capacity(self.graph.node_count());
        let mut bfs = Bfs::new(&self.graph, self.root);
        while let Some(node) = bfs.next(&self.graph) {
            entities.push(self.graph[node]);
        }
        entities
    }

    /// Longest shortest path between two entities, in hops.
    pub fn diameter(&self) -> usize {
        self.graph
            .node_indices()
            .map(|start| {
                dijkstra(&self.graph, start, None, |_| 1usize)
                    .into_values()
                    .max()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    }

    /// Walks from `start` towards the root, one hop closer each step.
    fn walk_to_root(&self, start: NodeIndex<u32>) -> Vec<EntityId> {
        let mut walk = vec![self.graph[start]];
        let mut current = start;
        while self.depths[current.index()] > 0 {
            let depth = self.depths[current.index()];
            let parent = self
                .graph
                .neighbors(current)
                .filter(|n| self.depths[n.index()] + 1 == depth)
                .min();
            match parent {
                Some(parent) => {
                    walk.push(self.graph[parent]);
                    current = parent;
                }
                None => break,
            }
        }
        walk
    }

    /// Nodes ordered deepest first, ties by insertion order.
    fn nodes_by_depth(&self) -> Vec<NodeIndex<u32>> {
        let mut nodes: Vec<_> = self.graph.node_indices().collect();
        nodes.sort_by(|a, b| {
            self.depths[b.index()]
                .cmp(&self.depths[a.index()])
                .then(a.index().cmp(&b.index()))
        });
        nodes
    }

    /// Every entity in the order a plan visits them: from the deepest entity back to the root.
    pub fn lookup_order(&self) -> Vec<EntityId> {
        self.nodes_by_depth()
            .first()
            .map(|deepest| self.walk_to_root(*deepest))
            .unwrap_or_default()
    }

    /// Every sub-path an index may span, oriented towards the root.
    pub fn lookup_paths(&self) -> Vec<Vec<EntityId>> {
        let mut paths = vec![];
        for start in self.nodes_by_depth() {
            let walk = self.walk_to_root(start);
            for len in 1..=walk.len() {
                paths.push(walk[..len].to_vec());
            }
        }
        paths
    }
}
