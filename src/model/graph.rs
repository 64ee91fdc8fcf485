use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::model::{Entity, EntityId, Field, FieldId};

type ModelGraph = DiGraph<EntityId, FieldId, u32>;

/// How two adjacent entities on a path are joined.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The foreign key field.
    pub field: FieldId,
    /// `true` when the source entity holds the foreign key (many to one).
    pub forward: bool,
}

/// Immutable entity-relationship model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Model {
    pub(super) entities: Vec<Entity>,
    pub(super) fields: Vec<Field>,
    pub(super) entity_names: HashMap<String, EntityId>,
    pub(super) field_names: HashMap<String, FieldId>,
    /// Node `i` is entity `i`, edges run from the entity holding a foreign key to its target.
    pub(super) graph: ModelGraph,
}

impl Model {
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.entity_names.get(name).copied()
    }

    /// Looks up a field by its `entity.field` name.
    pub fn find_field(&self, full_name: &str) -> Option<FieldId> {
        self.field_names.get(full_name).copied()
    }

    pub fn entity_name(&self, id: EntityId) -> &str {
        self.entity(id).name()
    }

    pub fn field_name(&self, id: FieldId) -> &str {
        self.field(id).full_name()
    }

    /// Entity owning the field.
    pub fn field_entity(&self, id: FieldId) -> EntityId {
        self.field(id).entity()
    }

    pub fn id_field(&self, entity: EntityId) -> FieldId {
        self.entity(entity).id_field()
    }

    /// The first declared foreign key joining `from` and `to`, in either direction.
    pub fn relationship(&self, from: EntityId, to: EntityId) -> Option<Relationship> {
        let (a, b) = (node(from), node(to));
        let forward = self
            .graph
            .edges_connecting(a, b)
            .map(|e| *e.weight())
            .min()
            .map(|field| Relationship {
                field,
                forward: true,
            });
        let reverse = self
            .graph
            .edges_connecting(b, a)
            .map(|e| *e.weight())
            .min()
            .map(|field| Relationship {
                field,
                forward: false,
            });

        match (forward, reverse) {
            (Some(f), Some(r)) => Some(if f.field <= r.field { f } else { r }),
            (f, r) => f.or(r),
        }
    }

    /// Expected number of `to` rows reached from one `from` row.
    pub fn fan_out(&self, from: EntityId, to: EntityId) -> Option<f64> {
        self.relationship(from, to).map(|rel| {
            if rel.forward {
                1.0
            } else {
                self.entity(to).count() / self.entity(from).count()
            }
        })
    }

    /// Number of distinct entity combinations along a path.
    pub fn path_entries(&self, path: &[EntityId]) -> f64 {
        let Some(first) = path.first() else {
            return 0.0;
        };
        path.windows(2).fold(self.entity(*first).count(), |entries, hop| {
            entries * self.fan_out(hop[0], hop[1]).unwrap_or(1.0)
        })
    }

    /// Whether every consecutive pair on the path is joined by a foreign key.
    pub fn is_connected_path(&self, path: &[EntityId]) -> bool {
        path.windows(2)
            .all(|hop| self.relationship(hop[0], hop[1]).is_some())
    }

    /// Shortest foreign key path from `from` to `to` of at most `max_hops` hops.
    ///
    /// Breadth first over an explicit frontier; cycles are harmless because each entity is
    /// visited once.
    pub fn find_path(&self, from: EntityId, to: EntityId, max_hops: usize) -> Option<Vec<EntityId>> {
        let mut visited = vec![false; self.entities.len()];
        let mut predecessor: Vec<Option<EntityId>> = vec![None; self.entities.len()];
        let mut frontier = VecDeque::from([(from, 0usize)]);
        visited[from.index()] = true;

        while let Some((current, hops)) = frontier.pop_front() {
            if current == to {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(prev) = predecessor[cursor.index()] {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            if hops == max_hops {
                continue;
            }
            for next in self.neighbors(current) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    predecessor[next.index()] = Some(current);
                    frontier.push_back((next, hops + 1));
                }
            }
        }

        None
    }

    /// Entities joined to `entity` by a foreign key in either direction, ordered by id.
    pub fn neighbors(&self, entity: EntityId) -> Vec<EntityId> {
        let mut neighbors: Vec<EntityId> = self
            .graph
            .neighbors_undirected(node(entity))
            .map(|n| self.graph[n])
            .filter(|n| *n != entity)
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }
}

fn node(entity: EntityId) -> NodeIndex<u32> {
    NodeIndex::new(entity.index())
}
