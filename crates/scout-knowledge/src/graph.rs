use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use scout_core_types::{ActionId, StateId};

/// Directed multigraph over abstract states.
///
/// Each edge is keyed by the id of the abstract action whose traversal was
/// observed, so multiple edges between the same pair of states are allowed.
/// BTreeMap storage keeps every iteration order deterministic, which doubles
/// as the tie-break rule when a hop has several parallel actions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InteractionGraph {
    nodes: BTreeSet<StateId>,
    /// src -> dst -> action ids observed for that transition.
    edges: BTreeMap<StateId, BTreeMap<StateId, BTreeSet<ActionId>>>,
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, state: StateId) {
        self.nodes.insert(state);
    }

    pub fn contains_node(&self, state: &StateId) -> bool {
        self.nodes.contains(state)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StateId> {
        self.nodes.iter()
    }

    pub fn add_edge(&mut self, src: StateId, dst: StateId, action: ActionId) {
        self.nodes.insert(src.clone());
        self.nodes.insert(dst.clone());
        self.edges
            .entry(src)
            .or_default()
            .entry(dst)
            .or_default()
            .insert(action);
    }

    /// Remove one keyed edge. Returns whether the edge existed.
    pub fn remove_edge(&mut self, src: &StateId, dst: &StateId, action: &ActionId) -> bool {
        let Some(out) = self.edges.get_mut(src) else {
            return false;
        };
        let Some(keys) = out.get_mut(dst) else {
            return false;
        };
        let removed = keys.remove(action);
        if keys.is_empty() {
            out.remove(dst);
        }
        if out.is_empty() {
            self.edges.remove(src);
        }
        removed
    }

    /// Remove every edge keyed by `action`, wherever it sits. Returns the
    /// number of edges dropped.
    pub fn remove_edges_for_action(&mut self, action: &ActionId) -> usize {
        let mut removed = 0;
        self.edges.retain(|_, out| {
            out.retain(|_, keys| {
                if keys.remove(action) {
                    removed += 1;
                }
                !keys.is_empty()
            });
            !out.is_empty()
        });
        removed
    }

    /// Outgoing adjacency of `src`: (destination, edge keys) in id order.
    pub fn edges_from(&self, src: &StateId) -> impl Iterator<Item = (&StateId, &BTreeSet<ActionId>)> {
        self.edges.get(src).into_iter().flatten().map(|(d, k)| (d, k))
    }

    /// First edge key between `src` and `dst` in id order, if any.
    pub fn first_action_between(&self, src: &StateId, dst: &StateId) -> Option<&ActionId> {
        self.edges
            .get(src)
            .and_then(|out| out.get(dst))
            .and_then(|keys| keys.iter().next())
    }

    /// All edges as ordered `(src, dst, action)` triples.
    pub fn edge_triples(&self) -> Vec<(StateId, StateId, ActionId)> {
        let mut triples = Vec::new();
        for (src, out) in &self.edges {
            for (dst, keys) in out {
                for key in keys {
                    triples.push((src.clone(), dst.clone(), key.clone()));
                }
            }
        }
        triples
    }

    pub fn edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(|out| out.values())
            .map(|keys| keys.len())
            .sum()
    }

    /// Neighbors reachable when edge direction is disregarded, in id order.
    pub fn undirected_neighbors(&self, state: &StateId) -> BTreeSet<StateId> {
        let mut neighbors: BTreeSet<StateId> = self
            .edges
            .get(state)
            .map(|out| out.keys().cloned().collect())
            .unwrap_or_default();
        for (src, out) in &self.edges {
            if out.contains_key(state) {
                neighbors.insert(src.clone());
            }
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StateId {
        StateId(s.to_string())
    }

    fn aid(s: &str) -> ActionId {
        ActionId(s.to_string())
    }

    #[test]
    fn parallel_edges_are_kept_apart() {
        let mut g = InteractionGraph::new();
        g.add_edge(sid("s1"), sid("s2"), aid("a1"));
        g.add_edge(sid("s1"), sid("s2"), aid("a2"));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.first_action_between(&sid("s1"), &sid("s2")), Some(&aid("a1")));

        assert!(g.remove_edge(&sid("s1"), &sid("s2"), &aid("a1")));
        assert_eq!(g.first_action_between(&sid("s1"), &sid("s2")), Some(&aid("a2")));
        assert!(!g.remove_edge(&sid("s1"), &sid("s2"), &aid("a1")));
    }

    #[test]
    fn removing_last_edge_prunes_adjacency_but_keeps_nodes() {
        let mut g = InteractionGraph::new();
        g.add_edge(sid("s1"), sid("s2"), aid("a1"));
        assert!(g.remove_edge(&sid("s1"), &sid("s2"), &aid("a1")));
        assert_eq!(g.edge_count(), 0);
        assert!(g.contains_node(&sid("s1")));
        assert!(g.contains_node(&sid("s2")));
        assert!(g.first_action_between(&sid("s1"), &sid("s2")).is_none());
    }

    #[test]
    fn undirected_neighbors_see_both_directions() {
        let mut g = InteractionGraph::new();
        g.add_edge(sid("s1"), sid("s2"), aid("a1"));
        g.add_edge(sid("s3"), sid("s1"), aid("a2"));
        let neighbors = g.undirected_neighbors(&sid("s1"));
        assert!(neighbors.contains(&sid("s2")));
        assert!(neighbors.contains(&sid("s3")));
        assert_eq!(neighbors.len(), 2);
    }
}
