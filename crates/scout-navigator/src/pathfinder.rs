use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, trace};

use scout_core_types::{ActionId, StateId};
use scout_knowledge::{AppKnowledge, ExplorationFlag};

/// Fault-tolerant navigation path finder.
///
/// Translates graph routes into ordered action sequences. When the directed
/// graph yields nothing it prunes stale ineffective edges and falls back to an
/// undirected search — web apps often have back-navigation controls that were
/// never modeled as explicit actions. The whole procedure is bounded by
/// `max_retry`; pruning is idempotent after the first pass, so later attempts
/// are deliberate safety margin against concurrent graph mutation.
#[derive(Clone, Copy, Debug)]
pub struct PathFinder {
    max_retry: usize,
}

impl PathFinder {
    pub fn new(max_retry: usize) -> Self {
        Self { max_retry }
    }

    /// Route from `current` to the state where `target_action` is available.
    /// Empty when the action was never placed in the graph or no connection
    /// survives the retries.
    pub fn find_path(
        &self,
        knowledge: &mut AppKnowledge,
        current: &StateId,
        target_action: &ActionId,
    ) -> Vec<ActionId> {
        let Some(target_state) = knowledge
            .action(target_action)
            .and_then(|a| a.source_state.clone())
        else {
            debug!(action = %target_action, "target action has no source state");
            return Vec::new();
        };

        for attempt in 0..self.max_retry {
            if let Some(path) = self.directed_path(knowledge, current, &target_state) {
                return path;
            }
            trace!(attempt, "no directed path, pruning and widening");
            self.prune_ineffective_edges(knowledge);
            if let Some(path) = self.undirected_path(knowledge, current, &target_state) {
                return path;
            }
        }
        Vec::new()
    }

    /// Directed shortest-path wrapper used for back-tracking. Empty
    /// immediately when `src == dst`.
    pub fn path_to_state(
        &self,
        knowledge: &AppKnowledge,
        src: &StateId,
        dst: &StateId,
    ) -> Vec<ActionId> {
        if src == dst {
            return Vec::new();
        }
        self.directed_path(knowledge, src, dst).unwrap_or_default()
    }

    /// Shortest directed path by edge count; per hop the first edge key in id
    /// order represents the hop (non-uniqueness tolerance, not a contract).
    fn directed_path(
        &self,
        knowledge: &AppKnowledge,
        src: &StateId,
        dst: &StateId,
    ) -> Option<Vec<ActionId>> {
        if src == dst {
            return Some(Vec::new());
        }
        let mut parents: BTreeMap<StateId, StateId> = BTreeMap::new();
        let mut queue = VecDeque::from([src.clone()]);
        let mut seen = BTreeSet::from([src.clone()]);

        while let Some(node) = queue.pop_front() {
            for (next, _keys) in knowledge.graph.edges_from(&node) {
                if seen.insert(next.clone()) {
                    parents.insert(next.clone(), node.clone());
                    if next == dst {
                        return self.translate(knowledge, &parents, src, dst, false);
                    }
                    queue.push_back(next.clone());
                }
            }
        }
        None
    }

    /// Last-resort connectivity check over the undirected view of the graph.
    fn undirected_path(
        &self,
        knowledge: &AppKnowledge,
        src: &StateId,
        dst: &StateId,
    ) -> Option<Vec<ActionId>> {
        if src == dst {
            return Some(Vec::new());
        }
        let mut parents: BTreeMap<StateId, StateId> = BTreeMap::new();
        let mut queue = VecDeque::from([src.clone()]);
        let mut seen = BTreeSet::from([src.clone()]);

        while let Some(node) = queue.pop_front() {
            for next in knowledge.graph.undirected_neighbors(&node) {
                if seen.insert(next.clone()) {
                    parents.insert(next.clone(), node.clone());
                    if next == *dst {
                        return self.translate(knowledge, &parents, src, dst, true);
                    }
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Walk the parent chain back from `dst` and pick one representative
    /// action per hop.
    fn translate(
        &self,
        knowledge: &AppKnowledge,
        parents: &BTreeMap<StateId, StateId>,
        src: &StateId,
        dst: &StateId,
        undirected: bool,
    ) -> Option<Vec<ActionId>> {
        let mut nodes = vec![dst.clone()];
        let mut cursor = dst;
        while cursor != src {
            cursor = parents.get(cursor)?;
            nodes.push(cursor.clone());
        }
        nodes.reverse();

        let mut actions = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let forward = knowledge.graph.first_action_between(&pair[0], &pair[1]);
            let action = if undirected {
                forward.or_else(|| knowledge.graph.first_action_between(&pair[1], &pair[0]))
            } else {
                forward
            };
            actions.push(action?.clone());
        }
        Some(actions)
    }

    /// Drop every edge whose payload action is flagged ineffective, so stale
    /// topology stops misleading the directed search.
    fn prune_ineffective_edges(&self, knowledge: &mut AppKnowledge) {
        let stale: Vec<_> = knowledge
            .graph
            .edge_triples()
            .into_iter()
            .filter(|(_, _, action)| {
                knowledge
                    .action(action)
                    .map(|a| a.flag == ExplorationFlag::Ineffective)
                    .unwrap_or(true)
            })
            .collect();
        for (src, dst, action) in stale {
            knowledge.graph.remove_edge(&src, &dst, &action);
            debug!(%src, %dst, %action, "pruned stale edge");
        }
    }
}

impl Default for PathFinder {
    fn default() -> Self {
        Self { max_retry: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core_types::ActionType;
    use scout_knowledge::AbstractAction;

    fn action_with_id(id: &str) -> AbstractAction {
        let mut action = AbstractAction::new(ActionType::Click, vec![]);
        action.id = ActionId(id.to_string());
        action
    }

    /// home -> list -> detail chain plus an isolated island.
    fn chain() -> (AppKnowledge, StateId, StateId, StateId, StateId) {
        let mut k = AppKnowledge::new();
        let home = k.get_or_create_state("sig-home");
        let list = k.get_or_create_state("sig-list");
        let detail = k.get_or_create_state("sig-detail");
        let island = k.get_or_create_state("sig-island");

        let open_list = k.register_action(&home, action_with_id("a-open-list"));
        k.set_flag(&open_list, ExplorationFlag::Explored);
        k.add_edge(&home, &open_list, &list);

        let open_detail = k.register_action(&list, action_with_id("b-open-detail"));
        k.set_flag(&open_detail, ExplorationFlag::Explored);
        k.add_edge(&list, &open_detail, &detail);

        (k, home, list, detail, island)
    }

    #[test]
    fn routes_to_the_target_actions_source_state() {
        let (mut k, home, list, _detail, _island) = chain();
        let target = k.register_action(&list, action_with_id("c-target"));

        let path = PathFinder::default().find_path(&mut k, &home, &target);
        assert_eq!(path, vec![ActionId("a-open-list".into())]);
    }

    #[test]
    fn unplaced_action_fails_immediately() {
        let (mut k, home, ..) = chain();
        let mut stray = action_with_id("z-stray");
        stray.source_state = None;
        let stray_id = stray.id.clone();
        k.actions.insert(stray_id.clone(), stray);

        assert!(PathFinder::default()
            .find_path(&mut k, &home, &stray_id)
            .is_empty());
    }

    #[test]
    fn disconnected_target_yields_empty_after_retries_and_fallback() {
        let (mut k, home, _list, _detail, island) = chain();
        let target = k.register_action(&island, action_with_id("d-on-island"));

        let path = PathFinder::new(3).find_path(&mut k, &home, &target);
        assert!(path.is_empty());
    }

    #[test]
    fn undirected_fallback_bridges_reverse_edges() {
        // detail -> list exists only in the forward direction; from detail the
        // directed search fails but the undirected fallback finds the hop.
        let (mut k, _home, list, detail, _island) = chain();
        let target = k.register_action(&list, action_with_id("c-target"));

        let path = PathFinder::default().find_path(&mut k, &detail, &target);
        assert_eq!(path, vec![ActionId("b-open-detail".into())]);
    }

    #[test]
    fn multi_hop_route_orders_actions_source_first() {
        let (mut k, home, _list, detail, _island) = chain();
        let target = k.register_action(&detail, action_with_id("e-target"));

        let path = PathFinder::default().find_path(&mut k, &home, &target);
        assert_eq!(
            path,
            vec![
                ActionId("a-open-list".into()),
                ActionId("b-open-detail".into()),
            ]
        );
    }

    #[test]
    fn path_to_state_is_empty_for_the_trivial_route() {
        let (k, home, ..) = chain();
        assert!(PathFinder::default()
            .path_to_state(&k, &home, &home)
            .is_empty());
    }

    #[test]
    fn path_to_state_routes_directed_only() {
        let (k, home, list, detail, _island) = chain();
        let finder = PathFinder::default();
        assert_eq!(
            finder.path_to_state(&k, &home, &detail),
            vec![
                ActionId("a-open-list".into()),
                ActionId("b-open-detail".into()),
            ]
        );
        // no directed way back
        assert!(finder.path_to_state(&k, &detail, &list).is_empty());
    }

    #[test]
    fn failed_search_prunes_stale_ineffective_edges() {
        let (mut k, home, _list, _detail, island) = chain();
        // drift: an ineffective action still has an edge, added behind the
        // mutator's back, and an edge whose action left the model entirely
        let dead = k.register_action(&home, action_with_id("c-dead"));
        k.set_flag(&dead, ExplorationFlag::Ineffective);
        k.graph.add_edge(island.clone(), home.clone(), dead);
        k.graph
            .add_edge(island.clone(), home.clone(), ActionId("ghost".into()));

        let target = k.register_action(&island, action_with_id("d-target"));
        let path = PathFinder::default().find_path(&mut k, &home, &target);

        // still unreachable, but the stale topology is gone
        assert!(path.is_empty());
        assert!(!k.graph.edge_triples().iter().any(|(s, ..)| *s == island));
    }
}
