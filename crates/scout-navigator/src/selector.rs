use scout_core_types::{ActionId, StateId};
use scout_knowledge::AppKnowledge;

/// Picks the next abstract action to attempt.
///
/// Deliberately deterministic: lowest action id first, never random, so runs
/// are reproducible. Two tiers — unexplored actions of the current state are
/// preferred so a screen gets finished before the agent wanders; only then is
/// the global unexplored set consulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionSelector;

impl ActionSelector {
    pub fn new() -> Self {
        Self
    }

    /// `None` only when the global unexplored set is empty.
    pub fn select_action(
        &self,
        knowledge: &AppKnowledge,
        current_state: Option<&StateId>,
    ) -> Option<ActionId> {
        if let Some(state) = current_state.and_then(|id| knowledge.state(id)) {
            // BTreeSet iteration yields ids in ascending order.
            if let Some(local) = state
                .actions
                .iter()
                .find(|id| knowledge.unexplored().contains(*id))
            {
                return Some(local.clone());
            }
        }
        knowledge.unexplored().iter().next().cloned()
    }
}
