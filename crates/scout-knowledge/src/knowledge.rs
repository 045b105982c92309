use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use scout_core_types::{ActionId, ConcreteAction, PageSnapshot, StateId};

use crate::graph::InteractionGraph;
use crate::model::{AbstractAction, AbstractState, ExplorationFlag};

/// One audit-log entry: what we saw, what we did, what we saw next.
///
/// The bootstrap observation is recorded too, with both `prev` fields empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTraceItem {
    pub prev_snapshot: Option<PageSnapshot>,
    pub action: Option<ConcreteAction>,
    pub new_snapshot: PageSnapshot,
}

/// Aggregate root of everything learned about the application.
///
/// Owns all states and actions in flat id-keyed tables; the graph and all
/// back-references store ids only, so there are no ownership cycles.
///
/// Invariant: `unexplored` is exactly the set of action ids whose flag is
/// [`ExplorationFlag::Unexplored`]. Every flag mutation must go through
/// [`AppKnowledge::set_flag`] to keep the index consistent.
#[derive(Clone, Debug, Default)]
pub struct AppKnowledge {
    pub states: BTreeMap<StateId, AbstractState>,
    pub actions: BTreeMap<ActionId, AbstractAction>,
    pub graph: InteractionGraph,
    pub raw_trace: Vec<RawTraceItem>,
    unexplored: BTreeSet<ActionId>,
}

impl AppKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &StateId) -> Option<&AbstractState> {
        self.states.get(id)
    }

    pub fn state_mut(&mut self, id: &StateId) -> Option<&mut AbstractState> {
        self.states.get_mut(id)
    }

    pub fn action(&self, id: &ActionId) -> Option<&AbstractAction> {
        self.actions.get(id)
    }

    pub fn action_mut(&mut self, id: &ActionId) -> Option<&mut AbstractAction> {
        self.actions.get_mut(id)
    }

    pub fn find_state_by_signature(&self, signature: &str) -> Option<&AbstractState> {
        self.states.values().find(|s| s.signature == signature)
    }

    /// Return the state stored under `signature`, creating it when absent.
    pub fn get_or_create_state(&mut self, signature: &str) -> StateId {
        if let Some(existing) = self.find_state_by_signature(signature) {
            return existing.id.clone();
        }
        let state = AbstractState::new(signature);
        let id = state.id.clone();
        self.graph.add_node(id.clone());
        self.states.insert(id.clone(), state);
        debug!(state = %id, "created abstract state");
        id
    }

    /// Insert a new action into the global table, the owning state's action
    /// set, and the unexplored index.
    pub fn register_action(&mut self, state_id: &StateId, mut action: AbstractAction) -> ActionId {
        action.source_state = Some(state_id.clone());
        let id = action.id.clone();
        if action.flag == ExplorationFlag::Unexplored {
            self.unexplored.insert(id.clone());
        }
        if let Some(state) = self.states.get_mut(state_id) {
            state.actions.insert(id.clone());
        }
        debug!(action = %id, kind = %action.action_type, elements = action.elements.len(),
            "registered abstract action");
        self.actions.insert(id.clone(), action);
        id
    }

    /// The single flag mutator. Keeps the unexplored index in lockstep and
    /// drops every graph edge keyed by an action the moment it turns
    /// ineffective, so the graph never carries edges for ineffective actions.
    /// Returns false when the action id is unknown.
    pub fn set_flag(&mut self, id: &ActionId, flag: ExplorationFlag) -> bool {
        let Some(action) = self.actions.get_mut(id) else {
            return false;
        };
        let prev = action.flag;
        action.flag = flag;
        if prev == ExplorationFlag::Unexplored && flag != ExplorationFlag::Unexplored {
            self.unexplored.remove(id);
        }
        if prev != ExplorationFlag::Unexplored && flag == ExplorationFlag::Unexplored {
            self.unexplored.insert(id.clone());
        }
        if flag == ExplorationFlag::Ineffective {
            let removed = self.graph.remove_edges_for_action(id);
            if removed > 0 {
                debug!(action = %id, removed, "pruned edges of ineffective action");
            }
        }
        true
    }

    pub fn unexplored(&self) -> &BTreeSet<ActionId> {
        &self.unexplored
    }

    /// Whether `state` still has at least one unexplored action.
    pub fn has_unexplored_in(&self, state: &StateId) -> bool {
        self.states
            .get(state)
            .map(|s| s.actions.iter().any(|a| self.unexplored.contains(a)))
            .unwrap_or(false)
    }

    pub fn push_trace(
        &mut self,
        prev_snapshot: Option<PageSnapshot>,
        action: Option<ConcreteAction>,
        new_snapshot: PageSnapshot,
    ) {
        self.raw_trace.push(RawTraceItem {
            prev_snapshot,
            action,
            new_snapshot,
        });
    }

    /// Record the observed transition `src --action--> dst` and update the
    /// action's back-references.
    pub fn add_edge(&mut self, src: &StateId, action_id: &ActionId, dst: &StateId) {
        self.graph
            .add_edge(src.clone(), dst.clone(), action_id.clone());
        if let Some(action) = self.actions.get_mut(action_id) {
            action.source_state = Some(src.clone());
            action.target_state = Some(dst.clone());
        }
    }

    pub(crate) fn restore_unexplored(&mut self, ids: BTreeSet<ActionId>) {
        self.unexplored = ids;
    }
}
