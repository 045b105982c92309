//! JSON persistence for [`AppKnowledge`].
//!
//! The on-disk layout keeps the model tables, the ordered edge triples and the
//! unexplored index explicit; the raw trace is carried as one base64-encoded
//! JSON blob for size reasons. `from_value(to_value(k))` reconstructs a
//! knowledge whose graph topology, flags and unexplored index are identical.

use std::collections::{BTreeMap, BTreeSet};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use scout_core_types::{ActionId, ActionType, ElementGroup, StateId};

use crate::errors::KnowledgeError;
use crate::knowledge::{AppKnowledge, RawTraceItem};
use crate::model::{AbstractAction, AbstractState, ExplorationFlag, UIElement};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateRecord {
    pub signature: String,
    pub actions: Vec<ActionId>,
    #[serde(default)]
    pub page_description: String,
    #[serde(default)]
    pub element_groups: Vec<ElementGroup>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action_type: ActionType,
    pub flag: ExplorationFlag,
    pub src: Option<StateId>,
    pub dst: Option<StateId>,
    pub elements: Vec<String>,
    #[serde(default)]
    pub function: String,
}

/// Serializable image of one [`AppKnowledge`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    pub abstract_states: BTreeMap<StateId, StateRecord>,
    pub abstract_actions: BTreeMap<ActionId, ActionRecord>,
    pub edges: Vec<(StateId, StateId, ActionId)>,
    pub unexplored: Vec<ActionId>,
    pub raw_trace: String,
}

impl KnowledgeSnapshot {
    pub fn capture(knowledge: &AppKnowledge) -> Result<Self, KnowledgeError> {
        let abstract_states = knowledge
            .states
            .iter()
            .map(|(id, state)| {
                (
                    id.clone(),
                    StateRecord {
                        signature: state.signature.clone(),
                        actions: state.actions.iter().cloned().collect(),
                        page_description: state.page_description.clone(),
                        element_groups: state.element_groups.clone(),
                    },
                )
            })
            .collect();

        let abstract_actions = knowledge
            .actions
            .iter()
            .map(|(id, action)| {
                (
                    id.clone(),
                    ActionRecord {
                        action_type: action.action_type,
                        flag: action.flag,
                        src: action.source_state.clone(),
                        dst: action.target_state.clone(),
                        elements: action.elements.iter().map(|e| e.node_id.clone()).collect(),
                        function: action.function_desc.clone(),
                    },
                )
            })
            .collect();

        let trace_json = serde_json::to_vec(&knowledge.raw_trace)?;

        Ok(Self {
            abstract_states,
            abstract_actions,
            edges: knowledge.graph.edge_triples(),
            unexplored: knowledge.unexplored().iter().cloned().collect(),
            raw_trace: BASE64.encode(trace_json),
        })
    }

    pub fn restore(&self) -> Result<AppKnowledge, KnowledgeError> {
        let mut knowledge = AppKnowledge::new();

        for (id, record) in &self.abstract_states {
            let mut state = AbstractState::new(record.signature.clone());
            state.id = id.clone();
            state.actions = record.actions.iter().cloned().collect();
            state.page_description = record.page_description.clone();
            state.element_groups = record.element_groups.clone();
            knowledge.graph.add_node(id.clone());
            knowledge.states.insert(id.clone(), state);
        }

        for (id, record) in &self.abstract_actions {
            let mut action = AbstractAction::new(
                record.action_type,
                record
                    .elements
                    .iter()
                    .map(|id| UIElement::new(id.as_str()))
                    .collect(),
            );
            action.id = id.clone();
            action.flag = record.flag;
            action.function_desc = record.function.clone();
            action.source_state = record.src.clone();
            action.target_state = record.dst.clone();
            knowledge.actions.insert(id.clone(), action);
        }

        for (src, dst, action) in &self.edges {
            if !self.abstract_states.contains_key(src) {
                return Err(KnowledgeError::UnknownState(src.0.clone()));
            }
            if !self.abstract_states.contains_key(dst) {
                return Err(KnowledgeError::UnknownState(dst.0.clone()));
            }
            if !self.abstract_actions.contains_key(action) {
                return Err(KnowledgeError::UnknownAction(action.0.clone()));
            }
            knowledge
                .graph
                .add_edge(src.clone(), dst.clone(), action.clone());
        }

        knowledge.restore_unexplored(self.unexplored.iter().cloned().collect::<BTreeSet<_>>());

        let trace_bytes = BASE64
            .decode(&self.raw_trace)
            .map_err(|e| KnowledgeError::TraceDecode(e.to_string()))?;
        let raw_trace: Vec<RawTraceItem> = serde_json::from_slice(&trace_bytes)?;
        knowledge.raw_trace = raw_trace;

        Ok(knowledge)
    }
}

impl AppKnowledge {
    pub fn to_value(&self) -> Result<serde_json::Value, KnowledgeError> {
        Ok(serde_json::to_value(KnowledgeSnapshot::capture(self)?)?)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, KnowledgeError> {
        let snapshot: KnowledgeSnapshot = serde_json::from_value(value.clone())?;
        snapshot.restore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core_types::{ConcreteAction, DomNode, PageSnapshot};

    fn sample_knowledge() -> AppKnowledge {
        let mut k = AppKnowledge::new();
        let home = k.get_or_create_state("sig-home");
        let detail = k.get_or_create_state("sig-detail");

        let mut open = AbstractAction::new(
            ActionType::Click,
            vec![UIElement::with_locator("3", "/html/body/a[1]")],
        );
        open.function_desc = "open first result".into();
        let open_id = k.register_action(&home, open);

        let mut search = AbstractAction::new(ActionType::Input, vec![UIElement::new("7")]);
        search.function_desc = "search box".into();
        k.register_action(&home, search);

        k.set_flag(&open_id, ExplorationFlag::Explored);
        k.add_edge(&home, &open_id, &detail);

        let snap = PageSnapshot::new("https://shop.test/", DomNode::new("html"));
        k.push_trace(None, None, snap.clone());
        k.push_trace(
            Some(snap.clone()),
            Some(ConcreteAction::new(ActionType::Click, "3")),
            snap,
        );
        k
    }

    #[test]
    fn round_trip_preserves_topology_flags_and_index() {
        let original = sample_knowledge();
        let value = original.to_value().unwrap();
        let restored = AppKnowledge::from_value(&value).unwrap();

        assert_eq!(restored.states.len(), original.states.len());
        assert_eq!(restored.actions.len(), original.actions.len());
        assert_eq!(restored.graph.edge_triples(), original.graph.edge_triples());
        assert_eq!(restored.unexplored(), original.unexplored());
        assert_eq!(restored.raw_trace.len(), original.raw_trace.len());
        for (id, action) in &original.actions {
            let mirror = restored.action(id).unwrap();
            assert_eq!(mirror.flag, action.flag);
            assert_eq!(mirror.action_type, action.action_type);
            assert_eq!(mirror.source_state, action.source_state);
            assert_eq!(mirror.target_state, action.target_state);
        }

        // a second capture of the restored knowledge is bit-identical
        let value_again = restored.to_value().unwrap();
        assert_eq!(value, value_again);
    }

    #[test]
    fn restore_rejects_dangling_edge_references() {
        let original = sample_knowledge();
        let mut snapshot = KnowledgeSnapshot::capture(&original).unwrap();
        snapshot.edges.push((
            StateId("ghost".into()),
            snapshot.edges[0].1.clone(),
            snapshot.edges[0].2.clone(),
        ));
        assert!(matches!(
            snapshot.restore(),
            Err(KnowledgeError::UnknownState(_))
        ));
    }
}
