use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use scout_core_types::{ActionId, ActionType, ElementGroup, PageSnapshot, StateId};

/// Per-action exploration status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationFlag {
    Unexplored,
    Explored,
    /// Executed but produced no observable state change, or was ruled out
    /// (external link, no navigation path). Never deleted, only flagged.
    Ineffective,
}

/// A concrete DOM element reference.
///
/// `node_id` resolves against the live page; `locator` is a stable fallback
/// (typically an XPath) used when the id churns across renders.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    pub node_id: String,
    #[serde(default)]
    pub locator: Option<String>,
}

impl UIElement {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            locator: None,
        }
    }

    pub fn with_locator(node_id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            locator: Some(locator.into()),
        }
    }
}

/// A class of equivalent interactions, e.g. "click the login button" across
/// many concrete renders of the same screen.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbstractAction {
    pub id: ActionId,
    pub action_type: ActionType,
    /// Representative concrete elements; first entry is the primary one.
    /// An action with no elements cannot be executed.
    pub elements: Vec<UIElement>,
    pub flag: ExplorationFlag,
    /// Natural-language label used for cross-render matching.
    pub function_desc: String,
    /// State this action was observed in. Arena-style: stored as id, resolved
    /// through [`crate::AppKnowledge`].
    pub source_state: Option<StateId>,
    /// State reached by traversing this action, set once an edge exists.
    pub target_state: Option<StateId>,
}

impl AbstractAction {
    pub fn new(action_type: ActionType, elements: Vec<UIElement>) -> Self {
        Self {
            id: ActionId::new(),
            action_type,
            elements,
            flag: ExplorationFlag::Unexplored,
            function_desc: String::new(),
            source_state: None,
            target_state: None,
        }
    }

    pub fn primary_element(&self) -> Option<&UIElement> {
        self.elements.first()
    }

    pub fn is_executable(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn has_element(&self, node_id: &str) -> bool {
        self.elements.iter().any(|e| e.node_id == node_id)
    }

    pub fn has_locator(&self, locator: &str) -> bool {
        self.elements
            .iter()
            .any(|e| e.locator.as_deref() == Some(locator))
    }
}

/// A cluster of concrete snapshots believed to be functionally equivalent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbstractState {
    pub id: StateId,
    /// Structural+route hash of the first snapshot that created this state.
    /// The authoritative identity test is the matcher, not this hash alone.
    pub signature: String,
    /// Ordered cluster of raw observations.
    pub snapshots: Vec<PageSnapshot>,
    /// Actions available in this state, resolved through the aggregate.
    pub actions: BTreeSet<ActionId>,
    /// First-write-wins natural-language summary of the screen.
    pub page_description: String,
    /// Union-merged grouping metadata, deduplicated by structural equality.
    pub element_groups: Vec<ElementGroup>,
}

impl AbstractState {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            id: StateId::new(),
            signature: signature.into(),
            snapshots: Vec::new(),
            actions: BTreeSet::new(),
            page_description: String::new(),
            element_groups: Vec::new(),
        }
    }

    /// Up to `limit` representative snapshots for equivalence checks.
    pub fn representatives(&self, limit: usize) -> &[PageSnapshot] {
        &self.snapshots[..self.snapshots.len().min(limit)]
    }

    /// Union-merge grouping metadata, skipping structurally equal entries.
    pub fn merge_element_groups(&mut self, groups: &[ElementGroup]) {
        for group in groups {
            if !self.element_groups.contains(group) {
                self.element_groups.push(group.clone());
            }
        }
    }
}
