use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{ActionType, CandidateAction};

/// Structural DOM summary: tag names only, no text or attributes.
///
/// This is all the state matcher needs for its signature; anything richer
/// stays behind the browser driver.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(tag: impl Into<String>, children: Vec<DomNode>) -> Self {
        Self {
            tag: tag.into(),
            children,
        }
    }
}

/// One interactive element as reported by the browser driver.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Action this element responds to by default.
    pub default_action: ActionType,
    /// Visible label or aria label, best effort.
    #[serde(default)]
    pub label: String,
    /// Stable locator (e.g. an XPath) usable when the element id goes stale.
    #[serde(default)]
    pub locator: Option<String>,
}

/// Group of element ids the grouping oracle judged functionally identical.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub elements: Vec<String>,
    #[serde(default)]
    pub function: String,
}

/// Output shape of the element grouping oracle.
///
/// Degraded implementations return one action per raw element with empty
/// description/groups; consumers must treat that as structurally valid.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupingOutcome {
    pub actions: Vec<CandidateAction>,
    #[serde(default)]
    pub page_description: String,
    #[serde(default)]
    pub element_groups: Vec<ElementGroup>,
    #[serde(default)]
    pub token_cost: u64,
}

/// One concrete observation of the live page.
///
/// Replaces the loosely-typed metadata blobs of earlier prototypes with a
/// tagged record every consumer can check statically.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub dom: DomNode,
    /// element id -> element descriptor for everything currently interactive.
    #[serde(default)]
    pub interactive: BTreeMap<String, InteractiveElement>,
    /// Derived metadata attached by the orchestrator after a grouper call.
    #[serde(default)]
    pub page_description: Option<String>,
    #[serde(default)]
    pub element_groups: Vec<ElementGroup>,
    /// Cached grouper output so re-observations skip the oracle.
    #[serde(default)]
    pub grouped_actions: Option<Vec<CandidateAction>>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, dom: DomNode) -> Self {
        Self {
            url: url.into(),
            dom,
            interactive: BTreeMap::new(),
            page_description: None,
            element_groups: Vec::new(),
            grouped_actions: None,
        }
    }
}
