use std::fmt;

use serde::{Deserialize, Serialize};

/// Interaction primitives supported on the web side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    LongClick,
    Scroll,
    Input,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::LongClick => "long_click",
            ActionType::Scroll => "scroll",
            ActionType::Input => "input",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// One concrete interaction as it was actually executed against the live page.
///
/// Recorded in the raw trace and used by the maintainer to find the abstract
/// action that was exercised.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConcreteAction {
    pub action_type: ActionType,
    pub element_id: String,
}

impl ConcreteAction {
    pub fn new(action_type: ActionType, element_id: impl Into<String>) -> Self {
        Self {
            action_type,
            element_id: element_id.into(),
        }
    }
}

/// Candidate action produced by the element grouper for one screen.
///
/// `element_id` is the representative concrete element; `elements` lists every
/// member of the group (representative included, first position).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateAction {
    pub action_type: ActionType,
    pub element_id: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub locator: Option<String>,
}

impl CandidateAction {
    pub fn new(action_type: ActionType, element_id: impl Into<String>) -> Self {
        let element_id = element_id.into();
        Self {
            action_type,
            elements: vec![element_id.clone()],
            element_id,
            function: String::new(),
            locator: None,
        }
    }
}
