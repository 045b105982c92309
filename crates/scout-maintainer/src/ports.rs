use async_trait::async_trait;

use scout_core_types::{CandidateAction, GroupingOutcome, PageSnapshot};

/// Element-grouping oracle: turns the raw interactive-element table of a
/// snapshot into a smaller set of candidate actions with natural-language
/// function descriptions.
///
/// Implementations must degrade to one-action-per-raw-element on any internal
/// failure; the maintainer treats degraded output as structurally valid input.
#[async_trait]
pub trait ElementGrouper: Send + Sync {
    async fn extract_actions(&self, snapshot: &PageSnapshot) -> GroupingOutcome;
}

/// Fallback grouper: one candidate per interactive element, the element label
/// as its function description, no grouping metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicGrouper;

#[async_trait]
impl ElementGrouper for HeuristicGrouper {
    async fn extract_actions(&self, snapshot: &PageSnapshot) -> GroupingOutcome {
        let actions = snapshot
            .interactive
            .iter()
            .map(|(id, element)| CandidateAction {
                action_type: element.default_action,
                element_id: id.clone(),
                function: element.label.clone(),
                elements: vec![id.clone()],
                locator: element.locator.clone(),
            })
            .collect();
        GroupingOutcome {
            actions,
            ..GroupingOutcome::default()
        }
    }
}
