use std::sync::Arc;

use tracing::{debug, warn};

use scout_core_types::{ActionId, CandidateAction, ConcreteAction, PageSnapshot, StateId};
use scout_knowledge::{AbstractAction, AppKnowledge, ExplorationFlag, UIElement};
use scout_matcher::StateMatcher;

use crate::ports::ElementGrouper;

/// Folds observed steps into the knowledge aggregate.
pub struct KnowledgeMaintainer {
    matcher: Arc<StateMatcher>,
    grouper: Arc<dyn ElementGrouper>,
}

impl KnowledgeMaintainer {
    pub fn new(matcher: Arc<StateMatcher>, grouper: Arc<dyn ElementGrouper>) -> Self {
        Self { matcher, grouper }
    }

    /// Ingest one `(prev snapshot, executed action, new snapshot)` step.
    ///
    /// The bootstrap call passes `None` for both `prev` arguments and is still
    /// recorded in the raw trace. Returns the abstract state the new snapshot
    /// was resolved or clustered into.
    pub async fn update_knowledge(
        &self,
        knowledge: &mut AppKnowledge,
        prev_snapshot: Option<&PageSnapshot>,
        prev_action: Option<&ConcreteAction>,
        new_snapshot: &PageSnapshot,
    ) -> StateId {
        // 1. Audit log, unconditionally.
        knowledge.push_trace(
            prev_snapshot.cloned(),
            prev_action.cloned(),
            new_snapshot.clone(),
        );

        // 2. Resolve or create the abstract state for the new snapshot.
        let new_state_id = match self.matcher.match_state(knowledge, new_snapshot).await {
            Some(id) => {
                if let Some(state) = knowledge.state_mut(&id) {
                    state.snapshots.push(new_snapshot.clone());
                    if state.page_description.is_empty() {
                        if let Some(desc) = &new_snapshot.page_description {
                            state.page_description = desc.clone();
                        }
                    }
                    state.merge_element_groups(&new_snapshot.element_groups);
                }
                id
            }
            None => {
                let sig = self.matcher.signature(new_snapshot);
                let id = knowledge.get_or_create_state(&sig);
                if let Some(state) = knowledge.state_mut(&id) {
                    state.snapshots.push(new_snapshot.clone());
                    if let Some(desc) = &new_snapshot.page_description {
                        state.page_description = desc.clone();
                    }
                    state.element_groups = new_snapshot.element_groups.clone();
                }
                id
            }
        };

        // 3. Fold in the candidate actions visible on the new state.
        let candidates = match &new_snapshot.grouped_actions {
            Some(cached) => cached.clone(),
            None => self.grouper.extract_actions(new_snapshot).await.actions,
        };
        for candidate in &candidates {
            if self.candidate_matches_existing(knowledge, candidate) {
                continue;
            }
            let action = Self::action_from_candidate(candidate);
            knowledge.register_action(&new_state_id, action);
        }

        // 4. Flag the executed action and maintain the graph.
        if let (Some(prev_snap), Some(executed)) = (prev_snapshot, prev_action) {
            self.record_transition(knowledge, prev_snap, executed, &new_state_id)
                .await;
        }

        new_state_id
    }

    async fn record_transition(
        &self,
        knowledge: &mut AppKnowledge,
        prev_snapshot: &PageSnapshot,
        executed: &ConcreteAction,
        new_state_id: &StateId,
    ) {
        let Some(prev_state_id) = self.matcher.match_state(knowledge, prev_snapshot).await else {
            warn!(url = %prev_snapshot.url, "previous state unresolved, skipping transition");
            return;
        };
        let Some(action_id) = Self::find_executed_action(knowledge, executed) else {
            warn!(element = %executed.element_id, kind = %executed.action_type,
                "executed action not found in model, skipping transition");
            return;
        };

        knowledge.set_flag(&action_id, ExplorationFlag::Explored);
        if prev_state_id == *new_state_id {
            // No observable effect; set_flag prunes any edges this action
            // still had in the graph.
            knowledge.set_flag(&action_id, ExplorationFlag::Ineffective);
            return;
        }

        knowledge.add_edge(&prev_state_id, &action_id, new_state_id);
        debug!(src = %prev_state_id, dst = %new_state_id, action = %action_id, "edge recorded");
    }

    /// Match a candidate against the existing actions, merging new concrete
    /// elements into the matched action where appropriate. Priority per
    /// action: exact element id, case-insensitive function description,
    /// stable locator.
    fn candidate_matches_existing(
        &self,
        knowledge: &mut AppKnowledge,
        candidate: &CandidateAction,
    ) -> bool {
        let wanted_func = candidate.function.trim().to_lowercase();
        let mut merge_into: Option<(ActionId, Option<String>)> = None;
        let mut matched = false;

        for action in knowledge.actions.values() {
            if action.action_type != candidate.action_type {
                continue;
            }
            if action.has_element(&candidate.element_id) {
                matched = true;
                break;
            }
            if !wanted_func.is_empty()
                && action.function_desc.trim().to_lowercase() == wanted_func
            {
                // This is how an action accumulates resilience to id churn.
                merge_into = Some((action.id.clone(), None));
                matched = true;
                break;
            }
            if let Some(locator) = &candidate.locator {
                if action.has_locator(locator) {
                    merge_into = Some((action.id.clone(), Some(locator.clone())));
                    matched = true;
                    break;
                }
            }
        }

        if let Some((id, locator)) = merge_into {
            if let Some(action) = knowledge.action_mut(&id) {
                debug!(action = %id, element = %candidate.element_id, "merged concrete element");
                action.elements.push(UIElement {
                    node_id: candidate.element_id.clone(),
                    locator,
                });
            }
        }
        matched
    }

    fn action_from_candidate(candidate: &CandidateAction) -> AbstractAction {
        let mut elements = vec![UIElement {
            node_id: candidate.element_id.clone(),
            locator: candidate.locator.clone(),
        }];
        for member in candidate.elements.iter().skip(1) {
            elements.push(UIElement::new(member.as_str()));
        }
        let mut action = AbstractAction::new(candidate.action_type, elements);
        action.function_desc = candidate.function.clone();
        action
    }

    /// The action that was actually executed, by concrete element id and type.
    fn find_executed_action(knowledge: &AppKnowledge, executed: &ConcreteAction) -> Option<ActionId> {
        knowledge
            .actions
            .values()
            .find(|a| a.action_type == executed.action_type && a.has_element(&executed.element_id))
            .map(|a| a.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::HeuristicGrouper;
    use scout_core_types::{ActionType, DomNode, InteractiveElement};

    fn maintainer() -> KnowledgeMaintainer {
        KnowledgeMaintainer::new(Arc::new(StateMatcher::new()), Arc::new(HeuristicGrouper))
    }

    fn element(action: ActionType, label: &str) -> InteractiveElement {
        InteractiveElement {
            default_action: action,
            label: label.into(),
            locator: None,
        }
    }

    fn home_snapshot() -> PageSnapshot {
        let mut snap = PageSnapshot::new(
            "https://shop.test/",
            DomNode::with_children("html", vec![DomNode::new("nav"), DomNode::new("main")]),
        );
        snap.interactive
            .insert("1".into(), element(ActionType::Click, "Cart"));
        snap.interactive
            .insert("2".into(), element(ActionType::Click, "Deals"));
        snap.interactive
            .insert("3".into(), element(ActionType::Input, "Search"));
        snap
    }

    fn cart_snapshot() -> PageSnapshot {
        let mut snap = PageSnapshot::new(
            "https://shop.test/cart",
            DomNode::with_children("html", vec![DomNode::new("table")]),
        );
        snap.interactive
            .insert("9".into(), element(ActionType::Click, "Checkout"));
        snap
    }

    #[tokio::test]
    async fn bootstrap_registers_one_state_and_all_raw_actions() {
        // Scenario: empty knowledge, three raw elements, no grouping oracle.
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let state = m.update_knowledge(&mut k, None, None, &home_snapshot()).await;

        assert_eq!(k.states.len(), 1);
        assert_eq!(k.actions.len(), 3);
        assert_eq!(k.unexplored().len(), 3);
        assert_eq!(k.raw_trace.len(), 1);
        assert_eq!(k.state(&state).unwrap().snapshots.len(), 1);
        for action in k.actions.values() {
            assert_eq!(action.flag, ExplorationFlag::Unexplored);
            assert_eq!(action.source_state.as_ref(), Some(&state));
        }
    }

    #[tokio::test]
    async fn reingesting_the_same_snapshot_does_not_duplicate_actions() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let first = m.update_knowledge(&mut k, None, None, &home_snapshot()).await;
        let second = m.update_knowledge(&mut k, None, None, &home_snapshot()).await;

        assert_eq!(first, second);
        assert_eq!(k.states.len(), 1);
        assert_eq!(k.actions.len(), 3);
        // the cluster grows by exactly one snapshot per ingest
        assert_eq!(k.state(&first).unwrap().snapshots.len(), 2);
        assert_eq!(k.raw_trace.len(), 2);
    }

    #[tokio::test]
    async fn effective_transition_flags_explored_and_adds_an_edge() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let home = home_snapshot();
        let home_state = m.update_knowledge(&mut k, None, None, &home).await;

        let executed = ConcreteAction::new(ActionType::Click, "1");
        let cart_state = m
            .update_knowledge(&mut k, Some(&home), Some(&executed), &cart_snapshot())
            .await;

        assert_ne!(home_state, cart_state);
        let action = k
            .actions
            .values()
            .find(|a| a.has_element("1"))
            .unwrap()
            .clone();
        assert_eq!(action.flag, ExplorationFlag::Explored);
        assert_eq!(action.target_state.as_ref(), Some(&cart_state));
        assert_eq!(
            k.graph.first_action_between(&home_state, &cart_state),
            Some(&action.id)
        );
        assert!(!k.unexplored().contains(&action.id));
    }

    #[tokio::test]
    async fn no_observable_effect_marks_ineffective_and_prunes_the_edge() {
        // Scenario: resulting state signature equals the source signature.
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let home = home_snapshot();
        let home_state = m.update_knowledge(&mut k, None, None, &home).await;

        let executed = ConcreteAction::new(ActionType::Click, "2");
        let after = m
            .update_knowledge(&mut k, Some(&home), Some(&executed), &home)
            .await;

        assert_eq!(home_state, after);
        let action = k.actions.values().find(|a| a.has_element("2")).unwrap();
        assert_eq!(action.flag, ExplorationFlag::Ineffective);
        assert_eq!(k.graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn ineffective_rerun_removes_a_previously_recorded_edge() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let home = home_snapshot();
        let _home_state = m.update_knowledge(&mut k, None, None, &home).await;

        // first traversal looked effective
        let executed = ConcreteAction::new(ActionType::Click, "2");
        let cart_state = m
            .update_knowledge(&mut k, Some(&home), Some(&executed), &cart_snapshot())
            .await;
        assert_eq!(k.graph.edge_count(), 1);

        // later the same action does nothing: flag flips, edge goes away
        let action_id = k
            .actions
            .values()
            .find(|a| a.has_element("2"))
            .map(|a| a.id.clone())
            .unwrap();
        k.set_flag(&action_id, ExplorationFlag::Explored);
        let cart = cart_snapshot();
        let stayed = m
            .update_knowledge(&mut k, Some(&cart), Some(&ConcreteAction::new(ActionType::Click, "2")), &cart)
            .await;
        assert_eq!(stayed, cart_state);
        assert_eq!(
            k.action(&action_id).unwrap().flag,
            ExplorationFlag::Ineffective
        );
        // even the earlier home -> cart edge keyed by this action is gone
        assert_eq!(k.graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn function_description_match_merges_churned_element_ids() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let home = home_snapshot();
        m.update_knowledge(&mut k, None, None, &home).await;
        assert_eq!(k.actions.len(), 3);

        // same screen rendered with a different id for the cart button
        let mut rerender = home.clone();
        rerender.interactive.remove("1");
        rerender
            .interactive
            .insert("41".into(), element(ActionType::Click, "Cart"));
        m.update_knowledge(&mut k, None, None, &rerender).await;

        assert_eq!(k.actions.len(), 3);
        let cart = k
            .actions
            .values()
            .find(|a| a.function_desc == "Cart")
            .unwrap();
        assert!(cart.has_element("1"));
        assert!(cart.has_element("41"));
    }

    #[tokio::test]
    async fn locator_match_merges_and_records_the_locator() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let mut home = home_snapshot();
        home.interactive.get_mut("1").unwrap().locator = Some("/html/body/nav/a[1]".into());
        m.update_knowledge(&mut k, None, None, &home).await;

        // id churned and the label changed, but the locator survived
        let mut rerender = home.clone();
        rerender.interactive.remove("1");
        rerender.interactive.insert(
            "55".into(),
            InteractiveElement {
                default_action: ActionType::Click,
                label: "Basket".into(),
                locator: Some("/html/body/nav/a[1]".into()),
            },
        );
        m.update_knowledge(&mut k, None, None, &rerender).await;

        assert_eq!(k.actions.len(), 3);
        let cart = k
            .actions
            .values()
            .find(|a| a.has_locator("/html/body/nav/a[1]"))
            .unwrap();
        assert!(cart.has_element("55"));
        let merged = cart.elements.iter().find(|e| e.node_id == "55").unwrap();
        assert_eq!(merged.locator.as_deref(), Some("/html/body/nav/a[1]"));
    }

    #[tokio::test]
    async fn cached_grouped_actions_bypass_the_grouper() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let mut snap = home_snapshot();
        let mut grouped = CandidateAction::new(ActionType::Click, "1");
        grouped.function = "primary navigation".into();
        grouped.elements = vec!["1".into(), "2".into()];
        snap.grouped_actions = Some(vec![grouped]);

        m.update_knowledge(&mut k, None, None, &snap).await;
        // the cache wins over the three raw interactive elements
        assert_eq!(k.actions.len(), 1);
        let action = k.actions.values().next().unwrap();
        assert!(action.has_element("1"));
        assert!(action.has_element("2"));
    }

    #[tokio::test]
    async fn description_is_first_write_wins_and_groups_union_merge() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let mut first = home_snapshot();
        first.page_description = Some("storefront landing page".into());
        first.element_groups = vec![scout_core_types::ElementGroup {
            elements: vec!["1".into()],
            function: "cart".into(),
        }];
        let state = m.update_knowledge(&mut k, None, None, &first).await;

        let mut second = home_snapshot();
        second.page_description = Some("a different description".into());
        second.element_groups = vec![
            scout_core_types::ElementGroup {
                elements: vec!["1".into()],
                function: "cart".into(),
            },
            scout_core_types::ElementGroup {
                elements: vec!["2".into()],
                function: "deals".into(),
            },
        ];
        m.update_knowledge(&mut k, None, None, &second).await;

        let st = k.state(&state).unwrap();
        assert_eq!(st.page_description, "storefront landing page");
        assert_eq!(st.element_groups.len(), 2);
    }

    #[tokio::test]
    async fn unresolvable_previous_step_is_skipped_not_fatal() {
        let m = maintainer();
        let mut k = AppKnowledge::new();
        let home = home_snapshot();
        m.update_knowledge(&mut k, None, None, &home).await;

        // an executed action the model has never seen
        let ghost = ConcreteAction::new(ActionType::Click, "999");
        m.update_knowledge(&mut k, Some(&home), Some(&ghost), &cart_snapshot())
            .await;
        assert_eq!(k.graph.edge_count(), 0);
        // states were still maintained
        assert_eq!(k.states.len(), 2);
    }
}
