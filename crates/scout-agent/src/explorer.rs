use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use scout_core_types::{
    ActionId, ActionType, ConcreteAction, GroupingOutcome, InteractiveElement, PageSnapshot,
    ScrollDirection, StateId,
};
use scout_knowledge::{AppKnowledge, ExplorationFlag};
use scout_maintainer::{ElementGrouper, HeuristicGrouper, KnowledgeMaintainer};
use scout_matcher::{EquivalenceJudge, StateMatcher};
use scout_navigator::{ActionSelector, PathFinder};

use crate::config::ExploreConfig;
use crate::errors::AgentError;
use crate::inputs::{HeuristicInputs, InputSynthesizer};
use crate::ports::BrowserDriver;

/// Oracle handles injected into the agent. Defaults are the in-tree
/// heuristics; LLM-backed implementations slot in without code changes.
pub struct Oracles {
    pub judge: Option<Arc<dyn EquivalenceJudge>>,
    pub grouper: Arc<dyn ElementGrouper>,
    pub inputs: Arc<dyn InputSynthesizer>,
}

impl Default for Oracles {
    fn default() -> Self {
        Self {
            judge: None,
            grouper: Arc::new(HeuristicGrouper),
            inputs: Arc::new(HeuristicInputs),
        }
    }
}

/// Why the loop stopped. Every reason is a bounded predicate; the loop has no
/// failure exit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No unexplored actions remain anywhere in the model.
    Exhausted,
    /// Executed-step budget spent.
    StepBudget,
    /// Distinct-state budget spent.
    DepthBudget,
}

/// Final outcome of one exploration run.
pub struct ExplorationReport {
    pub knowledge: AppKnowledge,
    pub steps_taken: u32,
    pub states_discovered: usize,
    pub stop_reason: StopReason,
    /// Every interactive element observed across the run, first sighting wins.
    pub all_elements: BTreeMap<String, InteractiveElement>,
}

/// Single-threaded exploration orchestrator.
///
/// Observe -> select -> navigate-if-needed -> execute -> re-observe -> update,
/// with a back-tracking stack for states left with unexplored work and a
/// consecutive-no-path counter that forces a restart from the start URL.
pub struct ExplorationAgent {
    config: ExploreConfig,
    driver: Box<dyn BrowserDriver>,
    knowledge: AppKnowledge,
    matcher: Arc<StateMatcher>,
    maintainer: KnowledgeMaintainer,
    selector: ActionSelector,
    path_finder: PathFinder,
    inputs: Arc<dyn InputSynthesizer>,
    grouper: Arc<dyn ElementGrouper>,
    /// Host component of the start URL; actions leaving it are policy
    /// violations.
    origin: Option<String>,
    visited: BTreeSet<StateId>,
    steps: u32,
    no_path_counter: u32,
    state_stack: Vec<StateId>,
    nav_queue: VecDeque<ActionId>,
    /// Per-signature grouping results so re-observations skip the oracle.
    grouping_cache: HashMap<String, GroupingOutcome>,
    all_elements: BTreeMap<String, InteractiveElement>,
}

impl ExplorationAgent {
    pub fn new(config: ExploreConfig, driver: Box<dyn BrowserDriver>) -> Self {
        Self::with_oracles(config, driver, Oracles::default())
    }

    pub fn with_oracles(
        config: ExploreConfig,
        driver: Box<dyn BrowserDriver>,
        oracles: Oracles,
    ) -> Self {
        let matcher = Arc::new(match oracles.judge {
            Some(judge) => StateMatcher::with_judge(judge),
            None => StateMatcher::new(),
        });
        let maintainer = KnowledgeMaintainer::new(matcher.clone(), oracles.grouper.clone());
        let origin = Url::parse(&config.start_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        Self {
            config,
            driver,
            knowledge: AppKnowledge::new(),
            matcher,
            maintainer,
            selector: ActionSelector::new(),
            path_finder: PathFinder::default(),
            inputs: oracles.inputs,
            grouper: oracles.grouper,
            origin,
            visited: BTreeSet::new(),
            steps: 0,
            no_path_counter: 0,
            state_stack: Vec::new(),
            nav_queue: VecDeque::new(),
            grouping_cache: HashMap::new(),
            all_elements: BTreeMap::new(),
        }
    }

    /// Run the exploration loop to one of its bounded ends.
    pub async fn explore(mut self) -> Result<ExplorationReport, AgentError> {
        self.driver.goto(&self.config.start_url).await?;
        let mut snapshot = self.observe().await?;
        let mut current = self
            .maintainer
            .update_knowledge(&mut self.knowledge, None, None, &snapshot)
            .await;
        self.visited.insert(current.clone());
        debug!(state = %current, url = %snapshot.url, "initial state");

        let stop_reason = 'run: loop {
            if self.knowledge.unexplored().is_empty() {
                break StopReason::Exhausted;
            }
            if self.steps >= self.config.max_steps {
                break StopReason::StepBudget;
            }
            if self.visited.len() > self.config.max_depth {
                break StopReason::DepthBudget;
            }

            // 1. Determine the next action: queued navigation first.
            let next_id = if let Some(queued) = self.nav_queue.pop_front() {
                queued
            } else {
                let Some(mut picked) = self.selector.select_action(&self.knowledge, Some(&current))
                else {
                    break StopReason::Exhausted;
                };

                // Pre-filter actions that would leave the allowed origin.
                loop {
                    let primary = self
                        .knowledge
                        .action(&picked)
                        .and_then(|a| a.primary_element().cloned());
                    let external = match &primary {
                        Some(el) => self
                            .driver
                            .would_leave_origin(&el.node_id)
                            .await
                            .unwrap_or(false),
                        None => false,
                    };
                    if !external {
                        break;
                    }
                    info!(action = %picked, "pre-filter: external link, flagging ineffective");
                    self.knowledge.set_flag(&picked, ExplorationFlag::Ineffective);
                    match self.selector.select_action(&self.knowledge, Some(&current)) {
                        Some(next) => picked = next,
                        None => break 'run StopReason::Exhausted,
                    }
                }

                if self.resolve_availability(&picked, &snapshot).is_some() {
                    self.no_path_counter = 0;
                    picked
                } else {
                    // Remember this state if it still has local work to finish.
                    if self.knowledge.has_unexplored_in(&current)
                        && !self.state_stack.contains(&current)
                    {
                        debug!(state = %current, "pushed to back-tracking stack");
                        self.state_stack.push(current.clone());
                    }
                    let route =
                        self.path_finder
                            .find_path(&mut self.knowledge, &current, &picked);
                    if route.is_empty() {
                        warn!(action = %picked, "no navigation path, flagging ineffective");
                        self.knowledge.set_flag(&picked, ExplorationFlag::Ineffective);
                        self.no_path_counter += 1;
                        if self.no_path_counter >= self.config.no_path_limit {
                            let (snap, state) = self.restart().await?;
                            snapshot = snap;
                            current = state;
                        }
                        continue;
                    }
                    // Route first; the picked action is retried after arrival.
                    self.nav_queue = route.into_iter().collect();
                    self.nav_queue.push_back(picked);
                    continue;
                }
            };

            // 2. Execute.
            let Some(action) = self.knowledge.action(&next_id).cloned() else {
                warn!(action = %next_id, "queued action vanished from the model, skipping");
                continue;
            };
            let Some(executed) = self.execute_action(&action, &snapshot).await? else {
                continue;
            };

            // 3. Re-observe and fold the step into the knowledge.
            if !self.config.settle.is_zero() {
                tokio::time::sleep(self.config.settle).await;
            }
            let new_snapshot = self.observe().await?;
            current = self
                .maintainer
                .update_knowledge(
                    &mut self.knowledge,
                    Some(&snapshot),
                    Some(&executed),
                    &new_snapshot,
                )
                .await;
            snapshot = new_snapshot;
            self.visited.insert(current.clone());
            self.steps += 1;

            self.revalidate_nav_queue(&current);
            self.backtrack(&current);
        };

        info!(?stop_reason, steps = self.steps, states = self.knowledge.states.len(),
            "exploration finished");
        Ok(ExplorationReport {
            states_discovered: self.knowledge.states.len(),
            knowledge: self.knowledge,
            steps_taken: self.steps,
            stop_reason,
            all_elements: self.all_elements,
        })
    }

    /// Snapshot the live page and enrich it with (cached) grouping metadata.
    async fn observe(&mut self) -> Result<PageSnapshot, AgentError> {
        let mut snapshot = self.driver.snapshot().await?;
        let sig = self.matcher.signature(&snapshot);
        let outcome = match self.grouping_cache.get(&sig) {
            Some(cached) => cached.clone(),
            None => {
                let fresh = self.grouper.extract_actions(&snapshot).await;
                self.grouping_cache.insert(sig, fresh.clone());
                fresh
            }
        };
        if !outcome.page_description.is_empty() {
            snapshot.page_description = Some(outcome.page_description.clone());
        }
        snapshot.element_groups = outcome.element_groups.clone();
        snapshot.grouped_actions = Some(outcome.actions);
        for (id, element) in &snapshot.interactive {
            self.all_elements
                .entry(id.clone())
                .or_insert_with(|| element.clone());
        }
        Ok(snapshot)
    }

    /// Live element id for the action's primary element, if it is reachable on
    /// the current page; transparently refreshes a stale id via its stable
    /// locator.
    fn resolve_availability(
        &mut self,
        action_id: &ActionId,
        snapshot: &PageSnapshot,
    ) -> Option<String> {
        let primary = self.knowledge.action(action_id)?.primary_element()?;
        if snapshot.interactive.contains_key(&primary.node_id) {
            return Some(primary.node_id.clone());
        }
        let locator = primary.locator.clone()?;
        let stale = primary.node_id.clone();
        let refreshed = snapshot
            .interactive
            .iter()
            .find(|(_, el)| el.locator.as_deref() == Some(locator.as_str()))
            .map(|(id, _)| id.clone())?;
        let first = self.knowledge.action_mut(action_id)?.elements.first_mut()?;
        debug!(action = %action_id, %stale, fresh = %refreshed, "element id refreshed via locator");
        first.node_id = refreshed.clone();
        Some(refreshed)
    }

    /// Perform the action on the live page. `None` means the action was ruled
    /// out before touching the page (flagged ineffective); driver failures
    /// during dispatch are logged and treated as a no-op execution so the next
    /// knowledge update can settle the flag.
    async fn execute_action(
        &mut self,
        action: &scout_knowledge::AbstractAction,
        snapshot: &PageSnapshot,
    ) -> Result<Option<ConcreteAction>, AgentError> {
        let Some(element_id) = self.resolve_availability(&action.id, snapshot) else {
            info!(action = %action.id, "primary element absent from the live page");
            self.knowledge
                .set_flag(&action.id, ExplorationFlag::Ineffective);
            return Ok(None);
        };

        if matches!(action.action_type, ActionType::Click | ActionType::LongClick)
            && self
                .driver
                .would_leave_origin(&element_id)
                .await
                .unwrap_or(false)
        {
            info!(action = %action.id, element = %element_id, "skipping external link");
            self.knowledge
                .set_flag(&action.id, ExplorationFlag::Ineffective);
            return Ok(None);
        }

        let dispatch = match action.action_type {
            ActionType::Click => self.driver.click(&element_id).await,
            ActionType::LongClick => self.driver.long_click(&element_id).await,
            ActionType::Input => {
                let field = snapshot
                    .interactive
                    .get(&element_id)
                    .cloned()
                    .unwrap_or(InteractiveElement {
                        default_action: ActionType::Input,
                        label: String::new(),
                        locator: None,
                    });
                let mut text = self.inputs.generate(snapshot, &field).await;
                if text.is_empty() {
                    text = "sample text".to_string();
                }
                self.driver.fill(&element_id, &text).await
            }
            ActionType::Scroll => self.driver.scroll(&element_id, ScrollDirection::Down).await,
        };
        if let Err(err) = dispatch {
            warn!(action = %action.id, error = %err, "execution failed, treating as no-op");
        }

        if let Err(err) = self.driver.close_extra_pages().await {
            warn!(error = %err, "failed to close extra pages");
        }

        self.enforce_origin(&action.id).await?;

        Ok(Some(ConcreteAction::new(action.action_type, element_id)))
    }

    /// Revert out-of-scope navigation: back first, start URL as fallback.
    async fn enforce_origin(&mut self, action_id: &ActionId) -> Result<(), AgentError> {
        let Some(origin) = self.origin.clone() else {
            return Ok(());
        };
        let Ok(url) = self.driver.current_url().await else {
            return Ok(());
        };
        let host = Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        let Some(host) = host else {
            return Ok(());
        };
        if host == origin {
            return Ok(());
        }
        warn!(%url, "navigated outside the allowed origin, reverting");
        self.knowledge
            .set_flag(action_id, ExplorationFlag::Ineffective);
        if self.driver.back().await.is_err() {
            self.driver.goto(&self.config.start_url).await?;
            return Ok(());
        }
        // verify the back-navigation actually landed in scope
        if let Ok(after) = self.driver.current_url().await {
            let back_host = Url::parse(&after)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            if back_host.as_deref() != Some(origin.as_str()) {
                self.driver.goto(&self.config.start_url).await?;
            }
        }
        Ok(())
    }

    /// When navigating, the state reached after a hop must be the source of
    /// the next queued action; on divergence the remaining path is recomputed
    /// toward the queue's final (target) action.
    fn revalidate_nav_queue(&mut self, current: &StateId) {
        let Some(front) = self.nav_queue.front() else {
            return;
        };
        let expected = self
            .knowledge
            .action(front)
            .and_then(|a| a.source_state.clone());
        if expected.as_ref() == Some(current) {
            return;
        }
        let Some(target) = self.nav_queue.back().cloned() else {
            return;
        };
        let target_source = self
            .knowledge
            .action(&target)
            .and_then(|a| a.source_state.clone());
        if target_source.as_ref() == Some(current) {
            // already where the target action lives; drop the stale hops
            self.nav_queue.clear();
            self.nav_queue.push_back(target);
            return;
        }
        debug!(state = %current, "unexpected state during navigation, recomputing path");
        let route = self
            .path_finder
            .find_path(&mut self.knowledge, current, &target);
        if route.is_empty() {
            self.no_path_counter += 1;
            self.nav_queue.clear();
        } else {
            self.nav_queue = route.into_iter().collect();
            self.nav_queue.push_back(target);
        }
    }

    /// When the current state is fully explored, route back to the most
    /// recently left state that still has unexplored work.
    fn backtrack(&mut self, current: &StateId) {
        if !self.nav_queue.is_empty() || self.knowledge.has_unexplored_in(current) {
            return;
        }
        while let Some(target) = self.state_stack.pop() {
            if !self.knowledge.has_unexplored_in(&target) {
                continue;
            }
            let route = self
                .path_finder
                .path_to_state(&self.knowledge, current, &target);
            if route.is_empty() {
                warn!(state = %target, "no route back to state with remaining work");
                continue;
            }
            info!(state = %target, hops = route.len(), "back-tracking");
            self.nav_queue = route.into_iter().collect();
            break;
        }
    }

    /// Full context restart after too many consecutive navigation failures.
    async fn restart(&mut self) -> Result<(PageSnapshot, StateId), AgentError> {
        warn!("too many navigation failures, reloading start url");
        self.driver.goto(&self.config.start_url).await?;
        let snapshot = self.observe().await?;
        let current = match self.matcher.match_state(&self.knowledge, &snapshot).await {
            Some(id) => id,
            None => {
                self.maintainer
                    .update_knowledge(&mut self.knowledge, None, None, &snapshot)
                    .await
            }
        };
        self.no_path_counter = 0;
        self.nav_queue.clear();
        Ok((snapshot, current))
    }
}
