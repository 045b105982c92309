use std::sync::Arc;

use tracing::{debug, trace};

use scout_core_types::{PageSnapshot, StateId};
use scout_knowledge::AppKnowledge;

use crate::cache::VerdictCache;
use crate::ports::EquivalenceJudge;
use crate::signature::{short_signature, signature};

/// Number of representative snapshots compared per candidate state.
const REPRESENTATIVE_LIMIT: usize = 3;

/// Resolves concrete snapshots to abstract states.
///
/// Resolution order: exact stored-signature match first, then (when a judge is
/// configured) cached semantic-equivalence checks against up to three
/// representatives of each candidate cluster. Returns `None` when neither
/// succeeds; the caller creates a fresh state.
pub struct StateMatcher {
    judge: Option<Arc<dyn EquivalenceJudge>>,
    cache: VerdictCache,
}

impl StateMatcher {
    pub fn new() -> Self {
        Self {
            judge: None,
            cache: VerdictCache::new(),
        }
    }

    pub fn with_judge(judge: Arc<dyn EquivalenceJudge>) -> Self {
        Self {
            judge: Some(judge),
            cache: VerdictCache::new(),
        }
    }

    pub fn signature(&self, snapshot: &PageSnapshot) -> String {
        signature(snapshot)
    }

    pub async fn match_state(
        &self,
        knowledge: &AppKnowledge,
        snapshot: &PageSnapshot,
    ) -> Option<StateId> {
        let sig = signature(snapshot);
        if let Some(state) = knowledge.find_state_by_signature(&sig) {
            trace!(state = %state.id, "signature hit");
            return Some(state.id.clone());
        }

        let judge = self.judge.as_ref()?;

        let snap_key = short_signature(snapshot);
        for state in knowledge.states.values() {
            for reference in state.representatives(REPRESENTATIVE_LIMIT) {
                let ref_key = short_signature(reference);
                let verdict = match self.cache.get(&ref_key, &snap_key) {
                    Some(cached) => cached,
                    None => {
                        let fresh = judge.equivalent(reference, snapshot).await;
                        self.cache.put(ref_key, snap_key.clone(), fresh);
                        fresh
                    }
                };
                if verdict {
                    debug!(state = %state.id, "semantic equivalence match");
                    return Some(state.id.clone());
                }
            }
        }
        None
    }

    pub fn cached_verdicts(&self) -> usize {
        self.cache.len()
    }
}

impl Default for StateMatcher {
    fn default() -> Self {
        Self::new()
    }
}
