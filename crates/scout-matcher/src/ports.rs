use async_trait::async_trait;

use scout_core_types::PageSnapshot;

/// Semantic state-equivalence oracle.
///
/// Treated as a black box with no determinism guarantee; the matcher caches
/// every verdict per snapshot pair. Implementations must map internal errors
/// to `false` rather than propagate them.
#[async_trait]
pub trait EquivalenceJudge: Send + Sync {
    async fn equivalent(&self, a: &PageSnapshot, b: &PageSnapshot) -> bool;
}
