//! State matching: decides whether a concrete observation belongs to an
//! existing abstract state or warrants a new one.
//!
//! A deterministic structural signature handles the common case (same layout,
//! same route); an optional semantic-equivalence oracle absorbs cosmetic drift
//! within the same logical screen. Oracle verdicts are cached per snapshot
//! pair because the oracle is expensive and only approximately deterministic.

pub mod cache;
pub mod matcher;
pub mod ports;
pub mod signature;

pub use cache::VerdictCache;
pub use matcher::StateMatcher;
pub use ports::EquivalenceJudge;
pub use signature::{short_signature, signature};
