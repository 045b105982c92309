//! Knowledge maintenance: folds each observed step into [`AppKnowledge`].
//!
//! Implements the knowledge-update algorithm — trace append, state
//! merge/create, candidate-action matching, executed-action flagging and edge
//! upkeep. Favors availability over strict correctness: anything that fails to
//! resolve is logged and skipped, never fatal.

pub mod maintainer;
pub mod ports;

pub use maintainer::KnowledgeMaintainer;
pub use ports::{ElementGrouper, HeuristicGrouper};
