//! Knowledge backbone of the Scout explorer.
//!
//! Holds the abstract model of the application under exploration: abstract
//! states (clusters of equivalent snapshots), abstract actions (classes of
//! equivalent interactions), the interaction graph connecting them, and the
//! aggregate [`AppKnowledge`] that owns everything by id. Pure data and graph
//! operations; no I/O, no oracles.

pub mod errors;
pub mod graph;
pub mod knowledge;
pub mod model;
pub mod persist;

pub use errors::KnowledgeError;
pub use graph::InteractionGraph;
pub use knowledge::{AppKnowledge, RawTraceItem};
pub use model::{AbstractAction, AbstractState, ExplorationFlag, UIElement};
pub use persist::KnowledgeSnapshot;
