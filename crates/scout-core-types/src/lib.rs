//! Shared primitives for the Scout exploration stack.
//!
//! Leaf crate: ids, interaction primitives, and the typed page snapshot that
//! every other crate consumes. No I/O and no async here.

pub mod action;
pub mod ids;
pub mod snapshot;

pub use action::{ActionType, CandidateAction, ConcreteAction, ScrollDirection};
pub use ids::{ActionId, StateId};
pub use snapshot::{DomNode, ElementGroup, GroupingOutcome, InteractiveElement, PageSnapshot};
