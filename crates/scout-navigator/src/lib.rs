//! Navigation layer: picks the next action to attempt and routes the agent
//! back to states that still have unexplored work.

pub mod pathfinder;
pub mod selector;

pub use pathfinder::PathFinder;
pub use selector::ActionSelector;
