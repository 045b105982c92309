//! Exploration orchestrator and its collaborator boundaries.
//!
//! Drives the observe -> select -> navigate -> execute -> update loop against
//! a [`BrowserDriver`] implementation, consuming the matcher, maintainer and
//! navigator crates. The browser and all LLM oracles sit behind ports; a
//! scripted in-memory driver ships for tests and demos.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod explorer;
pub mod inputs;
pub mod ports;
pub mod scripted;

pub use config::ExploreConfig;
pub use errors::{AgentError, DriverError};
pub use explorer::{ExplorationAgent, ExplorationReport, Oracles, StopReason};
pub use inputs::{HeuristicInputs, InputSynthesizer};
pub use ports::BrowserDriver;
pub use scripted::{ScriptedDriver, ScriptedElement, ScriptedPage, ScriptedSite};
