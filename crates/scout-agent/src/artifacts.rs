//! Run artifacts: serialized knowledge, a Graphviz view of the interaction
//! graph and the aggregated element table.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use scout_core_types::InteractiveElement;
use scout_knowledge::{AppKnowledge, KnowledgeError};

use crate::errors::AgentError;
use crate::explorer::ExplorationReport;

const KNOWLEDGE_FILE: &str = "knowledge.json";
const GRAPH_FILE: &str = "aig.dot";
const ELEMENTS_FILE: &str = "elements_all.json";
const META_FILE: &str = "run_meta.json";

#[derive(Serialize)]
struct RunMeta<'a> {
    finished_at: String,
    steps_taken: u32,
    states_discovered: usize,
    stop_reason: &'a crate::explorer::StopReason,
}

/// Write the complete artifact set for a finished run into `dir`.
pub fn write_run(report: &ExplorationReport, dir: &Path) -> Result<(), AgentError> {
    fs::create_dir_all(dir)?;
    write_knowledge(&report.knowledge, &dir.join(KNOWLEDGE_FILE))?;
    write_dot(&report.knowledge, &dir.join(GRAPH_FILE))?;
    write_elements(&report.all_elements, &dir.join(ELEMENTS_FILE))?;
    let meta = RunMeta {
        finished_at: Utc::now().to_rfc3339(),
        steps_taken: report.steps_taken,
        states_discovered: report.states_discovered,
        stop_reason: &report.stop_reason,
    };
    let bytes = serde_json::to_vec_pretty(&meta).map_err(KnowledgeError::from)?;
    fs::write(dir.join(META_FILE), bytes)?;
    info!(dir = %dir.display(), "run artifacts written");
    Ok(())
}

/// Persist the knowledge model; `AppKnowledge::from_value` restores it.
pub fn write_knowledge(knowledge: &AppKnowledge, path: &Path) -> Result<(), AgentError> {
    let value = knowledge.to_value()?;
    let bytes = serde_json::to_vec_pretty(&value).map_err(KnowledgeError::from)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_knowledge(path: &Path) -> Result<AppKnowledge, AgentError> {
    let bytes = fs::read(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(KnowledgeError::from)?;
    Ok(AppKnowledge::from_value(&value)?)
}

/// Render the interaction graph as a Graphviz digraph. States are nodes
/// labeled by truncated signature, edges carry the action's function text.
pub fn write_dot(knowledge: &AppKnowledge, path: &Path) -> Result<(), AgentError> {
    fs::write(path, render_dot(knowledge))?;
    Ok(())
}

pub fn render_dot(knowledge: &AppKnowledge) -> String {
    let mut out = String::from("digraph aig {\n  rankdir=LR;\n  node [shape=box];\n");
    for (id, state) in &knowledge.states {
        let sig: String = state.signature.chars().take(16).collect();
        let label = if state.page_description.is_empty() {
            sig
        } else {
            format!("{sig}\\n{}", escape(&state.page_description))
        };
        let _ = writeln!(out, "  \"{id}\" [label=\"{label}\"];");
    }
    for (src, dst, action_id) in knowledge.graph.edge_triples() {
        let label = knowledge
            .action(&action_id)
            .map(|a| escape(&a.function_desc))
            .unwrap_or_default();
        let _ = writeln!(out, "  \"{src}\" -> \"{dst}\" [label=\"{label}\"];");
    }
    out.push_str("}\n");
    out
}

pub fn write_elements(
    elements: &BTreeMap<String, InteractiveElement>,
    path: &Path,
) -> Result<(), AgentError> {
    let bytes = serde_json::to_vec_pretty(elements).map_err(KnowledgeError::from)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core_types::ActionType;
    use scout_knowledge::{AbstractAction, AbstractState, UIElement};

    fn sample_knowledge() -> AppKnowledge {
        let mut knowledge = AppKnowledge::new();
        let mut home_state = AbstractState::new("sig-home");
        home_state.page_description = "Home \"page\"".to_string();
        let home = home_state.id.clone();
        knowledge.states.insert(home.clone(), home_state);
        let list_state = AbstractState::new("sig-list");
        let list = list_state.id.clone();
        knowledge.states.insert(list.clone(), list_state);
        let mut action = AbstractAction::new(ActionType::Click, vec![UIElement::new("e1")]);
        action.function_desc = "open the list".to_string();
        let action_id = knowledge.register_action(&home, action);
        knowledge.add_edge(&home, &action_id, &list);
        knowledge
    }

    #[test]
    fn dot_output_contains_nodes_and_labeled_edges() {
        let knowledge = sample_knowledge();
        let dot = render_dot(&knowledge);
        assert!(dot.starts_with("digraph aig {"));
        assert!(dot.contains("open the list"));
        assert!(dot.contains("->"));
        // quotes inside descriptions must not break the DOT syntax
        assert!(dot.contains("Home \\\"page\\\""));
    }

    #[test]
    fn knowledge_file_round_trips() {
        let knowledge = sample_knowledge();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");
        write_knowledge(&knowledge, &path).unwrap();
        let restored = load_knowledge(&path).unwrap();
        assert_eq!(restored.states.len(), 2);
        assert_eq!(restored.graph.edge_count(), 1);
    }
}
