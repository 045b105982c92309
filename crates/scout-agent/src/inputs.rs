use async_trait::async_trait;

use scout_core_types::{InteractiveElement, PageSnapshot};

/// Input-text synthesis oracle for form fields.
///
/// Returns a plain value, never an empty string; failing or unconfigured
/// implementations must fall back to a fixed heuristic.
#[async_trait]
pub trait InputSynthesizer: Send + Sync {
    async fn generate(&self, snapshot: &PageSnapshot, field: &InteractiveElement) -> String;
}

/// Keyword fallback used when no LLM synthesizer is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicInputs;

#[async_trait]
impl InputSynthesizer for HeuristicInputs {
    async fn generate(&self, _snapshot: &PageSnapshot, field: &InteractiveElement) -> String {
        let label = field.label.to_lowercase();
        if label.contains("email") {
            "test@example.com".to_string()
        } else if label.contains("phone") {
            "123-456-7890".to_string()
        } else if label.contains("name") {
            "Jane Doe".to_string()
        } else {
            "sample text".to_string()
        }
    }
}
