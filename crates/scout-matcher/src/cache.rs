use dashmap::DashMap;

/// Concurrent cache of equivalence verdicts keyed by truncated signatures.
///
/// Safe for concurrent read/insert so equivalence checks can be parallelized;
/// last-writer-wins is acceptable since the oracle is treated as approximately
/// deterministic per pair.
#[derive(Default)]
pub struct VerdictCache {
    entries: DashMap<(String, String), bool>,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<bool> {
        self.entries
            .get(&(a.to_string(), b.to_string()))
            .map(|v| *v)
    }

    pub fn put(&self, a: String, b: String, verdict: bool) {
        self.entries.insert((a, b), verdict);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
