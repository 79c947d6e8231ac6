use std::collections::BTreeMap;

/// Values discovered while walking one identity's chain.
///
/// Starts empty at login and only grows. A probe whose path needs a value
/// that never got recorded is skipped.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredContext {
    values: BTreeMap<String, String>,
}

impl DiscoveredContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names from `required` with no recorded value, in the order given.
    pub fn missing(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.values.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}
