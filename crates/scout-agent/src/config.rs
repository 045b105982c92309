use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for one exploration run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExploreConfig {
    /// Entry point; its host also defines the allowed origin.
    pub start_url: String,
    /// Hard cap on executed steps.
    pub max_steps: u32,
    /// Hard cap on distinct abstract states visited.
    pub max_depth: usize,
    /// Consecutive navigation failures tolerated before the agent reloads the
    /// start URL.
    pub no_path_limit: u32,
    /// Settle time after each executed action, before re-observing.
    #[serde(with = "duration_millis", default = "default_settle")]
    pub settle: Duration,
}

fn default_settle() -> Duration {
    Duration::from_millis(0)
}

impl ExploreConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_steps: 100,
            max_depth: 5,
            no_path_limit: 20,
            settle: Duration::from_secs(2),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(de)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_round_trips_as_plain_milliseconds() {
        let config = ExploreConfig::new("https://demo.test/");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["settle"], 2000);

        let back: ExploreConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back.settle, Duration::from_secs(2));
    }
}
