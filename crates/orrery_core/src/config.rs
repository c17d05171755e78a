//! Engine configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enables extra diagnostics in hosts that care to check it.
    pub debug: bool,
    /// Target step rate; the step budget is its reciprocal.
    pub steps_per_second: f64,
    /// Global plugin configuration, keyed by plugin name. Used when a scene
    /// declares no plugins of its own, and as the fallback configuration
    /// for plugins loaded without an explicit one.
    pub plugins: BTreeMap<String, Value>,
    /// Asset loader configuration, if the host wires one up.
    pub loader: Option<LoaderConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            steps_per_second: 30.0,
            plugins: BTreeMap::new(),
            loader: None,
        }
    }
}

impl EngineConfig {
    /// Wall-clock budget for a single step. A non-positive configured rate
    /// falls back to the default 30 steps per second.
    #[must_use]
    pub fn step_budget(&self) -> Duration {
        let rate = if self.steps_per_second > 0.0 {
            self.steps_per_second
        } else {
            30.0
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

/// Where asset paths are resolved from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Root directory (or URL prefix) prepended to asset paths.
    pub asset_root: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_30_steps() {
        let config = EngineConfig::default();
        let budget = config.step_budget();
        assert!((budget.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        let config = EngineConfig {
            steps_per_second: 0.0,
            ..EngineConfig::default()
        };
        assert!((config.step_budget().as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "steps_per_second": 60.0,
                "plugins": { "renderer": { "pixels_per_unit": 20 } }
            }"#,
        )
        .unwrap();
        assert!(!config.debug);
        assert!((config.steps_per_second - 60.0).abs() < f64::EPSILON);
        assert!(config.plugins.contains_key("renderer"));
    }
}
