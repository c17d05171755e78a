//! Step environments.
//!
//! The engine only tracks a running flag; actually calling
//! [`Engine::step`] on a cadence is the host's job. An [`Environment`]
//! wraps that job: it steps the engine for as long as the engine says it
//! is running, which also sequences deferred scene swaps (applied by the
//! engine between steps) without the environment having to know about
//! them.

use std::time::Instant;

use tracing::{info, warn};

use orrery_core::{Engine, EngineError};

/// Drives repeated engine steps while the engine's running flag holds.
pub trait Environment {
    /// Step the engine until it stops. Returns the first step error.
    fn run(&mut self, engine: &mut Engine) -> Result<(), EngineError>;
}

/// Wall-clock paced environment: steps, then sleeps whatever remains of
/// the engine's per-step budget.
#[derive(Debug, Default)]
pub struct FixedStepEnvironment;

impl FixedStepEnvironment {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for FixedStepEnvironment {
    fn run(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        let budget = engine.step_budget();
        info!(
            budget_ms = budget.as_millis() as u64,
            "fixed-step environment running"
        );

        while engine.is_running() {
            let start = Instant::now();
            engine.step()?;
            if !engine.is_running() {
                break;
            }
            let elapsed = start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            } else {
                warn!(
                    step = engine.step_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "no budget left to sleep"
                );
            }
        }

        info!(steps = engine.step_id(), "fixed-step environment stopped");
        Ok(())
    }
}

/// Unpaced environment for tests and demos: steps as fast as possible and
/// stops the engine after a bounded number of steps.
#[derive(Debug)]
pub struct HeadlessEnvironment {
    max_steps: u64,
}

impl HeadlessEnvironment {
    /// Run at most `max_steps` steps; `0` means unbounded.
    #[must_use]
    pub fn new(max_steps: u64) -> Self {
        Self { max_steps }
    }
}

impl Environment for HeadlessEnvironment {
    fn run(&mut self, engine: &mut Engine) -> Result<(), EngineError> {
        let mut steps = 0u64;
        while engine.is_running() {
            engine.step()?;
            steps += 1;
            if self.max_steps > 0 && steps >= self.max_steps {
                engine.stop();
            }
        }
        info!(steps, "headless run complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::{ComponentDef, EngineConfig, PrefabDef, Registry, SceneDef};
    use serde_json::Value;
    use std::time::Duration;

    fn engine_with_scene() -> Engine {
        let mut registry = Registry::new();
        registry.register_prefab("thing", PrefabDef::new());
        registry.register_scene("main", SceneDef::new().entity("thing"));
        Engine::new(registry, EngineConfig::default())
    }

    #[test]
    fn test_headless_runs_bounded_steps() {
        let mut engine = engine_with_scene();
        engine.load_scene("main").unwrap();

        HeadlessEnvironment::new(5).run(&mut engine).unwrap();

        assert_eq!(engine.step_id(), 5);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_headless_respects_engine_stop() {
        let mut engine = engine_with_scene();
        // Never started: the loop should not step at all.
        HeadlessEnvironment::new(10).run(&mut engine).unwrap();
        assert_eq!(engine.step_id(), 0);
    }

    #[test]
    fn test_headless_applies_deferred_scene_swap() {
        let mut engine = engine_with_scene();
        engine.load_scene("main").unwrap();

        // Request a swap mid-run; the engine applies it between steps and
        // resumes, so the bounded run keeps going in the new scene.
        engine.load_scene("main").unwrap();
        HeadlessEnvironment::new(3).run(&mut engine).unwrap();

        assert_eq!(engine.scene(), Some("main"));
        assert!(engine.step_id() > 0);
    }

    #[test]
    fn test_fixed_step_paces_to_budget() {
        let mut registry = Registry::new();
        registry.register_component(
            "stopper",
            ComponentDef::new(|component, _engine| {
                component.on("engine.update", |engine, entity, _args| {
                    let done = {
                        let component = engine
                            .entity_mut(entity)
                            .and_then(|e| e.component_mut("stopper"))
                            .unwrap();
                        let count = component.field_f64("count", 0.0) + 1.0;
                        component.set_field("count", count.into());
                        count >= 3.0
                    };
                    if done {
                        engine.stop();
                    }
                });
            }),
        );
        registry.register_prefab(
            "stop_after_three",
            PrefabDef::new().component("stopper", Value::Null),
        );
        registry.register_scene("main", SceneDef::new().entity("stop_after_three"));
        let config = EngineConfig {
            steps_per_second: 100.0,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(registry, config);
        engine.load_scene("main").unwrap();

        let start = Instant::now();
        FixedStepEnvironment::new().run(&mut engine).unwrap();

        assert_eq!(engine.step_id(), 3);
        // Two inter-step sleeps of a ~10ms budget each.
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_fixed_step_returns_when_not_running() {
        let mut engine = engine_with_scene();
        FixedStepEnvironment::new().run(&mut engine).unwrap();
        assert_eq!(engine.step_id(), 0);
    }
}
