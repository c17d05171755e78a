//! Bounce demo — two balls integrating velocity and reflecting off an
//! extent, with a stats plugin watching the loop.
//!
//! Demonstrates the registry surface end to end: component requirements
//! (`bounce` pulls in `velocity2d` pulls in `transform2d`), prefab
//! inheritance (`heavy_ball` layers over `ball`), scene-declared plugins,
//! and a bounded headless run.

use anyhow::Result;
use glam::Vec2;
use serde_json::{Value, json};
use std::any::Any;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orrery_core::{
    Asset, ComponentDef, Engine, EngineConfig, Plugin, PluginDef, PrefabDef, Registry, SceneDef,
    event,
};
use orrery_runtime::{Environment, HeadlessEnvironment, MemoryLoader};

/// Logs loop diagnostics every `interval` steps.
struct FrameStats {
    interval: u64,
    steps: u64,
}

impl Plugin for FrameStats {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_scene_loaded(&mut self, engine: &mut Engine) {
        info!(
            scene = engine.scene().unwrap_or(""),
            entities = engine.entity_count(),
            "scene up"
        );
    }

    fn post_update(&mut self, engine: &mut Engine, _delta: f64) {
        self.steps += 1;
        if self.interval > 0 && self.steps % self.interval == 0 {
            let stats = engine.stats();
            info!(
                step = stats.step_id,
                entities = stats.entities,
                slow = stats.running_slowly,
                "frame stats"
            );
        }
    }
}

fn build_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register_component(
        "transform2d",
        ComponentDef::new(|_component, _engine| {})
            .defaults(json!({"x": 0.0, "y": 0.0, "rotation": 0.0})),
    );

    registry.register_component(
        "velocity2d",
        ComponentDef::new(|component, _engine| {
            component.on(event::ENGINE_UPDATE, |engine, entity, args| {
                let dt = args.as_f64().unwrap_or(0.0) as f32;
                let velocity = match engine.entity(entity).and_then(|e| e.component("velocity2d"))
                {
                    Some(c) => Vec2::new(
                        c.field_f64("dx", 0.0) as f32,
                        c.field_f64("dy", 0.0) as f32,
                    ),
                    None => return,
                };
                if let Some(transform) = engine
                    .entity_mut(entity)
                    .and_then(|e| e.component_mut("transform2d"))
                {
                    let position = Vec2::new(
                        transform.field_f64("x", 0.0) as f32,
                        transform.field_f64("y", 0.0) as f32,
                    ) + velocity * dt;
                    transform.set_field("x", json!(position.x));
                    transform.set_field("y", json!(position.y));
                }
            });
        })
        .requires(["transform2d"])
        .defaults(json!({"dx": 0.0, "dy": 0.0})),
    );

    registry.register_component(
        "bounce",
        ComponentDef::new(|component, engine| {
            // World tuning ships as an asset; prefab configuration can
            // still override it after setup.
            if let Some(extent) = engine
                .get_asset("tuning.json")
                .and_then(Asset::as_json)
                .and_then(|v| v.get("extent"))
                .and_then(Value::as_f64)
            {
                component.set_field("extent", json!(extent));
            }
            component.on(event::ENGINE_UPDATE, |engine, entity, _args| {
                let extent = match engine.entity(entity).and_then(|e| e.component("bounce")) {
                    Some(c) => c.field_f64("extent", 10.0),
                    None => return,
                };
                let position = match engine.entity(entity).and_then(|e| e.component("transform2d"))
                {
                    Some(c) => (c.field_f64("x", 0.0), c.field_f64("y", 0.0)),
                    None => return,
                };
                if let Some(velocity) = engine
                    .entity_mut(entity)
                    .and_then(|e| e.component_mut("velocity2d"))
                {
                    // Point the velocity back toward the origin on the
                    // violated axis; repeated triggers stay stable.
                    if position.0.abs() > extent {
                        let dx = velocity.field_f64("dx", 0.0);
                        velocity.set_field("dx", json!(-dx.abs() * position.0.signum()));
                    }
                    if position.1.abs() > extent {
                        let dy = velocity.field_f64("dy", 0.0);
                        velocity.set_field("dy", json!(-dy.abs() * position.1.signum()));
                    }
                }
            });
        })
        .requires(["transform2d", "velocity2d"])
        .defaults(json!({"extent": 10.0})),
    );

    registry.register_plugin(
        "frame_stats",
        PluginDef::new(|config| {
            Box::new(FrameStats {
                interval: config.get("interval").and_then(Value::as_u64).unwrap_or(30),
                steps: 0,
            })
        })
        .defaults(json!({"interval": 30})),
    );

    registry.register_prefab(
        "ball",
        PrefabDef::new()
            .named("ball")
            .component("velocity2d", json!({"dx": 3.0, "dy": 2.0}))
            .component("bounce", Value::Null),
    );
    registry.register_prefab(
        "heavy_ball",
        PrefabDef::new()
            .named("heavy_ball")
            .inherits("ball")
            .tagged("heavy")
            .component("velocity2d", json!({"dx": 1.0})),
    );

    registry.register_scene(
        "main",
        SceneDef::new()
            .plugin("frame_stats", Value::Null)
            .entity("ball")
            .entity("heavy_ball"),
    );

    registry
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bounce=info".parse()?))
        .init();

    let config = EngineConfig {
        steps_per_second: 60.0,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(build_registry(), config);

    let mut assets = MemoryLoader::new();
    assets.insert("tuning.json", Asset::Json(json!({"extent": 8.0})));
    engine.set_loader(Box::new(assets));
    engine.load_assets(&["tuning.json"])?;

    engine.load_scene("main")?;
    HeadlessEnvironment::new(180).run(&mut engine)?;

    for entity in engine.entities() {
        if let Some(transform) = entity.component("transform2d") {
            info!(
                entity = entity.id(),
                name = entity.name(),
                x = transform.field_f64("x", 0.0),
                y = transform.field_f64("y", 0.0),
                "final position"
            );
        }
    }
    let stats = engine.stats();
    info!(steps = stats.step_id, entities = stats.entities, "demo complete");
    Ok(())
}
