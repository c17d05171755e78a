//! # orrery_core
//!
//! A fixed-step entity-component orchestration engine. Definitions —
//! components, prefabs, scenes, plugins — live in a [`Registry`] built at
//! configuration time; the [`Engine`] instantiates them into live entity
//! trees and drives a synchronous update loop over them:
//!
//! 1. Plugin pre-update hooks.
//! 2. `engine.update` broadcast through every enabled root entity tree.
//! 3. Plugin post-update hooks.
//! 4. Drain of the deferred creation/destruction queues.
//!
//! Structural changes requested during a step never mutate the active list
//! mid-iteration; they are queued and applied at the drain, so every step
//! works against a stable snapshot of the world.
//!
//! ## Usage
//!
//! ```rust
//! use orrery_core::{ComponentDef, Engine, EngineConfig, PrefabDef, Registry};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry.register_component(
//!     "transform2d",
//!     ComponentDef::new(|_component, _engine| {}).defaults(json!({"x": 0.0, "y": 0.0})),
//! );
//! registry.register_prefab("marker", PrefabDef::new().component("transform2d", json!({"x": 3.0})));
//!
//! let mut engine = Engine::new(registry, EngineConfig::default());
//! let id = engine.instantiate("marker").unwrap();
//! assert!(engine.entity(id).unwrap().has_component("transform2d"));
//! ```

pub mod component;
pub mod config;
pub mod engine;
pub mod entity;
pub mod event;
pub mod loader;
pub mod plugin;
pub mod registry;

pub use component::{Component, ComponentSetup, MessageHandler};
pub use config::{EngineConfig, LoaderConfig};
pub use engine::{Engine, EngineError, EngineStats};
pub use entity::{Entity, EntityId};
pub use event::EventBus;
pub use loader::{Asset, Loader, LoaderError};
pub use plugin::Plugin;
pub use registry::{
    ComponentDef, EntityRef, PluginDef, PrefabDef, Registry, RegistryError, SceneDef,
};
