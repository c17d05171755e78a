//! The plugin hook interface.
//!
//! Plugins are engine-scoped extensions observing the loop at fixed points.
//! Every hook has a no-op default, so implementations override only what
//! they care about. The engine invokes hooks for every *enabled* plugin;
//! the enabled flag lives on the engine-side entry so a plugin can be
//! excluded from all dispatch without being unloaded.

use std::any::Any;

use crate::engine::Engine;
use crate::entity::EntityId;

/// The fixed hook interface every plugin implements.
///
/// Hooks receive `&mut Engine` and may reentrantly call engine operations;
/// structural entity changes requested mid-step go through the engine's
/// deferred queues like any other caller's.
///
/// `as_any`/`as_any_mut` expose the concrete type so components and other
/// collaborators can reach plugin services through
/// [`Engine::plugin`](crate::engine::Engine::plugin) with a downcast.
pub trait Plugin {
    /// The concrete instance, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The concrete instance, mutable, for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Fired once right after the plugin is constructed and registered.
    fn on_load(&mut self, _engine: &mut Engine) {}

    /// Fired right before the plugin is removed.
    fn on_unload(&mut self, _engine: &mut Engine) {}

    /// Fired at the start of every step, before entity updates.
    fn pre_update(&mut self, _engine: &mut Engine, _delta: f64) {}

    /// Fired at the end of every step, after entity updates.
    fn post_update(&mut self, _engine: &mut Engine, _delta: f64) {}

    /// Fired for every entity admitted to the active list, roots and
    /// descendants alike.
    fn on_entity_create(&mut self, _engine: &mut Engine, _entity: EntityId) {}

    /// Fired for every entity as it is torn down, roots and descendants
    /// alike. The entity is still fully formed when this fires.
    fn on_entity_destroy(&mut self, _engine: &mut Engine, _entity: EntityId) {}

    /// Fired once per admitted root — the externally observable
    /// "prefab instantiated" event.
    fn on_prefab_create(&mut self, _engine: &mut Engine, _entity: EntityId) {}

    /// Fired once per top-level destroy call, before any teardown.
    fn on_prefab_destroy(&mut self, _engine: &mut Engine, _entity: EntityId) {}

    /// Fired after a scene's plugins and entities have all been loaded.
    fn on_scene_loaded(&mut self, _engine: &mut Engine) {}

    /// Manual cache-drop trigger; plugins should release any references
    /// they hold.
    fn on_flush(&mut self, _engine: &mut Engine) {}
}

/// Engine-side registration entry for a loaded plugin.
///
/// The instance lives in an `Option` slot so hook dispatch can take it out,
/// hand the hook `&mut Engine`, and put it back — a hook that unloads its
/// own entry simply never gets put back.
pub(crate) struct LoadedPlugin {
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) instance: Option<Box<dyn Plugin>>,
}

impl LoadedPlugin {
    pub(crate) fn new(name: &str, instance: Box<dyn Plugin>) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            instance: Some(instance),
        }
    }
}
