//! The orchestration engine.
//!
//! The engine owns the entity arena and the ordered active list, drives the
//! fixed-step update loop, and manages scene and plugin lifecycle. One
//! invariant organizes everything here: **the active list is never
//! structurally mutated while a step is iterating it.** Entity creation and
//! destruction requested during a step land in pending queues, drained
//! through the same admission/destruction routines once the step's
//! broadcasts complete — so every step sees a stable snapshot of the world,
//! and the changes it requested are fully applied before the next step.
//!
//! Step lifecycle:
//!
//! 1. Mark `updating`, advance the step counter, compute the wall-clock
//!    delta.
//! 2. Plugin pre-update hooks.
//! 3. Broadcast `engine.update` to every enabled root, in list order.
//! 4. Plugin post-update hooks.
//! 5. Clear `updating`, drain the pending-created then pending-destroyed
//!    queues.
//! 6. Record the time spent; flag the engine as running slowly past the
//!    step budget.
//! 7. Apply a pending scene swap, if one was requested while running.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::component::{Component, MessageHandler};
use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::event::{self, EventBus};
use crate::loader::{Asset, Loader, LoaderError};
use crate::plugin::{LoadedPlugin, Plugin};
use crate::registry::{EntityRef, PrefabDef, Registry, RegistryError};

/// Errors surfaced by engine operations.
///
/// Lookup failures are programmer errors and fail the call synchronously.
/// Panics inside component setup closures, message handlers, or plugin
/// hooks propagate uncaught — the engine performs no isolation between a
/// faulty extension and the loop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("no asset loader configured")]
    LoaderMissing,
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),
}

/// A point-in-time snapshot of loop diagnostics.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Entities currently on the active list.
    pub entities: usize,
    /// Steps taken since the last reset.
    pub step_id: u64,
    /// Wall-clock delta of the last step, in seconds.
    pub delta: f64,
    /// Time the last step actually took.
    pub last_step_duration: Duration,
    /// The configured per-step budget.
    pub target_budget: Duration,
    /// Whether the last step exceeded the budget.
    pub running_slowly: bool,
}

/// Closure invoked instead of auto-running after a scene finishes loading.
type SceneCallback = Box<dyn FnOnce(&mut Engine)>;

/// A scene swap requested while the engine was running, applied between
/// steps.
struct PendingScene {
    name: String,
    after: Option<SceneCallback>,
}

/// The orchestrator: entity lifecycle, the step loop, scenes, plugins, and
/// the external event bus.
pub struct Engine {
    registry: Registry,
    config: EngineConfig,
    loader: Option<Box<dyn Loader>>,
    bus: EventBus,
    initialized: bool,

    // Everything below is transient and cleared by `reset`.
    running: bool,
    updating: bool,
    running_slowly: bool,
    last_step_duration: Duration,
    storage: HashMap<EntityId, Entity>,
    active: Vec<EntityId>,
    last_id: EntityId,
    pending_created: Vec<EntityId>,
    pending_destroyed: Vec<EntityId>,
    step_id: u64,
    last_step: Instant,
    delta: f64,
    scene: Option<String>,
    pending_scene: Option<PendingScene>,
    plugins: Vec<LoadedPlugin>,
}

impl Engine {
    /// Create an engine over a registry built at configuration time. The
    /// registry is moved in whole — there is no global definition store.
    #[must_use]
    pub fn new(registry: Registry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            loader: None,
            bus: EventBus::new(),
            initialized: false,
            running: false,
            updating: false,
            running_slowly: false,
            last_step_duration: Duration::ZERO,
            storage: HashMap::new(),
            active: Vec::new(),
            last_id: 0,
            pending_created: Vec::new(),
            pending_destroyed: Vec::new(),
            step_id: 0,
            last_step: Instant::now(),
            delta: 0.0,
            scene: None,
            pending_scene: None,
            plugins: Vec::new(),
        }
    }

    /// Clear all transient state: entities, queues, step counter, timing,
    /// the current scene, and the plugin map. Registered bus listeners and
    /// the loader persist.
    pub fn reset(&mut self) {
        self.running = false;
        self.updating = false;
        self.running_slowly = false;
        self.last_step_duration = Duration::ZERO;
        self.storage.clear();
        self.active.clear();
        self.last_id = 0;
        self.pending_created.clear();
        self.pending_destroyed.clear();
        self.step_id = 0;
        self.last_step = Instant::now();
        self.delta = 0.0;
        self.scene = None;
        self.plugins.clear();
    }

    /// Run the one-time registry optimization if it has not happened yet.
    fn ensure_initialized(&mut self) -> Result<(), EngineError> {
        if !self.initialized {
            self.registry.optimize()?;
            self.initialized = true;
        }
        Ok(())
    }

    // -- Accessors --

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn step_budget(&self) -> Duration {
        self.config.step_budget()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    #[must_use]
    pub fn is_running_slowly(&self) -> bool {
        self.running_slowly
    }

    #[must_use]
    pub fn step_id(&self) -> u64 {
        self.step_id
    }

    /// Wall-clock delta of the last step, in seconds.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Name of the currently loaded scene.
    #[must_use]
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entities: self.active.len(),
            step_id: self.step_id,
            delta: self.delta,
            last_step_duration: self.last_step_duration,
            target_budget: self.step_budget(),
            running_slowly: self.running_slowly,
        }
    }

    // -- Entity access --

    /// Look up a tracked entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.storage.get(&id)
    }

    /// Mutable lookup of a tracked entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.storage.get_mut(&id)
    }

    /// Entities on the active list, in admission order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.active.iter().filter_map(|id| self.storage.get(id))
    }

    /// Enabled entities on the active list.
    pub fn enabled_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities().filter(|e| e.is_enabled())
    }

    /// Enabled root entities on the active list.
    pub fn roots(&self) -> impl Iterator<Item = &Entity> {
        self.enabled_entities().filter(|e| e.is_root())
    }

    /// Number of entities on the active list.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if the entity is on the active list.
    #[must_use]
    pub fn is_active(&self, id: EntityId) -> bool {
        self.active.contains(&id)
    }

    // -- Instantiation --

    /// Instantiate a registered prefab as a top-level entity.
    pub fn instantiate(&mut self, prefab: &str) -> Result<EntityId, EngineError> {
        self.ensure_initialized()?;
        let def = self.registry.prefab(prefab)?.clone();
        self.instantiate_def(&def, false)
    }

    /// Instantiate an inline definition as a top-level entity.
    pub fn instantiate_entity(&mut self, def: &PrefabDef) -> Result<EntityId, EngineError> {
        self.ensure_initialized()?;
        self.instantiate_def(def, false)
    }

    /// Build an entity tree from a definition. Only non-nested calls admit
    /// the result to the active list; inherited bases and children are
    /// always built nested so one `instantiate` produces exactly one
    /// top-level registration.
    fn instantiate_def(&mut self, def: &PrefabDef, nested: bool) -> Result<EntityId, EngineError> {
        let id = match &def.from_prefab {
            Some(base) => {
                // Build the base as a nested call, then layer this
                // definition's metadata and components on top of it.
                let base_def = self.registry.prefab(base)?.clone();
                let id = self.instantiate_def(&base_def, true)?;
                if let Some(entity) = self.storage.get_mut(&id) {
                    if let Some(name) = &def.name {
                        entity.set_name(name.clone());
                    }
                    if let Some(layer) = &def.layer {
                        entity.set_layer(layer.clone());
                    }
                    for tag in &def.tags {
                        entity.add_tag(tag.clone());
                    }
                }
                id
            }
            None => {
                self.last_id += 1;
                let id = self.last_id;
                let mut entity = Entity::new(id);
                if let Some(name) = &def.name {
                    entity.set_name(name.clone());
                }
                if let Some(layer) = &def.layer {
                    entity.set_layer(layer.clone());
                }
                for tag in &def.tags {
                    entity.add_tag(tag.clone());
                }
                self.storage.insert(id, entity);
                id
            }
        };

        for (name, config) in &def.components {
            self.add_component(id, name)?;
            if let Some(component) = self
                .storage
                .get_mut(&id)
                .and_then(|entity| entity.component_mut(name))
            {
                component.apply_config(config);
            }
        }

        for child in &def.children {
            let child_def = match child {
                EntityRef::Name(name) => self.registry.prefab(name)?.clone(),
                EntityRef::Inline(inline) => inline.clone(),
            };
            let child_id = self.instantiate_def(&child_def, true)?;
            self.add_child(id, child_id);
        }

        if !nested {
            self.admit(id);
        }
        Ok(id)
    }

    /// Attach a component to an entity, resolving requirements first.
    ///
    /// Idempotent: if the entity already carries the component, nothing
    /// happens and the setup closure does not run again — which is also
    /// what collapses diamond requirements into a single instance. The
    /// flattened requirement list is attached in dependency order, so a
    /// setup closure can assume all of its requirements exist.
    pub fn add_component(&mut self, entity: EntityId, name: &str) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        let Some(existing) = self.storage.get(&entity) else {
            return Err(EngineError::EntityNotFound(entity));
        };
        if existing.has_component(name) {
            return Ok(());
        }

        let def = self.registry.component(name)?;
        let requirements = def.computed_requirements().to_vec();
        let defaults = def.defaults.clone();
        let setup = def.setup.clone();

        for requirement in &requirements {
            self.add_component(entity, requirement)?;
        }

        // The instance is populated before it is registered on the entity,
        // so the setup closure sees its requirements but not itself.
        let mut component = Component::new(name, entity, defaults);
        setup(&mut component, self);
        if let Some(e) = self.storage.get_mut(&entity) {
            e.set_component(component);
        }
        Ok(())
    }

    /// Admit an entity to the active list.
    ///
    /// Mid-step, roots are queued and admitted at the drain. Otherwise the
    /// entity is appended, plugins see its entity-create hook, already
    /// attached children are admitted the same way (they were built
    /// nested), and — for roots only — the tree is enabled, `entity.create`
    /// is broadcast through it, and the prefab-create hook fires: children
    /// are visible to plugins individually, but only a root's admission is
    /// a complete "prefab instantiated" event.
    fn admit(&mut self, id: EntityId) {
        let Some(is_root) = self.storage.get(&id).map(Entity::is_root) else {
            return;
        };
        if self.updating && is_root {
            self.pending_created.push(id);
            return;
        }

        self.active.push(id);
        self.each_plugin(|plugin, engine| plugin.on_entity_create(engine, id));

        let children: Vec<EntityId> = self
            .storage
            .get(&id)
            .map(|entity| entity.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.admit(child);
        }

        if is_root {
            self.enable_tree(id);
            self.broadcast_entity(id, event::ENTITY_CREATE, &Value::Null);
            self.each_plugin(|plugin, engine| plugin.on_prefab_create(engine, id));
            debug!(entity = id, "prefab admitted");
        }
    }

    fn enable_tree(&mut self, id: EntityId) {
        let children = match self.storage.get_mut(&id) {
            Some(entity) => {
                entity.enable();
                entity.children().to_vec()
            }
            None => return,
        };
        for child in children {
            self.enable_tree(child);
        }
    }

    // -- Destruction --

    /// Destroy an entity and its whole subtree. Mid-step the request is
    /// queued and applied at the drain; repeated requests for the same
    /// entity are no-ops.
    pub fn destroy(&mut self, id: EntityId) {
        if self.updating {
            self.pending_destroyed.push(id);
            return;
        }
        self.destroy_entity(id, false);
    }

    /// Tear down one node. The outermost call fires the prefab-destroy
    /// hook and the `entity.destroy` broadcast *before* any teardown, so
    /// handlers still read a fully formed tree; nested calls skip both.
    /// Every node gets exactly one entity-destroy hook.
    fn destroy_entity(&mut self, id: EntityId, nested: bool) {
        if !self.storage.contains_key(&id) {
            return;
        }

        if !nested {
            self.each_plugin(|plugin, engine| plugin.on_prefab_destroy(engine, id));
            self.broadcast_entity(id, event::ENTITY_DESTROY, &Value::Null);
        }

        // Children first: copy the list aside and abandon it, so the
        // detach-from-parent step below never double-processes them.
        let children = self.abandon_children(id);
        for child in children {
            self.destroy_entity(child, true);
        }

        self.each_plugin(|plugin, engine| plugin.on_entity_destroy(engine, id));

        // A surviving parent means a non-root subtree is being destroyed;
        // detach from it.
        if let Some(parent) = self.storage.get(&id).and_then(Entity::parent) {
            if let Some(p) = self.storage.get_mut(&parent) {
                p.remove_child_id(id);
            }
        }

        if let Some(mut entity) = self.storage.remove(&id) {
            entity.set_id(Entity::DETACHED);
        }
        self.active.retain(|&e| e != id);
        debug!(entity = id, "entity destroyed");
    }

    // -- Hierarchy --

    /// Attach `child` under `parent`, detaching it from any previous
    /// parent first. Unknown ids are ignored.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) {
        if !self.storage.contains_key(&parent) || !self.storage.contains_key(&child) {
            return;
        }
        if let Some(old) = self.storage.get(&child).and_then(Entity::parent) {
            if let Some(p) = self.storage.get_mut(&old) {
                p.remove_child_id(child);
            }
        }
        if let Some(p) = self.storage.get_mut(&parent) {
            p.push_child(child);
        }
        if let Some(c) = self.storage.get_mut(&child) {
            c.set_parent(Some(parent));
        }
    }

    /// Detach `child` from `parent`. The child becomes a root.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        if let Some(p) = self.storage.get_mut(&parent) {
            p.remove_child_id(child);
        }
        if let Some(c) = self.storage.get_mut(&child) {
            if c.parent() == Some(parent) {
                c.set_parent(None);
            }
        }
    }

    /// Detach all of `parent`'s children without destroying them,
    /// returning their ids.
    pub fn abandon_children(&mut self, parent: EntityId) -> Vec<EntityId> {
        let children = match self.storage.get_mut(&parent) {
            Some(entity) => entity.take_children(),
            None => return Vec::new(),
        };
        for &child in &children {
            if let Some(c) = self.storage.get_mut(&child) {
                c.set_parent(None);
            }
        }
        children
    }

    // -- The step loop --

    /// Run one synchronous step.
    pub fn step(&mut self) -> Result<(), EngineError> {
        self.updating = true;
        self.step_id += 1;
        let start = Instant::now();
        self.delta = start.duration_since(self.last_step).as_secs_f64();
        self.last_step = start;
        let delta = self.delta;

        self.each_plugin(|plugin, engine| plugin.pre_update(engine, delta));
        self.update_entities(delta);
        self.each_plugin(|plugin, engine| plugin.post_update(engine, delta));

        self.updating = false;
        // Drain now, so the next step already contains this step's changes.
        self.drain_pending();

        self.last_step_duration = start.elapsed();
        let budget = self.step_budget();
        self.running_slowly = self.last_step_duration > budget;
        if self.running_slowly {
            warn!(
                step = self.step_id,
                elapsed_ms = self.last_step_duration.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "step exceeded time budget"
            );
        }

        if let Some(pending) = self.pending_scene.take() {
            self.unload_scene();
            self.apply_scene(pending)?;
        }
        Ok(())
    }

    /// Broadcast `engine.update` to every enabled root, in list order.
    /// Descendants and components are reached through the entity
    /// broadcast.
    fn update_entities(&mut self, delta: f64) {
        let args = Value::from(delta);
        let roots: Vec<EntityId> = self
            .active
            .iter()
            .copied()
            .filter(|id| {
                self.storage
                    .get(id)
                    .map(|e| e.is_enabled() && e.is_root())
                    .unwrap_or(false)
            })
            .collect();
        for id in roots {
            self.broadcast_entity(id, event::ENGINE_UPDATE, &args);
        }
    }

    /// Apply creations and destructions requested during the step, through
    /// the same routines the immediate paths use.
    fn drain_pending(&mut self) {
        let created = std::mem::take(&mut self.pending_created);
        for id in created {
            self.admit(id);
        }
        let destroyed = std::mem::take(&mut self.pending_destroyed);
        for id in destroyed {
            self.destroy_entity(id, false);
        }
    }

    /// Mark the engine running. The actual timer-driven repetition of
    /// [`Engine::step`] belongs to the external environment.
    pub fn run(&mut self) {
        self.running = true;
        info!(scene = self.scene.as_deref().unwrap_or(""), "engine running");
    }

    /// Mark the engine stopped; the environment's loop winds down after
    /// the current step.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Ask every enabled plugin to drop cached references.
    pub fn flush(&mut self) {
        self.each_plugin(|plugin, engine| plugin.on_flush(engine));
    }

    // -- Scene lifecycle --

    /// Load a scene and start running.
    ///
    /// A scene swap never overlaps a step. Requested from inside a step
    /// (handlers, plugin hooks), it is recorded, the engine stops, and the
    /// swap is applied at the end of that step, after the queue drain.
    /// Requested while running but between steps, the engine stops and
    /// swaps immediately — current scene unloaded first, hooks and all. An
    /// unknown scene name fails immediately either way.
    pub fn load_scene(&mut self, name: &str) -> Result<(), EngineError> {
        self.request_scene(name, None)
    }

    /// Load a scene, then hand control to `after` instead of auto-running.
    pub fn load_scene_with<F>(&mut self, name: &str, after: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Engine) + 'static,
    {
        self.request_scene(name, Some(Box::new(after)))
    }

    fn request_scene(
        &mut self,
        name: &str,
        after: Option<SceneCallback>,
    ) -> Result<(), EngineError> {
        if self.running {
            // Surface lookup failures synchronously, before deferring.
            self.registry.scene(name)?;
            self.stop();
            let pending = PendingScene {
                name: name.to_string(),
                after,
            };
            if self.updating {
                // A step is in flight; the swap happens at its end, after
                // the queue drain.
                self.pending_scene = Some(pending);
                return Ok(());
            }
            // Between steps nothing can overlap: tear down and swap now.
            self.unload_scene();
            return self.apply_scene(pending);
        }
        self.apply_scene(PendingScene {
            name: name.to_string(),
            after,
        })
    }

    fn apply_scene(&mut self, pending: PendingScene) -> Result<(), EngineError> {
        self.load_scene_now(&pending.name)?;
        match pending.after {
            Some(after) => after(self),
            None => self.run(),
        }
        Ok(())
    }

    /// Reset, then bring a scene up: plugins first (so component setup can
    /// reach their services), then entities, then the scene-loaded hook.
    fn load_scene_now(&mut self, name: &str) -> Result<(), EngineError> {
        self.reset();
        self.ensure_initialized()?;
        let scene = self.registry.scene(name)?.clone();
        self.scene = Some(name.to_string());
        info!(scene = name, "loading scene");

        if scene.plugins.is_empty() {
            let global: Vec<(String, Value)> = self
                .config
                .plugins
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (alias, config) in global {
                self.load_plugin(&alias, Some(config))?;
            }
        } else {
            for (alias, config) in &scene.plugins {
                let explicit = if is_empty_config(config) {
                    None
                } else {
                    Some(config.clone())
                };
                self.load_plugin(alias, explicit)?;
            }
        }

        for entry in &scene.entities {
            match entry {
                EntityRef::Name(prefab) => {
                    self.instantiate(prefab)?;
                }
                EntityRef::Inline(def) => {
                    let def = def.clone();
                    self.instantiate_def(&def, false)?;
                }
            }
        }

        self.each_plugin(|plugin, engine| plugin.on_scene_loaded(engine));
        Ok(())
    }

    /// Unload every plugin (firing unload hooks), then reset.
    pub fn unload_scene(&mut self) {
        self.unload_plugins();
        self.reset();
    }

    // -- Plugin management --

    /// Load a plugin by name. A no-op if it is already loaded.
    ///
    /// Configuration precedence when `config` is `None` (or empty): the
    /// engine configuration's entry for this plugin, else the definition's
    /// declared defaults.
    pub fn load_plugin(&mut self, name: &str, config: Option<Value>) -> Result<(), EngineError> {
        if self.plugins.iter().any(|p| p.name == name) {
            return Ok(());
        }
        let def = self.registry.plugin(name)?;
        let build = def.build.clone();
        let defaults = def.defaults.clone();
        let config = config
            .filter(|c| !is_empty_config(c))
            .or_else(|| self.config.plugins.get(name).cloned())
            .unwrap_or(defaults);

        let instance = build(&config);
        self.plugins.push(LoadedPlugin::new(name, instance));
        debug!(plugin = name, "plugin loaded");
        self.with_plugin(name, |plugin, engine| plugin.on_load(engine));
        Ok(())
    }

    /// Fire a plugin's unload hook and remove it.
    pub fn unload_plugin(&mut self, name: &str) {
        self.with_plugin(name, |plugin, engine| plugin.on_unload(engine));
        self.plugins.retain(|p| p.name != name);
    }

    /// Unload every plugin, in load order.
    pub fn unload_plugins(&mut self) {
        let names: Vec<String> = self.plugins.iter().map(|p| p.name.clone()).collect();
        for name in names {
            self.unload_plugin(&name);
        }
    }

    /// Include or exclude a loaded plugin from all hook dispatch without
    /// unloading it.
    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(entry) = self.plugins.iter_mut().find(|p| p.name == name) {
            entry.enabled = enabled;
        }
    }

    /// Access a loaded plugin; downcast through [`Plugin::as_any`] for its
    /// concrete service interface.
    #[must_use]
    pub fn plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.instance.as_deref())
    }

    /// Mutable access to a loaded plugin.
    pub fn plugin_mut(&mut self, name: &str) -> Option<&mut (dyn Plugin + 'static)> {
        self.plugins
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.instance.as_deref_mut())
    }

    /// Dispatch a hook closure to every enabled plugin, in load order.
    ///
    /// Each instance is taken out of its slot for the call so the hook can
    /// hold `&mut Engine`; put-back is by name, so a hook that unloads its
    /// own entry is simply dropped instead of resurrected.
    fn each_plugin<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn Plugin, &mut Engine),
    {
        let names: Vec<String> = self
            .plugins
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect();
        for name in names {
            let taken = self
                .plugins
                .iter_mut()
                .find(|p| p.name == name)
                .and_then(|slot| {
                    if slot.enabled {
                        slot.instance.take()
                    } else {
                        None
                    }
                });
            let Some(mut instance) = taken else { continue };
            f(&mut *instance, self);
            if let Some(slot) = self.plugins.iter_mut().find(|p| p.name == name) {
                slot.instance = Some(instance);
            }
        }
    }

    /// Dispatch a hook closure to one plugin by name, enabled or not.
    fn with_plugin<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(&mut dyn Plugin, &mut Engine),
    {
        let taken = self
            .plugins
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|slot| slot.instance.take());
        let Some(mut instance) = taken else { return };
        f(&mut *instance, self);
        if let Some(slot) = self.plugins.iter_mut().find(|p| p.name == name) {
            slot.instance = Some(instance);
        }
    }

    // -- Broadcast --

    /// Depth-first, pre-order dispatch through one entity's tree: the
    /// matching handler on every attached component of this node, then
    /// every enabled child in insertion order.
    ///
    /// Handlers are snapshotted per node before dispatch, so reentrant
    /// structural changes never invalidate the walk; nodes destroyed
    /// mid-walk are skipped.
    pub fn broadcast_entity(&mut self, id: EntityId, event: &str, args: &Value) {
        let handlers: Vec<MessageHandler> = match self.storage.get(&id) {
            Some(entity) => entity
                .components()
                .filter_map(|component| component.handler(event))
                .collect(),
            None => return,
        };
        for handler in handlers {
            handler(self, id, args);
        }

        let children: Vec<EntityId> = match self.storage.get(&id) {
            Some(entity) => entity.children().to_vec(),
            None => return,
        };
        for child in children {
            let enabled = self
                .storage
                .get(&child)
                .map(Entity::is_enabled)
                .unwrap_or(false);
            if enabled {
                self.broadcast_entity(child, event, args);
            }
        }
    }

    /// Register an external listener on the engine event bus. Entities,
    /// components, and plugins must not use this — bus dispatch is outside
    /// the per-step ordering guarantees.
    pub fn on<F>(&mut self, event: &str, callback: F)
    where
        F: FnMut(&Value) + 'static,
    {
        self.bus.on(event, callback);
    }

    /// Emit an event to external bus listeners only.
    pub fn emit(&mut self, event: &str, data: &Value) {
        self.bus.emit(event, data);
    }

    /// Bridge an event from outside into the simulation: emit on the bus
    /// first, then broadcast through every root entity's tree.
    pub fn broadcast(&mut self, event: &str, args: &Value) {
        self.emit(event, args);
        let roots: Vec<EntityId> = self
            .active
            .iter()
            .copied()
            .filter(|id| self.storage.get(id).map(Entity::is_root).unwrap_or(false))
            .collect();
        for id in roots {
            self.broadcast_entity(id, event, args);
        }
    }

    // -- Assets --

    /// Supply the asset loader the engine delegates to.
    pub fn set_loader(&mut self, loader: Box<dyn Loader>) {
        self.loader = Some(loader);
    }

    /// Load (or fetch the cached) asset at `path`.
    pub fn load_asset(&mut self, path: &str) -> Result<&Asset, EngineError> {
        match self.loader.as_deref_mut() {
            Some(loader) => Ok(loader.load_asset(path)?),
            None => Err(EngineError::LoaderMissing),
        }
    }

    /// Preload a batch of assets.
    pub fn load_assets(&mut self, paths: &[&str]) -> Result<(), EngineError> {
        match self.loader.as_deref_mut() {
            Some(loader) => Ok(loader.load_assets(paths)?),
            None => Err(EngineError::LoaderMissing),
        }
    }

    /// Read an already-loaded asset.
    #[must_use]
    pub fn get_asset(&self, path: &str) -> Option<&Asset> {
        self.loader.as_deref().and_then(|l| l.get_asset(path))
    }
}

/// `Null` and `{}` both mean "no explicit configuration".
fn is_empty_config(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
